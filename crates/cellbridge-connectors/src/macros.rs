/// Generates `FromStr` and optionally `Display` impls for simple string enums.
///
/// # Forms
///
/// - `str_enum!(Enum, norm, "msg", ...)`: both `Display` and `FromStr`
/// - `str_enum!(fromstr Enum, norm, "msg", ...)`: `FromStr` only
///
/// Parse failures become [`ConnectorError::ConfigurationError`](crate::error::ConnectorError).
///
/// Input is trimmed and lowercased before matching, so canonical names and
/// aliases must be lowercase.
macro_rules! str_enum {
    ($enum_name:ident, $norm:ident, $err_msg:literal,
        $( $variant:ident => $display:literal $(, $alias:literal)* );+ $(;)?
    ) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let s = match self {
                    $( Self::$variant => $display, )+
                };
                f.write_str(s)
            }
        }
        str_enum!(fromstr $enum_name, $norm, $err_msg,
            $( $variant => $display $(, $alias)* );+);
    };

    (fromstr $enum_name:ident, $norm:ident, $err_msg:literal,
        $( $variant:ident => $canonical:literal $(, $alias:literal)* );+ $(;)?
    ) => {
        impl std::str::FromStr for $enum_name {
            type Err = crate::error::ConnectorError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let normalized = str_enum!(@normalize $norm s);
                match normalized.as_str() {
                    $( $canonical $(| $alias)* => Ok(Self::$variant), )+
                    other => Err(crate::error::ConnectorError::ConfigurationError(
                        format!("{}: '{}'", $err_msg, other),
                    )),
                }
            }
        }
    };

    (@normalize lowercase $s:ident) => { $s.trim().to_lowercase() };
}
