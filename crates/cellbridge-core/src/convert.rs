//! Conversion between typed [`CellValue`]s and store byte sequences.
//!
//! Numeric types are encoded big-endian with fixed width, booleans as a
//! single byte (`0xff` for `true`, `0x00` for `false`) and strings as
//! UTF-8, matching the encoding the store's native client uses.

use bytes::Bytes;

use crate::model::{CellValue, ValueType};

/// Errors from the type-conversion service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    /// The named type is not a known [`ValueType`].
    #[error("unknown value type '{0}'")]
    UnknownType(String),

    /// Raw bytes have the wrong width for a fixed-width type.
    #[error("cannot convert {len} bytes to {target}")]
    InvalidLength {
        /// Target type
        target: ValueType,
        /// Length of the raw input
        len: usize,
    },

    /// Raw bytes are not valid UTF-8.
    #[error("invalid utf-8: {0}")]
    InvalidUtf8(String),

    /// A textual value could not be parsed into the target type.
    #[error("cannot parse '{value}' as {target}")]
    Parse {
        /// The offending input
        value: String,
        /// Target type
        target: ValueType,
    },
}

/// Encodes a value as store bytes.
#[must_use]
pub fn to_bytes(value: &CellValue) -> Bytes {
    match value {
        CellValue::Bytes(v) => Bytes::copy_from_slice(v),
        CellValue::Utf8(v) => Bytes::copy_from_slice(v.as_bytes()),
        CellValue::Int32(v) => Bytes::copy_from_slice(&v.to_be_bytes()),
        CellValue::Int64(v) => Bytes::copy_from_slice(&v.to_be_bytes()),
        CellValue::Float64(v) => Bytes::copy_from_slice(&v.to_bits().to_be_bytes()),
        CellValue::Bool(v) => Bytes::from_static(if *v { b"\xff" } else { b"\x00" }),
    }
}

/// Decodes store bytes into a value of the requested type.
///
/// # Errors
///
/// Returns [`ConversionError`] if the bytes do not fit `target`.
pub fn from_bytes(raw: &[u8], target: ValueType) -> Result<CellValue, ConversionError> {
    let invalid = || ConversionError::InvalidLength {
        target,
        len: raw.len(),
    };
    match target {
        ValueType::Bytes => Ok(CellValue::Bytes(raw.to_vec())),
        ValueType::Utf8 => std::str::from_utf8(raw)
            .map(|s| CellValue::Utf8(s.to_string()))
            .map_err(|e| ConversionError::InvalidUtf8(e.to_string())),
        ValueType::Int32 => {
            let arr: [u8; 4] = raw.try_into().map_err(|_| invalid())?;
            Ok(CellValue::Int32(i32::from_be_bytes(arr)))
        }
        ValueType::Int64 => {
            let arr: [u8; 8] = raw.try_into().map_err(|_| invalid())?;
            Ok(CellValue::Int64(i64::from_be_bytes(arr)))
        }
        ValueType::Float64 => {
            let arr: [u8; 8] = raw.try_into().map_err(|_| invalid())?;
            Ok(CellValue::Float64(f64::from_bits(u64::from_be_bytes(arr))))
        }
        ValueType::Bool => match raw {
            [b] => Ok(CellValue::Bool(*b != 0)),
            _ => Err(invalid()),
        },
    }
}

/// Parses a textual representation into a value of the requested type.
///
/// `Bytes` accepts the UTF-8 bytes of the text as-is.
///
/// # Errors
///
/// Returns [`ConversionError::Parse`] if the text is not a valid `target`.
pub fn parse_str(text: &str, target: ValueType) -> Result<CellValue, ConversionError> {
    let err = || ConversionError::Parse {
        value: text.to_string(),
        target,
    };
    match target {
        ValueType::Bytes => Ok(CellValue::Bytes(text.as_bytes().to_vec())),
        ValueType::Utf8 => Ok(CellValue::Utf8(text.to_string())),
        ValueType::Int32 => text.trim().parse().map(CellValue::Int32).map_err(|_| err()),
        ValueType::Int64 => text.trim().parse().map(CellValue::Int64).map_err(|_| err()),
        ValueType::Float64 => text.trim().parse().map(CellValue::Float64).map_err(|_| err()),
        ValueType::Bool => text.trim().parse().map(CellValue::Bool).map_err(|_| err()),
    }
}

/// Converts a value to `target`, going through its text form.
///
/// Raw bytes are decoded as `target`; anything converted to `Bytes` takes
/// its store encoding.
///
/// # Errors
///
/// Returns [`ConversionError`] if the value has no `target` representation.
pub fn coerce(value: &CellValue, target: ValueType) -> Result<CellValue, ConversionError> {
    if value.value_type() == target {
        return Ok(value.clone());
    }
    match value {
        CellValue::Bytes(raw) => from_bytes(raw, target),
        other if target == ValueType::Bytes => Ok(CellValue::Bytes(to_bytes(other).to_vec())),
        other => parse_str(&other.to_string(), target),
    }
}

/// Encodes a family or qualifier name as store bytes.
#[must_use]
pub fn field_bytes(name: &str) -> Bytes {
    Bytes::copy_from_slice(name.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_width_encoding() {
        assert_eq!(&to_bytes(&CellValue::Int64(1))[..], &[0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(&to_bytes(&CellValue::Int32(-1))[..], &[0xff; 4]);
        assert_eq!(&to_bytes(&CellValue::Bool(true))[..], &[0xff]);
        assert_eq!(&to_bytes(&CellValue::Bool(false))[..], &[0x00]);
        assert_eq!(&to_bytes(&CellValue::from("ab"))[..], b"ab");
    }

    #[test]
    fn test_coerce_through_text() {
        assert_eq!(
            coerce(&CellValue::from("42"), ValueType::Int64).unwrap(),
            CellValue::Int64(42)
        );
        assert_eq!(coerce(&CellValue::Int32(7), ValueType::Utf8).unwrap(), CellValue::from("7"));
        assert_eq!(
            coerce(&CellValue::Bool(true), ValueType::Bytes).unwrap(),
            CellValue::Bytes(vec![0xff])
        );
        assert!(matches!(
            coerce(&CellValue::from("x"), ValueType::Int32),
            Err(ConversionError::Parse { .. })
        ));
    }

    #[test]
    fn test_decode_typed() {
        let raw = to_bytes(&CellValue::Int64(-42));
        assert_eq!(from_bytes(&raw, ValueType::Int64).unwrap(), CellValue::Int64(-42));

        let raw = to_bytes(&CellValue::Float64(2.5));
        assert_eq!(from_bytes(&raw, ValueType::Float64).unwrap(), CellValue::Float64(2.5));

        assert_eq!(
            from_bytes(b"xyz", ValueType::Bytes).unwrap(),
            CellValue::Bytes(b"xyz".to_vec())
        );
    }

    #[test]
    fn test_decode_wrong_width() {
        let err = from_bytes(b"42", ValueType::Int64).unwrap_err();
        assert_eq!(
            err,
            ConversionError::InvalidLength {
                target: ValueType::Int64,
                len: 2
            }
        );
        assert!(from_bytes(&[], ValueType::Bool).is_err());
    }

    #[test]
    fn test_decode_invalid_utf8() {
        let err = from_bytes(&[0xc3, 0x28], ValueType::Utf8).unwrap_err();
        assert!(matches!(err, ConversionError::InvalidUtf8(_)));
    }

    #[test]
    fn test_parse_str() {
        assert_eq!(parse_str(" 17 ", ValueType::Int32).unwrap(), CellValue::Int32(17));
        assert_eq!(parse_str("true", ValueType::Bool).unwrap(), CellValue::Bool(true));
        assert!(matches!(
            parse_str("x", ValueType::Int64),
            Err(ConversionError::Parse { .. })
        ));
    }
}
