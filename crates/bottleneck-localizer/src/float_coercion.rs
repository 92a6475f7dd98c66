// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Normalizes the numeric encodings found in trace documents into `f64`.
//!
//! Tracing backends are not consistent about how they encode durations: most send JSON
//! numbers, some send decimal strings. Both are accepted; anything else is a
//! [`ConversionError`] naming the offending type.

use serde_json::Value;

use crate::error::ConversionError;

/// Values that can be coerced into an `f64`.
pub trait AsFloat {
    fn as_float(&self) -> Result<f64, ConversionError>;
}

macro_rules! impl_as_float_lossless {
    ($($ty:ty),*) => {
        $(
            impl AsFloat for $ty {
                fn as_float(&self) -> Result<f64, ConversionError> {
                    Ok(f64::from(*self))
                }
            }
        )*
    };
}

macro_rules! impl_as_float_wide {
    ($($ty:ty),*) => {
        $(
            impl AsFloat for $ty {
                #[allow(clippy::cast_precision_loss)]
                fn as_float(&self) -> Result<f64, ConversionError> {
                    Ok(*self as f64)
                }
            }
        )*
    };
}

impl_as_float_lossless!(f32, f64, i8, i16, i32, u8, u16, u32);
impl_as_float_wide!(i64, u64, isize, usize);

impl AsFloat for str {
    fn as_float(&self) -> Result<f64, ConversionError> {
        parse_decimal(self)
    }
}

impl AsFloat for String {
    fn as_float(&self) -> Result<f64, ConversionError> {
        parse_decimal(self)
    }
}

impl AsFloat for Value {
    fn as_float(&self) -> Result<f64, ConversionError> {
        coerce_float(self)
    }
}

/// Coerces a JSON value holding a signed, unsigned or floating point number, or a decimal
/// string, into an `f64`.
pub fn coerce_float(value: &Value) -> Result<f64, ConversionError> {
    match value {
        Value::Number(number) => {
            if let Some(u) = number.as_u64() {
                u.as_float()
            } else if let Some(i) = number.as_i64() {
                i.as_float()
            } else {
                number.as_f64().ok_or(ConversionError {
                    source_type: "number",
                })
            }
        }
        Value::String(s) => parse_decimal(s),
        Value::Null => Err(ConversionError { source_type: "null" }),
        Value::Bool(_) => Err(ConversionError { source_type: "bool" }),
        Value::Array(_) => Err(ConversionError {
            source_type: "array",
        }),
        Value::Object(_) => Err(ConversionError {
            source_type: "object",
        }),
    }
}

fn parse_decimal(s: &str) -> Result<f64, ConversionError> {
    match s.parse::<f64>() {
        Ok(f) if f.is_finite() => Ok(f),
        _ => Err(ConversionError {
            source_type: "string",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerce_json_numbers() {
        assert_eq!(coerce_float(&json!(42)), Ok(42.0));
        assert_eq!(coerce_float(&json!(-17)), Ok(-17.0));
        assert_eq!(coerce_float(&json!(1.5)), Ok(1.5));
        assert_eq!(coerce_float(&json!(u64::MAX)), Ok(u64::MAX as f64));
    }

    #[test]
    fn test_coerce_decimal_strings() {
        assert_eq!(coerce_float(&json!("250")), Ok(250.0));
        assert_eq!(coerce_float(&json!("12.25")), Ok(12.25));
        assert_eq!(coerce_float(&json!("-3e2")), Ok(-300.0));
    }

    #[test]
    fn test_reject_non_numeric() {
        assert_eq!(
            coerce_float(&json!("fast")),
            Err(ConversionError {
                source_type: "string"
            })
        );
        assert_eq!(
            coerce_float(&json!(" 12.25 ")),
            Err(ConversionError {
                source_type: "string"
            })
        );
        assert_eq!(
            coerce_float(&json!("NaN")),
            Err(ConversionError {
                source_type: "string"
            })
        );
        assert_eq!(
            coerce_float(&json!(true)),
            Err(ConversionError { source_type: "bool" })
        );
        assert_eq!(
            coerce_float(&Value::Null),
            Err(ConversionError { source_type: "null" })
        );
        assert_eq!(
            coerce_float(&json!({"duration": 1})),
            Err(ConversionError {
                source_type: "object"
            })
        );
    }

    #[test]
    fn test_native_widths() {
        assert_eq!(7u8.as_float(), Ok(7.0));
        assert_eq!((-7i16).as_float(), Ok(-7.0));
        assert_eq!(70_000u32.as_float(), Ok(70_000.0));
        assert_eq!((-5_000_000_000i64).as_float(), Ok(-5_000_000_000.0));
        assert_eq!(0.25f32.as_float(), Ok(0.25));
        assert_eq!(String::from("8").as_float(), Ok(8.0));
        assert_eq!("9.5".as_float(), Ok(9.5));
    }
}
