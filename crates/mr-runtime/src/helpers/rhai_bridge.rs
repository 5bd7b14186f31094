use rhai::{Dynamic, ImmutableString, FLOAT, INT};

use mr_core::HostValue;

pub const UNSUPPORTED_CONVERSION: &str = "Undefined Conversion";

// Integers outside the i32 range come back as floats.
pub fn to_host(value: &Dynamic) -> HostValue {
    if value.is_unit() {
        return HostValue::Null;
    }
    if value.is::<INT>() {
        let number = value.clone().cast::<INT>();
        return match i32::try_from(number) {
            Ok(small) => HostValue::Integer(i64::from(small)),
            Err(_) => HostValue::Float(number as f64),
        };
    }
    if value.is::<FLOAT>() {
        return HostValue::Float(value.clone().cast::<FLOAT>() as f64);
    }
    if value.is::<ImmutableString>() {
        return HostValue::Text(value.clone().cast::<ImmutableString>().to_string());
    }

    HostValue::Text(value.to_string())
}

pub fn to_dynamic(value: &HostValue) -> Dynamic {
    match value {
        HostValue::Null => Dynamic::UNIT,
        HostValue::Bool(value) => Dynamic::from_bool(*value),
        HostValue::Integer(value) => Dynamic::from_int(*value as INT),
        HostValue::Float(value) => Dynamic::from_float(*value as FLOAT),
        HostValue::Text(value) => Dynamic::from(ImmutableString::from(value.as_str())),
        HostValue::List(_) | HostValue::Map(_) => {
            Dynamic::from(ImmutableString::from(UNSUPPORTED_CONVERSION))
        }
    }
}
