//! Builtin pure template functions.
//!
//! These cover the generated-value tags usable in any request field:
//! `{{$guid}}`, `{{$timestamp -1 d}}`, `{{$datetime iso8601}}`,
//! `{{$randomInt 1 100}}` and `{{ base64(encode, text) }}`. All of them are
//! pure from the resolution policy's point of view and run for both send
//! and preview purposes.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rand::Rng;
use serde_json::Value;
use uuid::Uuid;

use super::{CapabilityTable, FunctionSpec, SyncCapability};
use crate::render::RenderError;

/// Registers the builtin function set into a capability table.
pub fn register_builtins(table: &mut CapabilityTable) {
    table.register(FunctionSpec::pure(
        "guid",
        Arc::new(SyncCapability(|_: &[String]| {
            Ok(Value::String(Uuid::new_v4().to_string()))
        })),
    ));
    table.register(FunctionSpec::pure(
        "timestamp",
        Arc::new(SyncCapability(|args: &[String]| resolve_timestamp(args))),
    ));
    table.register(FunctionSpec::pure(
        "datetime",
        Arc::new(SyncCapability(|args: &[String]| resolve_datetime(args))),
    ));
    table.register(FunctionSpec::pure(
        "randomInt",
        Arc::new(SyncCapability(|args: &[String]| resolve_random_int(args))),
    ));
    table.register(FunctionSpec::pure(
        "base64",
        Arc::new(SyncCapability(|args: &[String]| resolve_base64(args))),
    ));
}

fn invalid(function: &str, message: impl Into<String>) -> RenderError {
    RenderError::InvalidArguments {
        function: function.to_string(),
        message: message.into(),
    }
}

/// Unix timestamp in seconds, with an optional `[+|-]n unit` offset.
fn resolve_timestamp(args: &[String]) -> Result<Value, RenderError> {
    let now = Utc::now();
    let datetime = if args.is_empty() {
        now
    } else {
        apply_offset("timestamp", now, args)?
    };
    Ok(Value::String(datetime.timestamp().to_string()))
}

/// Formatted datetime: `datetime <rfc1123|iso8601> [offset unit]`.
fn resolve_datetime(args: &[String]) -> Result<Value, RenderError> {
    let format = args
        .first()
        .ok_or_else(|| invalid("datetime", "format argument required (rfc1123 or iso8601)"))?;

    let now = Utc::now();
    let datetime = if args.len() > 1 {
        apply_offset("datetime", now, &args[1..])?
    } else {
        now
    };

    match format.as_str() {
        "rfc1123" => Ok(Value::String(datetime.to_rfc2822())),
        "iso8601" => Ok(Value::String(
            datetime.to_rfc3339_opts(SecondsFormat::Millis, true),
        )),
        other => Err(invalid(
            "datetime",
            format!("unknown format '{}', use 'rfc1123' or 'iso8601'", other),
        )),
    }
}

/// Applies a `[sign]number unit` offset where unit is s, m, h or d.
fn apply_offset(
    function: &str,
    base: DateTime<Utc>,
    args: &[String],
) -> Result<DateTime<Utc>, RenderError> {
    if args.len() < 2 {
        return Err(invalid(
            function,
            "offset requires number and unit (e.g. '-1 d' or '+2 h')",
        ));
    }

    let number: i64 = args[0]
        .parse()
        .map_err(|_| invalid(function, format!("invalid offset number '{}'", args[0])))?;

    let duration = match args[1].as_str() {
        "s" => Duration::seconds(number),
        "m" => Duration::minutes(number),
        "h" => Duration::hours(number),
        "d" => Duration::days(number),
        other => {
            return Err(invalid(
                function,
                format!("invalid offset unit '{}', use 's', 'm', 'h' or 'd'", other),
            ))
        }
    };

    Ok(base + duration)
}

/// Random integer in an inclusive range: `randomInt min max`.
fn resolve_random_int(args: &[String]) -> Result<Value, RenderError> {
    if args.len() < 2 {
        return Err(invalid("randomInt", "min and max arguments required"));
    }

    let min: i64 = args[0]
        .parse()
        .map_err(|_| invalid("randomInt", format!("invalid min value '{}'", args[0])))?;
    let max: i64 = args[1]
        .parse()
        .map_err(|_| invalid("randomInt", format!("invalid max value '{}'", args[1])))?;

    if min > max {
        return Err(invalid(
            "randomInt",
            format!("min ({}) cannot be greater than max ({})", min, max),
        ));
    }

    let value = rand::thread_rng().gen_range(min..=max);
    Ok(Value::String(value.to_string()))
}

/// Base64 transform: `base64(encode, text)` or `base64(decode, text)`.
fn resolve_base64(args: &[String]) -> Result<Value, RenderError> {
    if args.len() < 2 {
        return Err(invalid("base64", "mode and text arguments required"));
    }

    match args[0].as_str() {
        "encode" => Ok(Value::String(STANDARD.encode(&args[1]))),
        "decode" => {
            let bytes = STANDARD
                .decode(&args[1])
                .map_err(|e| invalid("base64", format!("invalid base64 input: {}", e)))?;
            let text = String::from_utf8(bytes)
                .map_err(|_| invalid("base64", "decoded bytes are not valid UTF-8"))?;
            Ok(Value::String(text))
        }
        other => Err(invalid(
            "base64",
            format!("unknown mode '{}', use 'encode' or 'decode'", other),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    fn as_str(value: Value) -> String {
        match value {
            Value::String(s) => s,
            other => panic!("expected string, got {:?}", other),
        }
    }

    #[test]
    fn test_guid_shape() {
        let table = CapabilityTable::with_builtins();
        assert!(table.get("guid").is_some());
        let guid = Uuid::new_v4().to_string();
        assert_eq!(guid.len(), 36);
    }

    #[test]
    fn test_timestamp_is_numeric() {
        let out = as_str(resolve_timestamp(&[]).unwrap());
        assert!(out.parse::<i64>().is_ok());
    }

    #[test]
    fn test_timestamp_with_offset() {
        let now = as_str(resolve_timestamp(&[]).unwrap()).parse::<i64>().unwrap();
        let past = as_str(resolve_timestamp(&args(&["-1", "d"])).unwrap())
            .parse::<i64>()
            .unwrap();
        let diff = now - past;
        // One day back, allowing a little slack for clock movement between calls.
        assert!((86_398..=86_402).contains(&diff), "diff was {}", diff);
    }

    #[test]
    fn test_timestamp_bad_offset() {
        assert!(resolve_timestamp(&args(&["-1"])).is_err());
        assert!(resolve_timestamp(&args(&["x", "d"])).is_err());
        assert!(resolve_timestamp(&args(&["1", "w"])).is_err());
    }

    #[test]
    fn test_datetime_formats() {
        let iso = as_str(resolve_datetime(&args(&["iso8601"])).unwrap());
        assert!(DateTime::parse_from_rfc3339(&iso).is_ok());

        let rfc = as_str(resolve_datetime(&args(&["rfc1123"])).unwrap());
        assert!(DateTime::parse_from_rfc2822(&rfc).is_ok());
    }

    #[test]
    fn test_datetime_requires_format() {
        assert!(resolve_datetime(&[]).is_err());
        assert!(resolve_datetime(&args(&["epoch"])).is_err());
    }

    #[test]
    fn test_random_int_in_range() {
        for _ in 0..50 {
            let out = as_str(resolve_random_int(&args(&["1", "10"])).unwrap());
            let n: i64 = out.parse().unwrap();
            assert!((1..=10).contains(&n));
        }
    }

    #[test]
    fn test_random_int_validation() {
        assert!(resolve_random_int(&args(&["5"])).is_err());
        assert!(resolve_random_int(&args(&["10", "1"])).is_err());
        assert!(resolve_random_int(&args(&["a", "b"])).is_err());
    }

    #[test]
    fn test_base64_round_trip() {
        let encoded = as_str(resolve_base64(&args(&["encode", "user:pass"])).unwrap());
        assert_eq!(encoded, "dXNlcjpwYXNz");

        let decoded = as_str(resolve_base64(&args(&["decode", &encoded])).unwrap());
        assert_eq!(decoded, "user:pass");
    }

    #[test]
    fn test_base64_bad_mode_and_input() {
        assert!(resolve_base64(&args(&["rot13", "x"])).is_err());
        assert!(resolve_base64(&args(&["decode", "!!!"])).is_err());
    }
}
