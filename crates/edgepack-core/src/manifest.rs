//! Bundle manifest (`bundle.json`) parsing and validation.
//!
//! ```json
//! {
//!   "edgeworker-version": "1.0.2",
//!   "bundle-version": 1,
//!   "api-version": "0.3",
//!   "description": "optional",
//!   "misc": {}
//! }
//! ```
//!
//! Only `edgeworker-version` is required. Validity is all-or-nothing: the
//! first violated rule is reported and no partial manifest is returned.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;

pub const FIELD_VERSION: &str = "edgeworker-version";
pub const FIELD_BUNDLE_VERSION: &str = "bundle-version";
pub const FIELD_API_VERSION: &str = "api-version";
pub const FIELD_DESCRIPTION: &str = "description";
pub const FIELD_MISC: &str = "misc";

lazy_static! {
    /// Allowed version characters; `..` is rejected separately (no look-around in `regex`).
    static ref VERSION_CHARS: Regex = Regex::new(r"^[.A-Za-z0-9_~-]{1,32}$").unwrap();
    static ref API_VERSION: Regex = Regex::new(r"^[0-9.]*$").unwrap();
}

/// Validated bundle manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(rename = "edgeworker-version")]
    pub version: String,

    #[serde(
        rename = "bundle-version",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub bundle_format_version: Option<u64>,

    #[serde(rename = "api-version", default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub misc: Option<Map<String, Value>>,
}

/// Parse and validate raw manifest bytes.
pub fn validate(manifest_bytes: &[u8]) -> Result<Manifest, ValidationError> {
    let value: Value =
        serde_json::from_slice(manifest_bytes).map_err(|e| ValidationError::NotJson {
            reason: e.to_string(),
        })?;
    let Value::Object(obj) = value else {
        return Err(ValidationError::NotJson {
            reason: format!("top-level value is {}", json_kind(&value)),
        });
    };

    let version = match obj.get(FIELD_VERSION) {
        None => {
            return Err(ValidationError::MissingField {
                field: FIELD_VERSION,
            })
        }
        Some(Value::String(s)) => s.clone(),
        Some(other) => {
            return Err(bad_format(
                FIELD_VERSION,
                format!("expected string, found {}", json_kind(other)),
            ))
        }
    };
    check_version(&version)?;

    let bundle_format_version = match obj.get(FIELD_BUNDLE_VERSION) {
        None => None,
        Some(v) => match v.as_u64() {
            Some(n) if n >= 1 => Some(n),
            _ => {
                return Err(bad_format(
                    FIELD_BUNDLE_VERSION,
                    format!("expected integer >= 1, found {}", v),
                ))
            }
        },
    };

    let api_version = match obj.get(FIELD_API_VERSION) {
        None => None,
        Some(Value::String(s)) if API_VERSION.is_match(s) => Some(s.clone()),
        Some(v) => {
            return Err(bad_format(
                FIELD_API_VERSION,
                format!("expected digits and dots, found {}", v),
            ))
        }
    };

    let description = match obj.get(FIELD_DESCRIPTION) {
        None => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => {
            return Err(bad_format(
                FIELD_DESCRIPTION,
                format!("expected string, found {}", json_kind(other)),
            ))
        }
    };

    let misc = match obj.get(FIELD_MISC) {
        None => None,
        Some(Value::Object(m)) => Some(m.clone()),
        Some(other) => {
            return Err(bad_format(
                FIELD_MISC,
                format!("expected object, found {}", json_kind(other)),
            ))
        }
    };

    Ok(Manifest {
        version,
        bundle_format_version,
        api_version,
        description,
        misc,
    })
}

fn check_version(version: &str) -> Result<(), ValidationError> {
    if version.contains("..") {
        return Err(bad_format(FIELD_VERSION, "must not contain '..'"));
    }
    if !VERSION_CHARS.is_match(version) {
        return Err(bad_format(
            FIELD_VERSION,
            format!(
                "'{}' must be 1-32 characters from [.A-Za-z0-9_~-]",
                version
            ),
        ));
    }
    Ok(())
}

fn bad_format(field: &'static str, reason: impl Into<String>) -> ValidationError {
    ValidationError::BadFormat {
        field,
        reason: reason.into(),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(input: &str) -> Option<&'static str> {
        validate(input.as_bytes()).unwrap_err().field()
    }

    #[test]
    fn minimal_manifest_is_valid() {
        let m = validate(br#"{"edgeworker-version":"1.0"}"#).unwrap();
        assert_eq!(m.version, "1.0");
        assert_eq!(m.bundle_format_version, None);
        assert_eq!(m.api_version, None);
    }

    #[test]
    fn full_manifest_is_valid() {
        let m = validate(
            br#"{"edgeworker-version":"2.1-rc_1~x","bundle-version":3,"api-version":"0.3",
                 "description":"hello","misc":{"team":"edge"}}"#,
        )
        .unwrap();
        assert_eq!(m.bundle_format_version, Some(3));
        assert_eq!(m.api_version.as_deref(), Some("0.3"));
        assert_eq!(m.description.as_deref(), Some("hello"));
        assert!(m.misc.unwrap().contains_key("team"));
    }

    #[test]
    fn not_json() {
        assert!(matches!(
            validate(b"edgeworker-version: 1.0"),
            Err(ValidationError::NotJson { .. })
        ));
        assert!(matches!(
            validate(b"[1,2]"),
            Err(ValidationError::NotJson { .. })
        ));
    }

    #[test]
    fn missing_version() {
        for input in [r#"{}"#, r#"{"bundle-version":1}"#, r#"{"api-version":"1.0"}"#] {
            assert_eq!(
                validate(input.as_bytes()),
                Err(ValidationError::MissingField {
                    field: FIELD_VERSION
                })
            );
        }
    }

    #[test]
    fn bad_versions() {
        let too_long = format!(r#"{{"edgeworker-version":"{}"}}"#, "1".repeat(33));
        for input in [
            r#"{"edgeworker-version":"1..0"}"#,
            r#"{"edgeworker-version":".."}"#,
            r#"{"edgeworker-version":""}"#,
            r#"{"edgeworker-version":"1.0 beta"}"#,
            r#"{"edgeworker-version":"1/0"}"#,
            r#"{"edgeworker-version":1.0}"#,
            too_long.as_str(),
        ] {
            assert_eq!(field_of(input), Some(FIELD_VERSION), "input: {input}");
        }
        let max_len = format!(r#"{{"edgeworker-version":"{}"}}"#, "a".repeat(32));
        assert!(validate(max_len.as_bytes()).is_ok());
    }

    #[test]
    fn bad_bundle_version() {
        for v in ["0", "-1", "1.5", "\"1\"", "null"] {
            let input = format!(r#"{{"edgeworker-version":"1.0","bundle-version":{v}}}"#);
            assert_eq!(field_of(&input), Some(FIELD_BUNDLE_VERSION), "value: {v}");
        }
    }

    #[test]
    fn bad_api_version() {
        for v in ["\"v1\"", "\"1.0-beta\"", "1"] {
            let input = format!(r#"{{"edgeworker-version":"1.0","api-version":{v}}}"#);
            assert_eq!(field_of(&input), Some(FIELD_API_VERSION), "value: {v}");
        }
        assert!(validate(br#"{"edgeworker-version":"1.0","api-version":""}"#).is_ok());
    }

    #[test]
    fn bad_optional_extras() {
        assert_eq!(
            field_of(r#"{"edgeworker-version":"1.0","description":5}"#),
            Some(FIELD_DESCRIPTION)
        );
        assert_eq!(
            field_of(r#"{"edgeworker-version":"1.0","misc":[]}"#),
            Some(FIELD_MISC)
        );
    }

    #[test]
    fn serializes_with_wire_names() {
        let m = validate(br#"{"edgeworker-version":"1.0","bundle-version":2}"#).unwrap();
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, r#"{"edgeworker-version":"1.0","bundle-version":2}"#);
    }
}
