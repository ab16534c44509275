//! Namespace → token-record mapping and its JS-module text format.
//!
//! ```text
//! var edgekv_access_tokens = {
//!   "namespace-default": {
//!     "name": "my_token",
//!     "reference": "0f9a4a2c-..."
//!   }
//! }
//! export { edgekv_access_tokens };
//! ```
//!
//! Parsing is two-phase: the fixed declaration and export markers are
//! stripped and checked first, then the remaining body goes to the JSON
//! parser. Keys are kept sorted, so serialization is stable.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{MergeError, ParseError};

pub const DECLARATION: &str = "var edgekv_access_tokens =";
pub const EXPORT: &str = "export { edgekv_access_tokens };";

/// Access-token reference bound to one or more namespaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenRecord {
    pub name: String,
    pub reference: String,
}

impl TokenRecord {
    pub fn new(name: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reference: reference.into(),
        }
    }

    fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("name".into(), Value::String(self.name.clone()));
        obj.insert("reference".into(), Value::String(self.reference.clone()));
        Value::Object(obj)
    }
}

/// One record per namespace key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenRecordStore {
    records: BTreeMap<String, TokenRecord>,
}

impl TokenRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the serialized form. Surrounding whitespace is ignored.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let text = text.trim();
        let rest = text
            .strip_prefix(DECLARATION)
            .ok_or(ParseError::MissingDeclaration)?;
        let body = rest
            .trim_end()
            .strip_suffix(EXPORT)
            .ok_or(ParseError::MissingExport)?;
        let body = body.trim();
        let body = body.strip_suffix(';').unwrap_or(body);

        let records: BTreeMap<String, TokenRecord> =
            serde_json::from_str(body).map_err(|e| ParseError::MalformedBody {
                reason: e.to_string(),
            })?;
        Ok(Self { records })
    }

    /// Bind `record` to every namespace in `namespaces`.
    ///
    /// All namespaces are checked before any is changed; on error the store
    /// is left exactly as it was.
    ///
    /// # Errors
    ///
    /// - `NoNamespaces`: empty batch
    /// - `NameConflict`: namespace bound to a differently named token (even with `overwrite`)
    /// - `NoChangeNeeded`: same name and reference already present, `overwrite` unset
    /// - `ReferenceMismatch`: same name, different reference, `overwrite` unset
    pub fn merge<S: AsRef<str>>(
        &mut self,
        namespaces: &[S],
        record: &TokenRecord,
        overwrite: bool,
    ) -> Result<(), MergeError> {
        if namespaces.is_empty() {
            return Err(MergeError::NoNamespaces);
        }

        for ns in namespaces {
            let ns = ns.as_ref();
            let Some(existing) = self.records.get(ns) else {
                continue;
            };
            if existing.name != record.name {
                return Err(MergeError::NameConflict {
                    namespace: ns.to_string(),
                    existing_name: existing.name.clone(),
                });
            }
            if !overwrite {
                return Err(if existing.reference == record.reference {
                    MergeError::NoChangeNeeded {
                        namespace: ns.to_string(),
                    }
                } else {
                    MergeError::ReferenceMismatch {
                        namespace: ns.to_string(),
                        existing_reference: existing.reference.clone(),
                    }
                });
            }
        }

        for ns in namespaces {
            self.records.insert(ns.as_ref().to_string(), record.clone());
        }
        Ok(())
    }

    /// Declaration, pretty JSON body in key order, export.
    pub fn serialize(&self) -> String {
        let body: Map<String, Value> = self
            .records
            .iter()
            .map(|(ns, record)| (ns.clone(), record.to_json()))
            .collect();
        // Alternate `Display` on `Value` is the pretty printer.
        format!("{} {:#}\n{}", DECLARATION, Value::Object(body), EXPORT)
    }

    pub fn get(&self, namespace: &str) -> Option<&TokenRecord> {
        self.records.get(namespace)
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TokenRecord)> {
        self.records.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
