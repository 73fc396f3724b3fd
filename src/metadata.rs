use std::path::Path;

use serde_json::Value;

use crate::error::{RadiomicsError, Result, ensure_exists};
use crate::table::{Cell, Scalar};

/// Flat per-scan acquisition metadata, in source key order.
///
/// Absent values are kept as `None` so every field still becomes a column.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetadataRecord {
    fields: Vec<(String, Cell)>,
}

impl MetadataRecord {
    pub fn new(fields: Vec<(String, Cell)>) -> Self {
        Self { fields }
    }

    pub fn load(path: &Path) -> Result<Self> {
        ensure_exists(path)?;
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        match serde_json::from_str::<Value>(json)? {
            Value::Object(map) => Ok(Self {
                fields: map
                    .into_iter()
                    .map(|(key, value)| (key, Self::to_cell(value)))
                    .collect(),
            }),
            other => Err(RadiomicsError::InvalidFormat(format!(
                "metadata must be a JSON object, found {}",
                Self::kind(&other)
            ))),
        }
    }

    pub fn fields(&self) -> &[(String, Cell)] {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Scalar> {
        self.fields
            .iter()
            .find(|(name, _)| name == key)
            .and_then(|(_, value)| value.as_ref())
    }

    fn to_cell(value: Value) -> Cell {
        match value {
            Value::Null => None,
            Value::Bool(flag) => Some(Scalar::Bool(flag)),
            Value::Number(number) => Some(match number.as_f64() {
                Some(value) => Scalar::Number(value),
                None => Scalar::Text(number.to_string()),
            }),
            Value::String(text) => Some(Scalar::Text(text)),
            nested @ (Value::Array(_) | Value::Object(_)) => Some(Scalar::Text(nested.to_string())),
        }
    }

    fn kind(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "a boolean",
            Value::Number(_) => "a number",
            Value::String(_) => "a string",
            Value::Array(_) => "an array",
            Value::Object(_) => "an object",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_key_order_and_nulls() {
        let record = MetadataRecord::from_json_str(
            r#"{"Manufacturer": "Siemens", "EchoTime": 0.0029, "InversionTime": null, "ScanOptions": ["FS", "PFP"]}"#,
        )
        .unwrap();

        let keys: Vec<_> = record.fields().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["Manufacturer", "EchoTime", "InversionTime", "ScanOptions"]);
        assert_eq!(record.get("EchoTime"), Some(&Scalar::Number(0.0029)));
        assert_eq!(record.get("InversionTime"), None);
        assert_eq!(
            record.get("ScanOptions"),
            Some(&Scalar::Text(r#"["FS","PFP"]"#.into()))
        );
    }

    #[test]
    fn non_object_is_invalid() {
        assert!(matches!(
            MetadataRecord::from_json_str("[1, 2]"),
            Err(RadiomicsError::InvalidFormat(_))
        ));
    }

    #[test]
    fn missing_file_is_not_found() {
        assert!(matches!(
            MetadataRecord::load(Path::new("/nonexistent/extracted_metadata.json")),
            Err(RadiomicsError::NotFound(_))
        ));
    }
}
