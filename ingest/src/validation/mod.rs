//! Record validation.
//!
//! - [`fields`] - contact field normalizers (email, phone, URL)
//! - schema checks of emitted rows against JSON Schema Draft 7
//!
//! # Embedded Schemas
//!
//! One schema per bulk-import table, embedded at compile time from
//! `schemas/`: `ministry.json`, `category.json`, `direction.json`,
//! `service.json`, `agent.json`.
//!
//! # Example
//!
//! ```rust,ignore
//! use snadmin::models::{Level, Ministry};
//! use snadmin::validation::validate_record;
//!
//! let ministry = Ministry { external_id: "ministry_msas".into(), name: "Santé".into(), code: "MSAS".into(), ..Default::default() };
//! assert!(validate_record(&ministry).is_ok());
//! ```

pub mod fields;

use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::HashMap;

use crate::models::{Level, OrgRecord};

pub use fields::{validate_email, validate_phone, validate_url, FixMode};

/// Validate a JSON value against a JSON schema.
///
/// # Returns
/// * `Ok(())` when valid
/// * `Err(Vec<String>)` with every violation otherwise
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::draft7::new(schema)
        .map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator.iter_errors(data).map(|e| e.to_string()).collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Boolean form of [`validate`].
pub fn is_valid(schema: &Value, data: &Value) -> bool {
    jsonschema::draft7::is_valid(schema, data)
}

fn embedded_schema(level: Level) -> &'static str {
    match level {
        Level::Ministry => include_str!("../../schemas/ministry.json"),
        Level::Category => include_str!("../../schemas/category.json"),
        Level::Direction => include_str!("../../schemas/direction.json"),
        Level::Service => include_str!("../../schemas/service.json"),
        Level::Agent => include_str!("../../schemas/agent.json"),
    }
}

static VALIDATORS: Lazy<HashMap<Level, jsonschema::Validator>> = Lazy::new(|| {
    Level::ALL
        .iter()
        .map(|level| {
            let schema: Value =
                serde_json::from_str(embedded_schema(*level)).expect("Invalid embedded schema");
            let validator = jsonschema::draft7::new(&schema).expect("Invalid embedded schema");
            (*level, validator)
        })
        .collect()
});

/// Schema of one table.
pub fn table_schema(level: Level) -> Value {
    serde_json::from_str(embedded_schema(level)).expect("Invalid embedded schema")
}

/// Check a row object against its table schema.
pub fn validate_row(level: Level, row: &Value) -> Result<(), Vec<String>> {
    let validator = &VALIDATORS[&level];
    let errors: Vec<String> = validator.iter_errors(row).map(|e| e.to_string()).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Check an emitted record against its table schema.
pub fn validate_record<R: OrgRecord>(record: &R) -> Result<(), Vec<String>> {
    let row = serde_json::to_value(record).map_err(|e| vec![e.to_string()])?;
    validate_row(R::LEVEL, &row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Agent, Direction, Ministry};
    use serde_json::json;

    #[test]
    fn test_generic_validate() {
        let schema = json!({
            "type": "object",
            "required": ["name"],
            "properties": { "name": { "type": "string" } }
        });
        assert!(validate(&schema, &json!({ "name": "Cabinet" })).is_ok());
        assert!(validate(&schema, &json!({ "code": 42 })).is_err());
        assert!(!is_valid(&schema, &json!({})));
    }

    #[test]
    fn test_every_embedded_schema_compiles() {
        for level in Level::ALL {
            assert!(table_schema(level).is_object());
            assert!(VALIDATORS.contains_key(&level));
        }
    }

    #[test]
    fn test_valid_ministry() {
        let ministry = Ministry {
            external_id: "ministry_msas".into(),
            name: "Ministère de la Santé".into(),
            code: "MSAS".into(),
            ..Default::default()
        };
        assert!(validate_record(&ministry).is_ok());
    }

    #[test]
    fn test_invalid_codes_and_refs() {
        let ministry = Ministry {
            external_id: "ministry_msas".into(),
            name: "Ministère de la Santé".into(),
            code: "msas-01".into(),
            ..Default::default()
        };
        assert!(validate_record(&ministry).is_err());

        let direction = Direction {
            external_id: "direction_msas_dgs".into(),
            name: "Direction Générale De La Santé".into(),
            code: "DGS".into(),
            ministry_ref: "MSAS".into(),
            ..Default::default()
        };
        let errors = validate_record(&direction).unwrap_err();
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_blank_reference_is_allowed() {
        let agent = Agent {
            external_id: "agent_12345".into(),
            name: "Awa Diop".into(),
            function: "Agent".into(),
            ..Default::default()
        };
        assert!(validate_record(&agent).is_ok());
    }
}
