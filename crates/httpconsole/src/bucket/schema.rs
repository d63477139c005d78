//! HAR 1.2 response schema check for submitted bucket documents.

use crate::archive::ResponseArchive;
use crate::error::ValidationFailure;
use anyhow::{Context, Result};
use jsonschema::error::ValidationErrorKind;
use jsonschema::{Draft, JSONSchema};
use serde_json::{json, Value};

const RESPONSE_SCHEMA: &str = include_str!("../../schemas/har-response.schema.json");

/// Compiled response schema.
pub struct ResponseSchema {
    compiled: JSONSchema,
}

impl ResponseSchema {
    pub fn new() -> Result<Self> {
        let schema: Value =
            serde_json::from_str(RESPONSE_SCHEMA).context("Failed to parse response schema")?;

        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&schema)
            .map_err(|e| anyhow::anyhow!("Failed to compile response schema: {e}"))?;

        Ok(Self { compiled })
    }

    /// Check `document`, reporting the first failure.
    ///
    /// A missing document (unparseable JSON body) is checked as `null`. A
    /// document passing the schema must also load as a [`ResponseArchive`],
    /// which rejects integral floats (`201.0`) and out-of-range sizes that
    /// JSON Schema's `integer` lets through.
    pub fn validate(&self, document: Option<&Value>) -> Result<(), ValidationFailure> {
        let null = Value::Null;
        let document = document.unwrap_or(&null);

        let mut errors = match self.compiled.validate(document) {
            Ok(()) => return loadable(document),
            Err(errors) => errors,
        };

        let Some(error) = errors.next() else {
            return loadable(document);
        };

        let schema_path = error.schema_path.to_string();
        let code = schema_path
            .rsplit('/')
            .next()
            .filter(|segment| !segment.is_empty())
            .unwrap_or("schema")
            .to_string();

        let params = match &error.kind {
            ValidationErrorKind::Required { property } => json!({ "key": property }),
            _ => json!({}),
        };

        Err(ValidationFailure {
            code,
            message: error.to_string(),
            params,
            data_path: error.instance_path.to_string(),
            schema_path,
        })
    }
}

fn loadable(document: &Value) -> Result<(), ValidationFailure> {
    match serde_json::from_value::<ResponseArchive>(document.clone()) {
        Ok(_) => Ok(()),
        Err(e) => Err(ValidationFailure {
            code: "type".to_string(),
            message: e.to_string(),
            params: json!({}),
            data_path: String::new(),
            schema_path: String::new(),
        }),
    }
}
