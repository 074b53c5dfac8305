//! JSON Schema for the configuration file.

use crate::config::AutoduplexConfig;

/// Generates a JSON Schema for the Autoduplex configuration.
///
/// The schema includes all configuration options with their types,
/// descriptions, and default values.
#[must_use]
pub fn generate_schema() -> schemars::Schema {
    let mut schema = schemars::schema_for!(AutoduplexConfig);

    if let Some(obj) = schema.as_object_mut() {
        obj.insert(
            "$id".to_string(),
            serde_json::json!(
                "https://raw.githubusercontent.com/autoduplex/autoduplex/main/autoduplex.schema.json"
            ),
        );
    }

    schema
}

/// Generates the schema as pretty-printed JSON.
#[must_use]
pub fn generate_schema_json() -> String {
    serde_json::to_string_pretty(&generate_schema()).unwrap_or_default()
}
