use crate::errors::{ErrorCode, McpError};
use jsonschema::JSONSchema;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDef {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

static TOOL_CATALOG: Lazy<Vec<ToolDef>> = Lazy::new(|| {
    let raw = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/tool_catalog.json"));
    serde_json::from_str(raw).expect("tool_catalog.json must be valid JSON")
});

static TOOL_MAP: Lazy<HashMap<String, ToolDef>> = Lazy::new(|| {
    TOOL_CATALOG
        .iter()
        .cloned()
        .map(|tool| (tool.name.clone(), tool))
        .collect()
});

static TOOL_VALIDATORS: Lazy<HashMap<String, JSONSchema>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for tool in TOOL_CATALOG.iter() {
        if let Ok(schema) = JSONSchema::compile(&tool.input_schema) {
            map.insert(tool.name.clone(), schema);
        }
    }
    map
});

pub fn tool_catalog() -> &'static Vec<ToolDef> {
    &TOOL_CATALOG
}

pub fn tool_by_name(name: &str) -> Option<&'static ToolDef> {
    TOOL_MAP.get(name)
}

/// Checks tool arguments against the tool's input schema. The per-field
/// format and range rules live in the consumption pipeline; the schema only
/// guards the argument object shape.
pub fn validate_tool_args(tool_name: &str, args: &Value) -> Result<(), McpError> {
    let Some(schema) = TOOL_VALIDATORS.get(tool_name) else {
        return Ok(());
    };
    if let Err(errors) = schema.validate(args) {
        let rendered: Vec<String> = errors
            .take(5)
            .map(|err| {
                let path = if err.instance_path.to_string().is_empty() {
                    "(root)".to_string()
                } else {
                    err.instance_path.to_string()
                };
                format!("{}: {}", path, err)
            })
            .collect();
        return Err(McpError::new(
            ErrorCode::InvalidParams,
            format!(
                "Invalid arguments for {}: {}",
                tool_name,
                rendered.join("; ")
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn catalog_lists_both_consumption_tools() {
        let names: Vec<&str> = tool_catalog()
            .iter()
            .map(|tool| tool.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec!["get_electricity_consumption", "get_gas_consumption"]
        );
    }

    #[test]
    fn electricity_tool_accepts_mpan_not_mprn() {
        let tool = tool_by_name("get_electricity_consumption").expect("tool exists");
        let properties = tool
            .input_schema
            .get("properties")
            .and_then(|v| v.as_object())
            .expect("schema has properties");
        assert!(properties.contains_key("mpan"));
        assert!(!properties.contains_key("mprn"));
    }

    #[test]
    fn schema_accepts_empty_arguments() {
        assert!(validate_tool_args("get_electricity_consumption", &json!({})).is_ok());
        assert!(validate_tool_args("get_gas_consumption", &json!({})).is_ok());
    }

    #[test]
    fn schema_rejects_wrongly_typed_arguments_naming_the_field() {
        let err =
            validate_tool_args("get_electricity_consumption", &json!({ "mpan": 42 })).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidParams);
        assert!(err.message.contains("mpan"));
    }

    #[test]
    fn unknown_tool_is_not_schema_validated() {
        assert!(validate_tool_args("no_such_tool", &json!({})).is_ok());
    }
}
