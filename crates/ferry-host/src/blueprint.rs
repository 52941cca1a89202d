//! Declarative description of an agent app.

use ferry_toolset::ToolsetSpec;
use serde::{Deserialize, Serialize};

/// What an agent app *is*: name, instructions, model, toolsets.
///
/// A blueprint is the part of an app you can write down. It is plain data
/// and travels inside deploy bundles; everything live (connections,
/// subprocesses) is constructed from it at cold start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppBlueprint {
    /// Agent name
    pub name: String,

    /// One-line description, shown in listings
    #[serde(default)]
    pub description: String,

    /// Model the agent should use; `None` falls back to the host default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// System instructions
    pub instructions: String,

    /// Tool servers the agent can reach
    #[serde(default)]
    pub toolsets: Vec<ToolsetSpec>,
}

impl AppBlueprint {
    /// A blueprint with the given name and instructions.
    pub fn new(name: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            model: None,
            instructions: instructions.into(),
            toolsets: Vec::new(),
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Pin the model instead of using the host default
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Add a toolset
    pub fn with_toolset(mut self, spec: ToolsetSpec) -> Self {
        self.toolsets.push(spec);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_toolset::HttpConnectionSpec;

    #[test]
    fn builder_fills_in_the_optional_parts() {
        let blueprint = AppBlueprint::new("billing-helper", "Answer billing questions.")
            .with_description("Looks up invoices")
            .with_model("pilot-1")
            .with_toolset(ToolsetSpec::new(
                "billing",
                HttpConnectionSpec::new("http://localhost:9200/rpc"),
            ));

        assert_eq!(blueprint.name, "billing-helper");
        assert_eq!(blueprint.description, "Looks up invoices");
        assert_eq!(blueprint.model.as_deref(), Some("pilot-1"));
        assert_eq!(blueprint.toolsets.len(), 1);
        assert_eq!(blueprint.toolsets[0].name_prefix, "billing");
    }

    #[test]
    fn serialization_round_trips() {
        let blueprint = AppBlueprint::new("support", "Be helpful.").with_toolset(ToolsetSpec::new(
            "docs",
            HttpConnectionSpec::new("http://localhost:9200/rpc"),
        ));

        let json = serde_json::to_string(&blueprint).unwrap();
        let back: AppBlueprint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, blueprint);
    }

    #[test]
    fn minimal_json_deserializes_with_defaults() {
        let blueprint: AppBlueprint =
            serde_json::from_value(serde_json::json!({
                "name": "bare",
                "instructions": "Do the thing."
            }))
            .unwrap();

        assert_eq!(blueprint.description, "");
        assert_eq!(blueprint.model, None);
        assert!(blueprint.toolsets.is_empty());
    }
}
