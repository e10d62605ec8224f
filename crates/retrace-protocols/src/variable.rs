//! Custom variables referenced from recorded values as `{{name}}`.

use serde::{Deserialize, Serialize};

/// A named placeholder resolved at playback time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomVariable {
    pub name: String,

    #[serde(flatten)]
    pub source: VariableSource,

    /// Static value; also the fallback for generated and remote variables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Where a variable's value comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum VariableSource {
    #[serde(alias = "static")]
    Plain,
    #[serde(alias = "ai")]
    Generated { prompt: String },
    #[serde(alias = "api")]
    Remote {
        endpoint_url: String,
        #[serde(default)]
        extract_path: String,
    },
}

impl CustomVariable {
    pub fn plain(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: VariableSource::Plain,
            value: Some(value.into()),
        }
    }

    pub fn generated(name: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: VariableSource::Generated {
                prompt: prompt.into(),
            },
            value: None,
        }
    }

    pub fn remote(
        name: impl Into<String>,
        endpoint_url: impl Into<String>,
        extract_path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source: VariableSource::Remote {
                endpoint_url: endpoint_url.into(),
                extract_path: extract_path.into(),
            },
            value: None,
        }
    }

    pub fn with_fallback(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Static value, or an empty string when none was authored.
    pub fn fallback(&self) -> &str {
        self.value.as_deref().unwrap_or_default()
    }

    pub fn kind_name(&self) -> &'static str {
        match self.source {
            VariableSource::Plain => "plain",
            VariableSource::Generated { .. } => "generated",
            VariableSource::Remote { .. } => "remote",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_remote_variable_wire_shape() {
        let var = CustomVariable::remote("token", "https://api.test/t", "data.token")
            .with_fallback("none");
        let value = serde_json::to_value(&var).unwrap();
        assert_eq!(value["kind"], "remote");
        assert_eq!(value["endpointUrl"], "https://api.test/t");
        assert_eq!(value["extractPath"], "data.token");
        assert_eq!(value["value"], "none");
    }

    #[test]
    fn test_legacy_kind_aliases() {
        let var: CustomVariable = serde_json::from_value(json!({
            "name": "greeting",
            "kind": "static",
            "value": "hi"
        }))
        .unwrap();
        assert_eq!(var.source, VariableSource::Plain);

        let var: CustomVariable = serde_json::from_value(json!({
            "name": "bio",
            "kind": "ai",
            "prompt": "write a bio"
        }))
        .unwrap();
        assert_eq!(var.kind_name(), "generated");
    }

    #[test]
    fn test_fallback_defaults_to_empty() {
        let var = CustomVariable::generated("x", "anything");
        assert_eq!(var.fallback(), "");
        assert_eq!(var.with_fallback("y").fallback(), "y");
    }
}
