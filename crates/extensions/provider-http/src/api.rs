//! Generation endpoint wire types.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct GenerateRequest<'a> {
    pub name: &'a str,
    pub prompt: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let json = serde_json::to_value(GenerateRequest {
            name: "bio",
            prompt: "a short bio",
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"name": "bio", "prompt": "a short bio"}));
    }

    #[test]
    fn test_response_defaults() {
        let resp: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(!resp.success);
        assert!(resp.answer.is_none());
        assert!(resp.error.is_none());
    }
}
