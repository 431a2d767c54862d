//! Response shapes shared by the coordinator and agent APIs

use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: Option<String>,
}

impl HealthResponse {
    pub fn healthy(service: &str) -> Self {
        Self {
            status: "healthy".to_string(),
            service: service.to_string(),
            timestamp: chrono::Utc::now(),
            version: env!("CARGO_PKG_VERSION").parse().ok(),
        }
    }
}

/// Envelope of a successful load test response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RespWrapper<T> {
    #[serde(rename = "Data")]
    pub data: Option<T>,
    #[serde(rename = "Error")]
    pub error: String,
}

impl<T> RespWrapper<T> {
    pub fn data(data: T) -> Self {
        Self {
            data: Some(data),
            error: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapper_field_names() {
        let value = serde_json::to_value(RespWrapper::data(vec![1, 2])).unwrap();
        assert_eq!(value, serde_json::json!({"Data": [1, 2], "Error": ""}));
    }
}
