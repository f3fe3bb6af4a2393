//! Common types used across the platform

use serde::{Deserialize, Serialize};

/// Standard API response envelope
///
/// Every endpoint answers `{ success, data, message? }` so clients can
/// branch on a single flag before touching the payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn ok_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_ok() {
        let reponse = ApiResponse::ok(42);
        assert!(reponse.success);
        assert_eq!(reponse.data, Some(42));
        assert!(reponse.message.is_none());
    }

    #[test]
    fn test_envelope_message() {
        let reponse = ApiResponse::ok_with_message((), "créé");
        assert!(reponse.success);
        assert_eq!(reponse.message.as_deref(), Some("créé"));
    }

    #[test]
    fn test_envelope_json_omet_les_champs_vides() {
        let json = serde_json::to_string(&ApiResponse::ok(1)).unwrap();
        assert_eq!(json, r#"{"success":true,"data":1}"#);
    }
}
