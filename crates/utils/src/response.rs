use serde::{Deserialize, Serialize};

/// Envelope for every JSON API response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T, E = T> {
    success: bool,
    data: Option<T>,
    error_data: Option<E>,
    message: Option<String>,
}

impl<T, E> ApiResponse<T, E> {
    pub fn success(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error_data: None,
            message: None,
        }
    }

    pub fn error(message: &str) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error_data: None,
            message: Some(message.to_string()),
        }
    }

    pub fn error_with_data(message: &str, data: E) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error_data: Some(data),
            message: Some(message.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn into_data(self) -> Option<T> {
        self.data
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn error_data(&self) -> Option<&E> {
        self.error_data.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_serializes_with_data() {
        let resp: ApiResponse<u32> = ApiResponse::success(7);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"], 7);
        assert!(json["message"].is_null());
    }

    #[test]
    fn error_carries_message_only() {
        let resp: ApiResponse<u32> = ApiResponse::error("lead not found");
        assert!(!resp.is_success());
        assert_eq!(resp.message(), Some("lead not found"));
        assert!(resp.into_data().is_none());
    }

    #[test]
    fn error_with_data_keeps_message_and_payload() {
        let resp: ApiResponse<(), &str> = ApiResponse::error_with_data("conflict", "sent");
        assert_eq!(resp.error_data(), Some(&"sent"));
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "conflict");
        assert_eq!(json["error_data"], "sent");
        assert!(json["data"].is_null());
    }
}
