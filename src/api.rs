//! Service boundary response envelope

use serde::Serialize;
use serde_json::{json, Value};

/// Body sent for every 500 that is not a preview generation failure
pub const GENERIC_SERVER_ERROR: &str = "Unexpected error occurred at server.";

/// Status code plus `{success, message, data?}` JSON body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn ok<T: Serialize>(status: u16, message: &str, data: &T) -> Self {
        let data = serde_json::to_value(data).unwrap_or(Value::Null);
        Self {
            status,
            body: json!({ "success": true, "message": message, "data": data }),
        }
    }

    pub fn fail(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "success": false, "message": message.into() }),
        }
    }

    pub fn server_error() -> Self {
        Self::fail(500, GENERIC_SERVER_ERROR)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn message(&self) -> Option<&str> {
        self.body.get("message").and_then(Value::as_str)
    }

    pub fn data(&self) -> Option<&Value> {
        self.body.get("data")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let created = ApiResponse::ok(201, "", &json!({ "id": 1 }));
        assert!(created.is_success());
        assert_eq!(created.body["success"], true);
        assert_eq!(created.data().unwrap()["id"], 1);

        let failed = ApiResponse::server_error();
        assert_eq!(failed.status, 500);
        assert_eq!(failed.message(), Some(GENERIC_SERVER_ERROR));
        assert!(failed.data().is_none());
    }
}
