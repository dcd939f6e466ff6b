use serde::{Deserialize, Deserializer, Serialize};

use crate::api::ApiError;

/// Standard response body of the backend: `{ success, data, message }`.
///
/// Every field is optional (missing fields read as `None`); some endpoints
/// omit `success` and others reply with only a `message`. An empty body
/// (`null`) reads as an envelope with no fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiEnvelope<T> {
    pub success: Option<bool>,
    pub data: Option<T>,
    pub message: Option<String>,
}

#[derive(Deserialize)]
struct EnvelopeFields<T> {
    success: Option<bool>,
    data: Option<T>,
    message: Option<String>,
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for ApiEnvelope<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fields = Option::<EnvelopeFields<T>>::deserialize(deserializer)?;
        Ok(match fields {
            Some(f) => Self {
                success: f.success,
                data: f.data,
                message: f.message,
            },
            None => Self {
                success: None,
                data: None,
                message: None,
            },
        })
    }
}

impl<T> ApiEnvelope<T> {
    /// False only when the backend explicitly reported `success: false`
    pub fn is_success(&self) -> bool {
        self.success != Some(false)
    }

    /// The payload if any, turning an explicit failure into an error.
    pub fn accepted(self) -> Result<Option<T>, ApiError> {
        if self.is_success() {
            Ok(self.data)
        } else {
            Err(ApiError::Rejected(
                self.message
                    .unwrap_or_else(|| "Request was not successful".to_string()),
            ))
        }
    }

    /// Take the payload, turning an explicit failure or a missing payload into an error.
    pub fn into_data(self) -> Result<T, ApiError> {
        self.accepted()?
            .ok_or_else(|| ApiError::InvalidResponse("Response has no data".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_into_data_success() {
        let env: ApiEnvelope<Vec<Value>> =
            serde_json::from_value(json!({"success": true, "data": [{"id": 1}]})).unwrap();
        assert_eq!(env.into_data().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_success_counts_as_success() {
        let env: ApiEnvelope<Value> = serde_json::from_value(json!({"data": {"id": 1}})).unwrap();
        assert!(env.is_success());
        assert!(env.into_data().is_ok());
    }

    #[test]
    fn test_explicit_failure_carries_message() {
        let env: ApiEnvelope<Value> = serde_json::from_value(
            json!({"success": false, "message": "Brand is already exists"}),
        )
        .unwrap();
        match env.into_data() {
            Err(ApiError::Rejected(msg)) => assert_eq!(msg, "Brand is already exists"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_empty_body_is_accepted_without_data() {
        let env: ApiEnvelope<Value> = serde_json::from_value(Value::Null).unwrap();
        assert!(env.is_success());
        assert_eq!(env.accepted().unwrap(), None);
    }

    #[test]
    fn test_success_without_data_is_invalid() {
        let env: ApiEnvelope<Value> = serde_json::from_value(json!({"success": true})).unwrap();
        assert!(matches!(env.into_data(), Err(ApiError::InvalidResponse(_))));
    }
}
