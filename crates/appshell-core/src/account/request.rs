use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Message returned when the request carries no usable uid.
pub const UID_REQUIRED: &str = "UID is required";

/// Input of one deletion call. Built per invocation, never persisted.
///
/// Only a non-empty JSON string is a uid. Any other value, including a
/// truthy one such as `42` or `{"id": 1}`, is treated as missing and answered
/// with [`UID_REQUIRED`] instead of being forwarded to the stores to fail
/// there with a store-specific error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DeletionRequest {
    #[serde(default, deserialize_with = "lenient_uid")]
    pub uid: Option<String>,
}

impl DeletionRequest {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: Some(uid.into()),
        }
    }

    /// The uid, if present and non-empty.
    pub fn valid_uid(&self) -> Option<&str> {
        self.uid.as_deref().filter(|uid| !uid.is_empty())
    }
}

/// Accept only string uids; null, numbers, objects and the like count as absent.
fn lenient_uid<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(uid)) => Some(uid),
        _ => None,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionResult {
    Success,
    Failure { reason: String },
}

impl DeletionResult {
    pub fn failure(reason: impl Into<String>) -> Self {
        DeletionResult::Failure {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, DeletionResult::Success)
    }
}

/// Wire shape: `{"success":true}` or `{"success":false,"error":"..."}`
#[derive(Serialize, Deserialize)]
struct WireResult {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl Serialize for DeletionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let wire = match self {
            DeletionResult::Success => WireResult {
                success: true,
                error: None,
            },
            DeletionResult::Failure { reason } => WireResult {
                success: false,
                error: Some(reason.clone()),
            },
        };
        wire.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DeletionResult {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = WireResult::deserialize(deserializer)?;
        Ok(if wire.success {
            DeletionResult::Success
        } else {
            DeletionResult::Failure {
                reason: wire.error.unwrap_or_default(),
            }
        })
    }
}
