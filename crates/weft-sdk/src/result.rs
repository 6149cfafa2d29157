use serde::{Deserialize, Serialize};
use weft_types::ErrorKind;

use crate::error::SdkError;

/// Why an action failed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionError {
    pub kind: ErrorKind,
    pub message: String,
}

/// Outcome of an action-style call: `{success, error?, id?}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ActionError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// A publish whose id was already known. Still a success.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub duplicate: bool,
}

impl ActionResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
            id: None,
            duplicate: false,
        }
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::ok()
        }
    }

    pub fn failed(error: &SdkError) -> Self {
        Self {
            success: false,
            error: Some(ActionError {
                kind: error.kind(),
                message: error.to_string(),
            }),
            id: None,
            duplicate: false,
        }
    }

    /// The failure kind, if the action failed.
    pub fn kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }
}

impl<T> From<Result<T, SdkError>> for ActionResult {
    fn from(result: Result<T, SdkError>) -> Self {
        match result {
            Ok(_) => Self::ok(),
            Err(e) => Self::failed(&e),
        }
    }
}
