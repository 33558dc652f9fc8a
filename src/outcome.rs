use serde::Serialize;
use serde_json::{Map, Value};
use tracing::error;

use crate::error::{FieldErrors, ServiceError};

pub const RETRY_MESSAGE: &str = "Something went wrong while saving your changes. Please try again.";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Message {
    Text(String),
    Fields(FieldErrors),
}

/// The `{error, message, ...extra}` shape every caller-facing operation
/// returns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    pub error: bool,
    pub message: Message,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Outcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            error: false,
            message: Message::Text(message.into()),
            extra: Map::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_owned(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    pub fn text(&self) -> Option<&str> {
        match &self.message {
            Message::Text(text) => Some(text),
            Message::Fields(_) => None,
        }
    }

    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match &self.message {
            Message::Fields(errors) => Some(errors),
            Message::Text(_) => None,
        }
    }
}

impl From<ServiceError> for Outcome {
    fn from(value: ServiceError) -> Self {
        let message = match value {
            ServiceError::Validation(errors) => Message::Fields(errors),
            ServiceError::NotFound(message) | ServiceError::Unauthorized(message) => {
                Message::Text(message)
            }
            internal => {
                error!(error = %internal, "Operation failed");
                Message::Text(RETRY_MESSAGE.to_owned())
            }
        };

        Self {
            error: true,
            message,
            extra: Map::new(),
        }
    }
}
