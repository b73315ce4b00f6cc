use crate::session::StorageError;
use reqwest::StatusCode;
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;

/// The `errorMessage` used when nothing more specific is known.
pub const GENERIC_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// The `responseCode` used for every locally detected failure.
pub const FAILURE_RESPONSE_CODE: &str = "1";

/// The single error shape returned by every remote operation.
///
/// Serializes as `{"responseCode", "responseMessage", "errorMessage"}`.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("{response_message}: {error_message}")]
pub struct ApiError {
    pub response_code: String,
    pub response_message: String,
    pub error_message: String,
    /// What kind of failure produced this error.
    #[serde(skip)]
    pub kind: ErrorKind,
}

impl ApiError {
    pub fn new(
        kind: ErrorKind,
        response_message: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        ApiError {
            response_code: String::from(FAILURE_RESPONSE_CODE),
            response_message: response_message.into(),
            error_message: error_message.into(),
            kind,
        }
    }
}

/// The broad category an [`ApiError`] falls into.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request never got a response.
    Transport,
    /// The backend answered with an error status.
    Backend,
    /// The backend answered successfully but with something we can't use.
    InvalidResponse,
    /// The operation needs a logged in user.
    NotAuthenticated,
    /// Reading or writing the persisted session failed.
    Storage,
}

/// Everything that can go wrong while talking to the backend, before it is
/// flattened into an [`ApiError`].
#[derive(Debug, thiserror::Error)]
pub(crate) enum Failure {
    #[error("{0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("Unable to parse the response: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("Unable to build the request URL")]
    BadUrl(#[from] url::ParseError),
    #[error("The backend rejected the request with {status}")]
    Rejected { status: StatusCode, body: ErrorBody },
    #[error("Request failed with status code {}", .status.as_u16())]
    Status { status: StatusCode },
    #[error("Invalid login response")]
    InvalidLoginResponse,
    #[error("User not authenticated")]
    NotAuthenticated,
    #[error("No token found. Please log in again.")]
    MissingToken,
    #[error("{0}")]
    Storage(#[from] StorageError),
}

impl Failure {
    /// Flatten this failure into the canonical [`ApiError`], using
    /// `default_message` as the `responseMessage` when the backend didn't
    /// provide one.
    pub(crate) fn into_api_error(self, default_message: &str) -> ApiError {
        let kind = self.kind();

        match self {
            Failure::Rejected { body, .. } => ApiError {
                response_code: body
                    .response_code
                    .and_then(text)
                    .unwrap_or_else(|| String::from(FAILURE_RESPONSE_CODE)),
                response_message: body
                    .response_message
                    .and_then(text)
                    .unwrap_or_else(|| String::from(default_message)),
                error_message: body
                    .error_message
                    .and_then(text)
                    .unwrap_or_else(|| String::from(GENERIC_ERROR_MESSAGE)),
                kind,
            },
            other => {
                let mut message = other.to_string();
                if message.trim().is_empty() {
                    message = String::from(GENERIC_ERROR_MESSAGE);
                }

                ApiError::new(kind, default_message, message)
            },
        }
    }

    fn kind(&self) -> ErrorKind {
        match self {
            Failure::HttpClient(e) if e.is_decode() => {
                ErrorKind::InvalidResponse
            },
            Failure::HttpClient(_) | Failure::BadUrl(_) => ErrorKind::Transport,
            Failure::Rejected { .. } | Failure::Status { .. } => {
                ErrorKind::Backend
            },
            Failure::Decode(_) | Failure::InvalidLoginResponse => {
                ErrorKind::InvalidResponse
            },
            Failure::NotAuthenticated | Failure::MissingToken => {
                ErrorKind::NotAuthenticated
            },
            Failure::Storage(_) => ErrorKind::Storage,
        }
    }
}

/// The structured error body the backend sends alongside an error status.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub response_code: Option<Value>,
    #[serde(default)]
    pub response_message: Option<Value>,
    #[serde(default)]
    pub error_message: Option<Value>,
}

impl ErrorBody {
    /// Try to interpret a response body as a structured error. Anything which
    /// isn't a JSON object doesn't count.
    pub(crate) fn parse(body: &[u8]) -> Option<ErrorBody> {
        match serde_json::from_slice::<Value>(body) {
            Ok(value @ Value::Object(_)) => serde_json::from_value(value).ok(),
            _ => None,
        }
    }
}

/// Backends aren't consistent about sending codes as strings or numbers.
fn text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn structured_body_passes_through_unmodified() {
        let body = ErrorBody::parse(
            br#"{"responseCode":"3","responseMessage":"bad","errorMessage":"oops"}"#,
        )
        .unwrap();
        let failure = Failure::Rejected {
            status: StatusCode::BAD_REQUEST,
            body,
        };

        let got = failure.into_api_error("Error creating task");

        assert_eq!(got.response_code, "3");
        assert_eq!(got.response_message, "bad");
        assert_eq!(got.error_message, "oops");
        assert_eq!(got.kind, ErrorKind::Backend);
    }

    #[test]
    fn missing_fields_use_the_defaults() {
        let body = ErrorBody::parse(br#"{"detail":"nope"}"#).unwrap();
        let failure = Failure::Rejected {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body,
        };

        let got = failure.into_api_error("Login failed");

        assert_eq!(
            got,
            ApiError::new(
                ErrorKind::Backend,
                "Login failed",
                GENERIC_ERROR_MESSAGE
            )
        );
    }

    #[test]
    fn numeric_response_codes_are_stringified() {
        let body = ErrorBody::parse(br#"{"responseCode":2}"#).unwrap();

        let got = Failure::Rejected {
            status: StatusCode::CONFLICT,
            body,
        }
        .into_api_error("Registration failed");

        assert_eq!(got.response_code, "2");
    }

    #[test]
    fn only_json_objects_are_structured() {
        assert_eq!(ErrorBody::parse(b"<html>Bad Gateway</html>"), None);
        assert_eq!(ErrorBody::parse(b"\"just a string\""), None);
        assert_eq!(ErrorBody::parse(b""), None);
        assert!(ErrorBody::parse(b"{}").is_some());
    }

    #[test]
    fn unstructured_status_uses_the_status_message() {
        let got = Failure::Status {
            status: StatusCode::NOT_FOUND,
        }
        .into_api_error("Error fetching tasks");

        assert_eq!(
            got,
            ApiError::new(
                ErrorKind::Backend,
                "Error fetching tasks",
                "Request failed with status code 404"
            )
        );
    }

    #[test]
    fn local_preconditions_are_normalized() {
        let got = Failure::MissingToken.into_api_error("Logout failed");

        assert_eq!(got.response_code, "1");
        assert_eq!(got.response_message, "Logout failed");
        assert_eq!(got.error_message, "No token found. Please log in again.");
        assert_eq!(got.kind, ErrorKind::NotAuthenticated);
    }

    #[test]
    fn serializes_with_the_wire_names() {
        let error = ApiError::new(ErrorKind::Transport, "Login failed", "boom");

        let got = serde_json::to_value(&error).unwrap();

        assert_eq!(
            got,
            json!({
                "responseCode": "1",
                "responseMessage": "Login failed",
                "errorMessage": "boom",
            })
        );
    }
}
