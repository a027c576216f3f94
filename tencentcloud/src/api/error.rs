use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("[TencentCloudSDKError] Code={code}, Message={message}, RequestId={request_id}")]
    Api {
        code: String,
        message: String,
        request_id: String,
    },

    #[error("API returned error (HTTP {status}): {message}")]
    HttpError { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Too many requests, rate limited")]
    RateLimited,

    #[error("Service unavailable, retry later")]
    ServiceUnavailable,

    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),
}

const RETRYABLE_CODE_PREFIXES: &[&str] = &["RequestLimitExceeded", "InternalError", "ResourceInUse"];

const RETRYABLE_CODES: &[&str] = &["ServiceUnavailable", "FailedOperation.ResourceBusy"];

impl ApiError {
    /// TencentCloud error code, when the failure came from an API envelope
    pub fn code(&self) -> Option<&str> {
        match self {
            ApiError::Api { code, .. } => Some(code),
            _ => None,
        }
    }

    /// True when the API reports that the addressed object does not exist
    pub fn is_not_found(&self) -> bool {
        match self.code() {
            Some(code) => {
                code.starts_with("ResourceNotFound")
                    || code.ends_with(".NotFound")
                    || code.contains("NotExist")
            }
            None => false,
        }
    }

    /// True for failures that may succeed when the same call is sent again
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Api { code, .. } => {
                RETRYABLE_CODES.contains(&code.as_str())
                    || RETRYABLE_CODE_PREFIXES
                        .iter()
                        .any(|prefix| code.starts_with(prefix))
            }
            ApiError::RateLimited | ApiError::ServiceUnavailable | ApiError::Timeout(_) => true,
            _ => false,
        }
    }

    pub(crate) fn is_auth_code(code: &str) -> bool {
        code.starts_with("AuthFailure")
    }
}
