use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parsing error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config serialization error: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    #[error("Unsupported image format: {path}")]
    UnsupportedFormat { path: String },

    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Telegram API error {code}: {description}")]
    Api { code: i64, description: String },
}

/// Custom result type
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(field: &str, message: &str) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    pub fn unsupported_format(path: &str) -> Self {
        Self::UnsupportedFormat {
            path: path.to_string(),
        }
    }
}

/// Failure of a single send attempt, as reported by a transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("request rejected ({status}): {description}")]
    Rejected { status: u16, description: String },

    #[error("malformed request: {0}")]
    Malformed(String),
}

impl TransportError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn rejected(status: u16, description: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            description: description.into(),
        }
    }

    /// Timeouts and network-layer failures are worth another attempt; a
    /// rejection by the remote API will recur.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::Timeout | TransportError::Network(_))
    }

    pub fn is_permanent(&self) -> bool {
        !self.is_retryable()
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            TransportError::Timeout
        } else if error.is_builder() {
            TransportError::Malformed(error.to_string())
        } else if let Some(status) = error.status() {
            classify_status(status.as_u16(), &error.to_string())
        } else {
            TransportError::Network(error.to_string())
        }
    }
}

/// Map an unsuccessful HTTP status onto a transport failure class.
///
/// Client errors the Bot API uses for bad payloads, bad tokens, missing
/// permissions and flood control are final. Anything else (gateway errors,
/// unexpected codes) is treated as a network-layer disruption.
pub fn classify_status(status: u16, description: &str) -> TransportError {
    match status {
        400 | 401 | 403 | 404 | 409 | 429 => TransportError::rejected(status, description),
        _ => TransportError::network(format!("{} ({})", description, status)),
    }
}

/// Terminal outcome of a delivery once retries are no longer an option.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("gave up after {attempts} attempts: {last}")]
    ExhaustedRetries { attempts: u32, last: TransportError },

    #[error("rejected on attempt {attempt}: {source}")]
    Rejected {
        attempt: u32,
        #[source]
        source: TransportError,
    },
}

impl DeliveryError {
    pub fn attempts(&self) -> u32 {
        match self {
            DeliveryError::ExhaustedRetries { attempts, .. } => *attempts,
            DeliveryError::Rejected { attempt, .. } => *attempt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_classification() {
        assert!(TransportError::Timeout.is_retryable());
        assert!(TransportError::network("connection reset").is_retryable());
        assert!(TransportError::rejected(400, "Bad Request").is_permanent());
        assert!(TransportError::Malformed("bad mime".to_string()).is_permanent());
    }

    #[test]
    fn test_classify_status() {
        assert!(classify_status(401, "Unauthorized").is_permanent());
        assert!(classify_status(403, "Forbidden").is_permanent());
        assert!(classify_status(429, "Too Many Requests").is_permanent());
        assert!(classify_status(502, "Bad Gateway").is_retryable());
        assert!(classify_status(500, "Internal Server Error").is_retryable());
    }

    #[test]
    fn test_delivery_error_attempts() {
        let exhausted = DeliveryError::ExhaustedRetries {
            attempts: 3,
            last: TransportError::Timeout,
        };
        assert_eq!(exhausted.attempts(), 3);

        let rejected = DeliveryError::Rejected {
            attempt: 1,
            source: TransportError::rejected(400, "Bad Request"),
        };
        assert_eq!(rejected.attempts(), 1);
        assert!(rejected.to_string().contains("Bad Request"));
    }
}
