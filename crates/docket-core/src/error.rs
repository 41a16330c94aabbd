use thiserror::Error;

/// Application-wide error types.
///
/// This enum represents all errors that can cross a crate boundary in Docket.
/// It uses the `thiserror` crate for ergonomic error handling and automatic
/// conversion from underlying library errors.
///
/// # Error Conversion
///
/// - `sqlx::Error` → `AppError::DatabaseError`
/// - `serde_json::Error` → `AppError::SerializationError`
///
/// HTTP errors are mapped by `docket-client` into [`AppError::ClientError`],
/// [`AppError::NetworkError`], [`AppError::Timeout`] or [`AppError::HttpStatus`]
/// so that this crate stays free of an HTTP dependency.
///
/// # Examples
///
/// ```
/// use docket_core::error::AppError;
///
/// fn example() -> Result<(), AppError> {
///     Err(AppError::NotConnected)
/// }
///
/// assert!(example().unwrap_err().is_not_connected());
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// Database operation failed.
    ///
    /// This error wraps all errors from SQLx database operations, including
    /// connection failures, query errors, constraint violations and
    /// statement timeouts raised inside a batch transaction.
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    /// HTTP client request failed for a reason other than a status code.
    #[error("API Client error: {0}")]
    ClientError(String),

    /// The remote API answered with a non-success status.
    ///
    /// Rate-limit statuses only surface here once the fetch client has
    /// exhausted its retries.
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// JSON serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A requested local record does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Network or connection error.
    ///
    /// DNS resolution failures, refused or reset connections.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timeout.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Rate limit still in effect after all retries.
    #[error("Rate limit exceeded. Please wait and try again.")]
    RateLimitExceeded,

    /// No bearer credential is available for the remote API.
    ///
    /// This is not a failure of the remote system: the account has simply not
    /// been connected (or its token expired). Callers should present it as a
    /// "connect your account" condition rather than an outage.
    #[error("Not connected to the case-management service")]
    NotConnected,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A sync phase whose failure ends the whole run.
    #[error("Sync aborted in {phase} phase: {reason}")]
    SyncAborted { phase: String, reason: String },

    /// Generic application error for cases not covered by specific variants.
    ///
    /// Use this sparingly - prefer creating specific error variants
    /// for better error handling and debugging.
    #[error("Error: {0}")]
    Generic(String),
}

impl AppError {
    /// Returns a user-friendly error message suitable for CLI output.
    pub fn user_message(&self) -> String {
        match self {
            AppError::DatabaseError(e) => {
                if e.to_string().contains("connection") {
                    "Cannot connect to database. Is PostgreSQL running?\n   Try: docker-compose up -d".to_string()
                } else {
                    format!("Database error: {}", e)
                }
            }
            AppError::ClientError(msg) => format!("API error: {}", msg),
            AppError::HttpStatus { status, .. } if *status == 401 || *status == 403 => {
                "The case-management service rejected the credential.\n   Reconnect the account and try again.".to_string()
            }
            AppError::HttpStatus { status, url } => {
                format!("The case-management service returned HTTP {} for {}", status, url)
            }
            AppError::NetworkError(msg) => {
                format!("Network error: {}\n   Check your internet connection.", msg)
            }
            AppError::Timeout(secs) => {
                format!(
                    "Request timed out after {} seconds.\n   The service may be overloaded. Try again later.",
                    secs
                )
            }
            AppError::RateLimitExceeded => {
                "Too many requests. Please wait a moment and try again.".to_string()
            }
            AppError::NotConnected => {
                "No case-management account is connected.\n   Set DOCKET_API_TOKEN or connect the account first.".to_string()
            }
            AppError::ConfigError(msg) => {
                format!(
                    "Configuration error: {}\n   Check your environment variables.",
                    msg
                )
            }
            _ => self.to_string(),
        }
    }

    /// Returns true if this error is transient.
    ///
    /// # Examples
    ///
    /// ```
    /// use docket_core::error::AppError;
    ///
    /// assert!(AppError::NetworkError("connection reset".to_string()).is_retryable());
    /// assert!(AppError::RateLimitExceeded.is_retryable());
    /// assert!(!AppError::NotConnected.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::NetworkError(_) | AppError::Timeout(_) | AppError::RateLimitExceeded => true,
            AppError::HttpStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns true if this error means the account has no usable credential.
    pub fn is_not_connected(&self) -> bool {
        matches!(self, AppError::NotConnected)
    }
}
