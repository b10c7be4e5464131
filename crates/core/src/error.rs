use crate::types::AlertId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A sensor sample was malformed, out of physical range, or out of
    /// order. The reading is dropped; the stream keeps flowing.
    #[error("Invalid reading: {0}")]
    InvalidReading(String),

    #[error("Alert not found: {0}")]
    AlertNotFound(AlertId),

    #[error("Alert already resolved: {0}")]
    AlertAlreadyResolved(AlertId),

    #[error("Validation failed: {0}")]
    Validation(String),
}
