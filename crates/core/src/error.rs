#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The iteration input was neither null, an array, nor an object.
    #[error("Invalid items input: expected null, array, or object, got {0}")]
    InvalidItems(&'static str),
}
