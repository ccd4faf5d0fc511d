//! Input Error Types

use thiserror::Error;

/// Result type for input operations
pub type Result<T> = std::result::Result<T, InputError>;

/// Input module error types
#[derive(Error, Debug)]
pub enum InputError {
    /// Screen dimensions unusable for pointer normalization
    #[error("Invalid screen size: {0}x{1}")]
    InvalidScreenSize(u32, u32),

    /// Orientation sample with non-finite components
    #[error("Invalid orientation sample: [{0}, {1}, {2}, {3}]")]
    InvalidOrientation(f32, f32, f32, f32),

    /// Sensor source has stopped producing samples
    #[error("Sensor source exhausted")]
    SourceExhausted,
}
