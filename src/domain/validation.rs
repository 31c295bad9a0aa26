//! Input validation errors raised by the scoring pipeline.

/// Malformed caller input. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Region id must be a positive integer, got {0}")]
    InvalidRegionId(i64),

    #[error("Population must be positive, got {0}")]
    NonPositivePopulation(i64),
}

/// Reject non-positive region ids.
///
/// # Errors
/// Returns `ValidationError::InvalidRegionId` if `region_id <= 0`.
pub fn ensure_region_id(region_id: i64) -> Result<(), ValidationError> {
    if region_id <= 0 {
        return Err(ValidationError::InvalidRegionId(region_id));
    }
    Ok(())
}
