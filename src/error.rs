use thiserror::Error;

/// Caller-side misuse of the calibration service.
///
/// These are never produced by sensor noise: the per-frame path does not
/// return errors at all.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CalibrationError {
    #[error("no calibration samples collected")]
    NoSamples,
    #[error("no angle collection in progress")]
    NoActiveCollection,
    #[error("angle collection has no samples")]
    EmptyCollection,
    #[error("no angle collections completed")]
    NoAngleCollections,
    #[error("angle collection has no screen-angle signals")]
    MissingScreenSignals,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("landmark set must have {expected} entries, got {actual}")]
pub struct LandmarkCountError {
    pub expected: usize,
    pub actual: usize,
}
