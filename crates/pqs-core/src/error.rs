//! Library error type.
//!
//! Configuration problems surface here during node construction or
//! `Pqs::setup_sphere`; per-vertex evaluation only fails when the sphere
//! was never set up for its current mod list.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PqsError {
    #[error("mod '{mod_name}' requires {resource}, which is not set")]
    MissingResource { mod_name: String, resource: String },

    #[error("curve needs at least 4 control points, got {found}")]
    TooFewControlPoints { found: usize },

    #[error("invalid range for {what}: min {min} > max {max}")]
    InvalidRange { what: &'static str, min: f64, max: f64 },

    #[error("invalid value for {what}: {value}")]
    InvalidParameter { what: &'static str, value: f64 },

    #[error("radius bounds are inverted: min {radius_min} > max {radius_max}")]
    InvalidBounds { radius_min: f64, radius_max: f64 },

    #[error("setup of mod '{name}' failed: {source}")]
    ModSetup {
        name: String,
        #[source]
        source: Box<PqsError>,
    },

    #[error("sphere is not set up for its current mod list; call setup_sphere first")]
    NotSetUp,

    #[error("invalid sphere configuration: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PqsError>;

impl PqsError {
    pub(crate) fn missing(mod_name: &str, resource: &str) -> Self {
        Self::MissingResource { mod_name: mod_name.to_string(), resource: resource.to_string() }
    }
}
