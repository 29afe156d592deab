//! Error types for hidden-line removal.

use thiserror::Error;
use vcad_kernel_hlr_geom::GeomError;

use crate::algo::AlgoState;

/// Errors that can occur while loading shapes or hiding edges.
#[derive(Error, Debug)]
pub enum HlrError {
    /// Entity store sizes are inconsistent with pending shapes.
    #[error("inconsistent store capacity: {0}")]
    Capacity(String),

    /// Shape input failed validation.
    #[error("invalid shape: {0}")]
    InvalidShape(String),

    /// No live shape at this index.
    #[error("no shape loaded at index {0}")]
    UnknownShape(usize),

    /// Projector is missing or degenerate.
    #[error("invalid projector: {0}")]
    InvalidProjector(String),

    /// Operation called out of order.
    #[error("operation requires state {required:?}, engine is {current:?}")]
    InvalidState {
        /// Minimum state the operation needs.
        required: AlgoState,
        /// State the engine is in.
        current: AlgoState,
    },

    /// Rebuilt visibility intervals do not chain.
    #[error("classification inconsistency on edge {edge} at parameter {parameter}")]
    ClassificationInconsistency {
        /// Global edge index.
        edge: usize,
        /// Parameter where the chain breaks.
        parameter: f64,
    },

    /// Point classification could not decide between IN and OUT.
    #[error("ambiguous classification on edge {edge} near parameter {parameter}")]
    AmbiguousClassification {
        /// Global edge index.
        edge: usize,
        /// Parameter of the undecided sample.
        parameter: f64,
    },

    /// Refinement of a projected crossing did not converge.
    #[error("intersection of edge {edge} with boundary edge {boundary} did not converge")]
    NonConvergentIntersection {
        /// Edge being classified.
        edge: usize,
        /// Boundary edge of the hiding face.
        boundary: usize,
    },

    /// Parameters failed validation.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// Parameters could not be parsed.
    #[error("config parse error: {0}")]
    Config(#[from] toml::de::Error),

    /// Geometry adapter failure.
    #[error(transparent)]
    Geometry(#[from] GeomError),
}

impl HlrError {
    /// Whether this error is confined to one edge or crossing, so callers
    /// may skip that unit and carry on with the rest.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            HlrError::AmbiguousClassification { .. }
                | HlrError::NonConvergentIntersection { .. }
                | HlrError::ClassificationInconsistency { .. }
        )
    }
}

/// Result type for hidden-line operations.
pub type Result<T> = std::result::Result<T, HlrError>;
