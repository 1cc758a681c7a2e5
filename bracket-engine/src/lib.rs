pub mod classify;
pub mod pipeline;
pub mod solid;
pub mod stitch;

pub mod errors {
    use bracket_io::IoError;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum EngineError {
        #[error("failed to decode drawing: {0}")]
        Decode(#[from] IoError),
        #[error("thickness must be a positive finite number, got {0}")]
        InvalidThickness(f64),
        #[error("failed to triangulate profile: {0}")]
        Triangulation(String),
    }
}

pub use classify::ClassificationStrategy;
pub use errors::EngineError;
pub use pipeline::{
    DEFAULT_THICKNESS, Diagnostics, Pipeline, PipelineOptions, ReconstructedPart, Reconstruction,
};
pub use stitch::{DEFAULT_ADJACENCY_THRESHOLD, MatchStrategy, StitchOutcome, Stitcher};
