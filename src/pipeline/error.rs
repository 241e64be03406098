use crate::config::ConfigError;
use crate::image::ImageError;
use thiserror::Error;

/// Failure raised by a filter implementation.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("input {0} is not available")]
    MissingInput(usize),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("incompatible inputs: {0}")]
    IncompatibleInputs(String),

    #[error("execution aborted")]
    Aborted,

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error("{0}")]
    Failed(String),
}

/// Coarse classification of a pipeline failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Allocation,
    Aborted,
    Execution,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("unknown stage id {0}")]
    UnknownStage(usize),

    #[error("stage `{stage}` has no input slot {slot} ({available} slots)")]
    InvalidInputSlot {
        stage: String,
        slot: usize,
        available: usize,
    },

    #[error("stage `{stage}` has no output {output}")]
    InvalidOutput { stage: String, output: usize },

    #[error("stage `{stage}` has nothing connected to input {slot}")]
    MissingInput { stage: String, slot: usize },

    #[error("connecting `{from}` to `{to}` would create a cycle")]
    Cycle { from: String, to: String },

    #[error("stage `{stage}` is not of the requested filter type")]
    StageTypeMismatch { stage: String },

    #[error("configuration error in stage `{stage}`: {source}")]
    Configuration {
        stage: String,
        #[source]
        source: FilterError,
    },

    #[error("stage `{stage}` has no valid output information; run the information pass first")]
    InformationNotValid { stage: String },

    #[error("stage `{stage}` has no negotiated requested region; propagate the request first")]
    RegionsNotNegotiated { stage: String },

    #[error("requested region {requested} of stage `{stage}` is outside its largest possible region {largest}")]
    InvalidRequestedRegion {
        stage: String,
        requested: String,
        largest: String,
    },

    #[error("stage `{stage}` could not allocate its output: {source}")]
    Allocation {
        stage: String,
        #[source]
        source: ImageError,
    },

    #[error("execution of stage `{stage}` was aborted")]
    Aborted { stage: String },

    #[error("stage `{stage}` failed: {source}")]
    Execution {
        stage: String,
        #[source]
        source: FilterError,
    },

    #[error("updating `{stage}` failed in upstream stage `{origin}`: {source}")]
    Upstream {
        stage: String,
        origin: String,
        #[source]
        source: Box<PipelineError>,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl PipelineError {
    /// Kind of the originating failure, looking through upstream wrapping.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Upstream { source, .. } => source.kind(),
            PipelineError::Allocation { .. } => ErrorKind::Allocation,
            PipelineError::Aborted { .. } => ErrorKind::Aborted,
            PipelineError::Execution { .. } => ErrorKind::Execution,
            _ => ErrorKind::Configuration,
        }
    }

    /// Name of the stage where the failure happened, if it concerns one.
    pub fn origin(&self) -> Option<&str> {
        match self {
            PipelineError::Upstream { origin, .. } => Some(origin.as_str()),
            PipelineError::InvalidInputSlot { stage, .. }
            | PipelineError::InvalidOutput { stage, .. }
            | PipelineError::MissingInput { stage, .. }
            | PipelineError::StageTypeMismatch { stage }
            | PipelineError::Configuration { stage, .. }
            | PipelineError::InformationNotValid { stage }
            | PipelineError::RegionsNotNegotiated { stage }
            | PipelineError::InvalidRequestedRegion { stage, .. }
            | PipelineError::Allocation { stage, .. }
            | PipelineError::Aborted { stage }
            | PipelineError::Execution { stage, .. } => Some(stage.as_str()),
            PipelineError::UnknownStage(_)
            | PipelineError::Cycle { .. }
            | PipelineError::Config(_)
            | PipelineError::ThreadPool(_) => None,
        }
    }

    /// Wraps a failure of stage `origin` as seen from the update of `stage`.
    pub(crate) fn upstream(stage: &str, origin: &str, source: PipelineError) -> Self {
        PipelineError::Upstream {
            stage: stage.to_string(),
            origin: origin.to_string(),
            source: Box::new(source),
        }
    }

    /// Maps a filter failure during generation to the pipeline taxonomy.
    pub(crate) fn from_filter(stage: &str, error: FilterError) -> Self {
        match error {
            FilterError::Aborted => PipelineError::Aborted {
                stage: stage.to_string(),
            },
            FilterError::Image(source @ (ImageError::Allocation { .. } | ImageError::TooLarge { .. })) => {
                PipelineError::Allocation {
                    stage: stage.to_string(),
                    source,
                }
            }
            source => PipelineError::Execution {
                stage: stage.to_string(),
                source,
            },
        }
    }
}
