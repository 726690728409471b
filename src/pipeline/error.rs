use std::time::Duration;
use thiserror::Error;

use super::adapters::AdapterError;
use super::orchestrator::PipelineStage;

/// Why a pipeline run was abandoned
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{stage:?} adapter failed: {source}")]
    Adapter {
        stage: PipelineStage,
        #[source]
        source: AdapterError,
    },

    #[error("{stage:?} adapter timed out after {after:?}")]
    Timeout { stage: PipelineStage, after: Duration },

    #[error("cancelled during {stage:?}")]
    Cancelled { stage: PipelineStage },

    #[error("session {0} already has a run in flight")]
    Busy(String),

    #[error("session {0} closed before delivery")]
    SessionClosed(String),

    #[error("delivery failed: {0}")]
    Delivery(#[from] crate::transport::DeliveryError),
}

/// How a failure is reported; none of them end the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Worth another try on the next utterance (network, rate limit, timeout)
    Transient,
    /// Adapter misconfiguration or bad upstream payload
    Permanent,
    /// Session went away mid-run; result discarded
    Discarded,
}

impl PipelineError {
    pub fn class(&self) -> ErrorClass {
        match self {
            PipelineError::Adapter { source, .. } if source.is_transient() => ErrorClass::Transient,
            PipelineError::Adapter { .. } => ErrorClass::Permanent,
            PipelineError::Timeout { .. } => ErrorClass::Transient,
            PipelineError::Delivery(_) | PipelineError::Busy(_) => ErrorClass::Transient,
            PipelineError::Cancelled { .. } | PipelineError::SessionClosed(_) => {
                ErrorClass::Discarded
            }
        }
    }
}
