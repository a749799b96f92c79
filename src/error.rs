//!
//! Error taxonomy of the public API.
//!
//! Every failure is recoverable at the API boundary: structural mutations
//! either take effect atomically or leave the model unchanged.
//!
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HmmError {
    #[error("state {0} was not found in the model")]
    StateNotFound(String),

    #[error("tried to add state {0} but the model already contains it")]
    StateExists(String),

    #[error("transition {from} -> {to} was not found in the model")]
    TransitionNotFound { from: String, to: String },

    #[error("tried to add transition {from} -> {to} but the model already contains it")]
    TransitionExists { from: String, to: String },

    #[error("transition {from} -> {to} is not allowed: {reason}")]
    TransitionLogic {
        from: String,
        to: String,
        reason: String,
    },

    #[error("state {0} is silent and has no distribution")]
    StateHasNoDistribution(String),

    #[error("symbol {0} not found in distribution")]
    DistributionSymbolNotFound(String),

    #[error("compile failed: {0}")]
    CompileError(String),

    #[error("sequence is empty")]
    EmptySequence,

    #[error("model has not been compiled; call compile() first")]
    NotCompiled,

    #[error("operation not supported: {0}")]
    Unsupported(String),

    #[error("malformed model file: {0}")]
    Parse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_trigger() {
        let err = HmmError::StateNotFound("s1".to_string());
        assert!(err.to_string().contains("s1"));
        let err = HmmError::TransitionLogic {
            from: "end".to_string(),
            to: "s1".to_string(),
            reason: "transitions cannot leave the end state".to_string(),
        };
        assert!(err.to_string().contains("end -> s1"));
    }
}
