use crate::bootstrap::Stage;
use crate::error::daemon_call::{DaemonCallError, DaemonError, TransportError};
use crate::error::validation::ValidationError;
use thiserror::Error;

/// Failure reported by an external input collector.
pub type CollectError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("Failed to collect account details")]
    CollectFailed(#[source] CollectError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Email address is already in use")]
    EmailInUse(#[source] DaemonError),

    #[error("Signup failed")]
    SignupFailed(#[source] DaemonCallError),

    #[error("Account setup failed while {stage}")]
    StageFailure {
        stage: Stage,
        #[source]
        cause: StageFailureCause,
    },

    #[error("Account setup was canceled while {stage}")]
    Canceled { stage: Stage },

    #[error("Account setup cannot be resumed at '{0}'")]
    CannotResumeAt(Stage),
}

/// Why a post-signup stage failed.
#[derive(Error, Debug)]
pub enum StageFailureCause {
    #[error("the daemon rejected the request")]
    Rejected(#[source] DaemonError),

    #[error("lost contact with the daemon; the stage may or may not have completed")]
    Transport(#[source] TransportError),

    #[error("no organization named '{0}' was found")]
    MissingOrganization(String),

    #[error("the daemon exchange could not be encoded or decoded")]
    Protocol(#[source] DaemonCallError),
}

impl BootstrapError {
    /// Wraps a failed daemon call made during `stage`.
    pub(crate) fn from_stage_call(stage: Stage, err: DaemonCallError) -> Self {
        let cause = match err {
            DaemonCallError::Canceled => return BootstrapError::Canceled { stage },
            DaemonCallError::Daemon(err) => StageFailureCause::Rejected(err),
            DaemonCallError::Transport(err) => StageFailureCause::Transport(err),
            other => StageFailureCause::Protocol(other),
        };
        BootstrapError::StageFailure { stage, cause }
    }

    /// The stage the pipeline stopped in.
    pub fn stage(&self) -> Stage {
        match self {
            BootstrapError::CollectFailed(_) | BootstrapError::Validation(_) => Stage::Collecting,
            BootstrapError::EmailInUse(_) | BootstrapError::SignupFailed(_) => Stage::SigningUp,
            BootstrapError::StageFailure { stage, .. } | BootstrapError::Canceled { stage } => {
                *stage
            }
            BootstrapError::CannotResumeAt(stage) => *stage,
        }
    }

    /// The stage an operator can safely resume at. Signup is never a resume
    /// point: repeating it against an existing account yields "resource exists".
    pub fn resume_point(&self) -> Option<Stage> {
        match self {
            BootstrapError::StageFailure { stage, .. } | BootstrapError::Canceled { stage }
                if stage.is_resumable() =>
            {
                Some(*stage)
            }
            _ => None,
        }
    }
}
