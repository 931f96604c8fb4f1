//! Process exit codes.

use std::process::ExitCode;

use action_flow::{ReplayError, RunResult, RunStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Success,
    /// Step failure, or a session error during the run.
    Failed,
    /// Invocation error: bad arguments, overrides or configuration.
    Usage,
    NotFound,
    Malformed,
    MissingVariable,
    SessionError,
    Aborted,
}

impl Exit {
    pub fn code(self) -> u8 {
        match self {
            Exit::Success => 0,
            Exit::Failed => 1,
            Exit::Usage => 2,
            Exit::NotFound => 3,
            Exit::Malformed => 4,
            Exit::MissingVariable => 5,
            Exit::SessionError => 6,
            Exit::Aborted => 130,
        }
    }

    pub fn for_error(err: &ReplayError) -> Self {
        match err {
            ReplayError::NotFound(_) => Exit::NotFound,
            ReplayError::Malformed { .. } => Exit::Malformed,
            ReplayError::MissingVariable(_) => Exit::MissingVariable,
            ReplayError::SessionError(_) => Exit::SessionError,
            ReplayError::Aborted { .. } => Exit::Aborted,
            ReplayError::TargetNotFound { .. } | ReplayError::ActionFailed { .. } => Exit::Failed,
        }
    }

    pub fn for_run(run: &RunResult) -> Self {
        match run.status {
            RunStatus::Completed => Exit::Success,
            RunStatus::Aborted => Exit::Aborted,
            _ => run
                .fatal_error
                .as_ref()
                .map(Self::for_error)
                .unwrap_or(Exit::Failed),
        }
    }

    /// Replay errors anywhere in the chain keep their code; anything else is
    /// an invocation error.
    pub fn for_anyhow(err: &anyhow::Error) -> Self {
        err.chain()
            .find_map(|cause| cause.downcast_ref::<ReplayError>())
            .map(Self::for_error)
            .unwrap_or(Exit::Usage)
    }
}

impl From<Exit> for ExitCode {
    fn from(exit: Exit) -> Self {
        ExitCode::from(exit.code())
    }
}
