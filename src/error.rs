use std::process::ExitStatus;

use thiserror::Error;

use crate::aws::AwsError;

/// Everything that can end an invocation early.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Aws(#[from] AwsError),

    #[error("the {program} executable could not be found")]
    TransportNotFound { program: String },

    #[error("{program} did not identify itself as the Session Manager plugin: {output}")]
    TransportUnverified { program: String, output: String },

    #[error("failed to launch {program}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("ssh exited with {0}")]
    SshFailed(ExitStatus),

    #[error("command {command_id} finished with status {status}")]
    CommandFailed { command_id: String, status: String },

    #[error("no online instances found")]
    NoInstances,

    #[error("failed to write output")]
    Output(#[from] std::io::Error),

    #[error("failed to encode session parameters")]
    Encode(#[from] serde_json::Error),
}

impl AppError {
    /// A hint telling the operator what to fix, when there is one.
    pub fn guidance(&self) -> Option<&'static str> {
        match self {
            AppError::Aws(err) => err.guidance(),
            AppError::TransportNotFound { .. } | AppError::TransportUnverified { .. } => Some(
                "Install the Session Manager plugin (https://docs.aws.amazon.com/systems-manager/latest/userguide/session-manager-working-with-install-plugin.html) or set `plugin` in ~/.assm/config.",
            ),
            AppError::NoInstances => Some(
                "Only instances whose SSM agent reports Online are listed. Check the region and profile.",
            ),
            _ => None,
        }
    }
}
