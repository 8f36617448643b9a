//! Contracts for the three AWS services the tool talks to.
//!
//! Everything above this module works against these traits, so the menu,
//! session and dispatch flows can be driven by fakes. [`sdk::AwsClients`]
//! is the real implementation.

pub mod sdk;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::signals::InterruptFlag;

pub use sdk::AwsClients;

/// Session document for a plain interactive shell.
pub const SHELL_DOCUMENT: &str = "SSM-SessionManagerRunShell";
/// Session document that tunnels an SSH connection.
pub const SSH_DOCUMENT: &str = "AWS-StartSSHSession";
/// Run Command document used for one-shot commands.
pub const RUN_SHELL_SCRIPT_DOCUMENT: &str = "AWS-RunShellScript";

/// Server-side template selecting what kind of session the broker opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionDocument {
    Shell,
    Ssh,
}

impl SessionDocument {
    pub fn name(self) -> &'static str {
        match self {
            SessionDocument::Shell => SHELL_DOCUMENT,
            SessionDocument::Ssh => SSH_DOCUMENT,
        }
    }
}

/// Agent heartbeat state reported by Systems Manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PingStatus {
    Online,
    ConnectionLost,
    Inactive,
    Other(String),
}

impl PingStatus {
    pub fn from_name(name: &str) -> Self {
        match name {
            "Online" => PingStatus::Online,
            "ConnectionLost" => PingStatus::ConnectionLost,
            "Inactive" => PingStatus::Inactive,
            other => PingStatus::Other(other.to_string()),
        }
    }
}

/// One entry of the managed-instance inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentStatus {
    pub instance_id: String,
    pub ping_status: PingStatus,
}

/// Raw instance fields as returned by EC2, before any formatting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceRecord {
    pub instance_id: String,
    pub launch_time: Option<DateTime<Utc>>,
    pub image_id: Option<String>,
    pub instance_type: Option<String>,
    pub private_ip: Option<String>,
    pub state: Option<String>,
    pub vpc_id: Option<String>,
    pub subnet_id: Option<String>,
    pub tags: Vec<(String, String)>,
}

/// An open broker session. Closing it is the job of [`crate::session::Session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    pub session_id: String,
    pub token_value: String,
    pub stream_url: String,
    /// Systems Manager endpoint the transport helper talks to.
    pub endpoint_url: String,
    pub instance_id: String,
}

/// Where Run Command stores captured output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLocation {
    pub bucket: String,
    pub key_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandStatus {
    Pending,
    InProgress,
    Delayed,
    Success,
    Failed,
    Cancelled,
    TimedOut,
    Other(String),
}

impl CommandStatus {
    pub fn from_name(name: &str) -> Self {
        match name {
            "Pending" => CommandStatus::Pending,
            "InProgress" => CommandStatus::InProgress,
            "Delayed" => CommandStatus::Delayed,
            "Success" => CommandStatus::Success,
            "Failed" => CommandStatus::Failed,
            "Cancelled" => CommandStatus::Cancelled,
            "TimedOut" => CommandStatus::TimedOut,
            other => CommandStatus::Other(other.to_string()),
        }
    }

    /// Whether the invocation can still change state.
    pub fn is_running(&self) -> bool {
        matches!(
            self,
            CommandStatus::Pending | CommandStatus::InProgress | CommandStatus::Delayed
        )
    }

    pub fn label(&self) -> &str {
        match self {
            CommandStatus::Pending => "Pending",
            CommandStatus::InProgress => "InProgress",
            CommandStatus::Delayed => "Delayed",
            CommandStatus::Success => "Success",
            CommandStatus::Failed => "Failed",
            CommandStatus::Cancelled => "Cancelled",
            CommandStatus::TimedOut => "TimedOut",
            CommandStatus::Other(name) => name,
        }
    }
}

/// Result of one command on one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    pub status: CommandStatus,
    pub standard_output: String,
    pub standard_error: String,
}

/// Systems Manager session operations.
pub trait SessionBroker {
    fn describe_instance_information(&self) -> Result<Vec<AgentStatus>, AwsError>;
    fn start_session(
        &self,
        instance_id: &str,
        document: SessionDocument,
    ) -> Result<SessionHandle, AwsError>;
    fn terminate_session(&self, session_id: &str) -> Result<(), AwsError>;
}

/// EC2 instance lookups.
pub trait Inventory {
    fn describe_instances(&self, instance_ids: &[String]) -> Result<Vec<InstanceRecord>, AwsError>;
}

/// Systems Manager Run Command.
pub trait RunCommand {
    /// Returns the command id.
    fn send_command(
        &self,
        instance_id: &str,
        command: &str,
        output: &OutputLocation,
    ) -> Result<String, AwsError>;
    /// Blocks until the invocation leaves the running states. Gives up with
    /// `None` once `interrupts` trips.
    fn wait_command_executed(
        &self,
        command_id: &str,
        instance_id: &str,
        interrupts: &dyn InterruptFlag,
    ) -> Result<Option<CommandStatus>, AwsError>;
    fn get_command_invocation(
        &self,
        command_id: &str,
        instance_id: &str,
    ) -> Result<CommandInvocation, AwsError>;
}

/// Errors from AWS calls.
#[derive(Debug, Error)]
pub enum AwsError {
    #[error("failed to start the AWS runtime")]
    Runtime(#[source] std::io::Error),

    #[error("no AWS region configured for profile '{profile}'")]
    MissingRegion { profile: String },

    #[error("{operation} failed: {message}")]
    Service {
        operation: &'static str,
        code: Option<String>,
        message: String,
    },

    #[error("{operation} response is missing {field}")]
    MissingField {
        operation: &'static str,
        field: &'static str,
    },
}

impl AwsError {
    /// Build a service error from anything the SDK hands back.
    pub fn service(operation: &'static str, code: Option<&str>, message: impl Into<String>) -> Self {
        AwsError::Service {
            operation,
            code: code.map(str::to_string),
            message: message.into(),
        }
    }

    /// Error code reported by the service, when there is one.
    pub fn code(&self) -> Option<&str> {
        match self {
            AwsError::Service { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// A hint telling the operator what to check.
    pub fn guidance(&self) -> Option<&'static str> {
        match self {
            AwsError::MissingRegion { .. } => {
                Some("Pass --region, set AWS_REGION, or add a region to the profile in ~/.aws/config.")
            }
            AwsError::Service { code: None, .. } => {
                Some("Please check your AWS credentials and try again.")
            }
            AwsError::Service { code: Some(code), .. } => guidance_for_code(code),
            _ => None,
        }
    }
}

fn guidance_for_code(code: &str) -> Option<&'static str> {
    match code {
        "AccessDeniedException" | "AccessDenied" | "UnauthorizedOperation" => Some(
            "The credentials in use lack permission for this call. Check the IAM policy for ssm:StartSession, ssm:TerminateSession, ssm:SendCommand and ec2:DescribeInstances.",
        ),
        "UnrecognizedClientException"
        | "InvalidClientTokenId"
        | "ExpiredToken"
        | "ExpiredTokenException"
        | "AuthFailure" => Some("Please check your AWS credentials and try again."),
        "ValidationException" | "InvalidDocument" | "InvalidParameters" => Some(
            "The request was rejected as invalid. Check the instance id and that the session document exists in this region.",
        ),
        "TargetNotConnected" | "InvalidInstanceId" | "InvalidInstanceID.NotFound" => Some(
            "The instance is not reachable by Systems Manager. Check that the SSM agent is running and the instance profile allows it to register.",
        ),
        _ => None,
    }
}
