use std::io::Write;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::aws::{CommandStatus, OutputLocation, RunCommand, SessionBroker, SessionDocument};
use crate::error::AppError;
use crate::session::Session;
use crate::transport::{self, ProcessRunner, RunMode, TransportInvocation};

/// What to do with the chosen instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Ssh,
    Shell,
    PrintId,
    SendCommand,
}

impl Action {
    /// Sub-menu order.
    pub const ALL: [Action; 4] = [
        Action::Ssh,
        Action::Shell,
        Action::PrintId,
        Action::SendCommand,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Action::Ssh => "Connect to instance (SSH)",
            Action::Shell => "Connect to instance (SSM Session)",
            Action::PrintId => "Print instance ID",
            Action::SendCommand => "Send Command",
        }
    }

    /// Single-key shortcut on the instance list.
    pub fn shortcut(self) -> char {
        match self {
            Action::Ssh => 's',
            Action::Shell => 'm',
            Action::PrintId => 'i',
            Action::SendCommand => 'c',
        }
    }

    pub fn from_shortcut(key: char) -> Option<Self> {
        Action::ALL.into_iter().find(|a| a.shortcut() == key)
    }
}

/// An action bound to its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub instance_id: String,
    pub action: Action,
    /// Shell text for [`Action::SendCommand`].
    pub command: Option<String>,
}

/// SSH login details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshOptions {
    pub user: String,
    pub identity: Option<PathBuf>,
}

/// Everything the session-based actions need besides the services.
#[derive(Debug, Clone)]
pub struct Context {
    pub plugin: String,
    pub region: String,
    /// Profile name passed to the transport helper.
    pub profile: String,
    pub output: OutputLocation,
}

/// Routes a [`Selection`] to its flow.
pub struct Dispatcher<'a, C: ?Sized, R: ?Sized> {
    cloud: &'a C,
    runner: &'a R,
    context: &'a Context,
}

impl<'a, C, R> Dispatcher<'a, C, R>
where
    C: SessionBroker + RunCommand + ?Sized,
    R: ProcessRunner + ?Sized,
{
    pub fn new(cloud: &'a C, runner: &'a R, context: &'a Context) -> Self {
        Self {
            cloud,
            runner,
            context,
        }
    }

    pub fn dispatch<W: Write>(
        &self,
        selection: &Selection,
        ssh: &SshOptions,
        out: &mut W,
    ) -> Result<(), AppError> {
        let instance_id = selection.instance_id.as_str();
        match selection.action {
            Action::Ssh => self.ssh(instance_id, ssh),
            Action::Shell => self.shell(instance_id, out),
            Action::PrintId => print_id(instance_id, out),
            Action::SendCommand => {
                let command = selection.command.as_deref().unwrap_or_default();
                self.send_command(instance_id, command, out)
            }
        }
    }

    /// Interactive shell through the transport helper. A failing helper is
    /// logged, not returned; a missing one is.
    ///
    /// Ctrl-C is latched from before the session opens until after it is
    /// closed, so an interrupt can't kill us while a session is held.
    pub fn shell<W: Write>(&self, instance_id: &str, out: &mut W) -> Result<(), AppError> {
        writeln!(out, "Starting session with {}", instance_id)?;
        out.flush()?;

        let interrupts = self.runner.catch_interrupts();
        let session = Session::open(self.cloud, instance_id, SessionDocument::Shell)?;
        let invocation = self.invocation(&session)?;
        debug!(command = %invocation.proxy_command(), "starting shell session");

        match self
            .runner
            .run(&invocation.program, &invocation.args, RunMode::Interactive)
        {
            Ok(status) if !status.success() => {
                warn!(instance_id, %status, "shell session ended with an error");
            }
            Ok(_) => {}
            Err(source) => {
                let err = transport::launch_error(&invocation.program, source);
                if let AppError::TransportNotFound { .. } = err {
                    session.close()?;
                    return Err(err);
                }
                warn!(instance_id, "shell session failed: {}", err);
            }
        }
        session.close()?;
        if interrupts.tripped() {
            debug!(instance_id, "interrupted while the shell session was open");
        }
        Ok(())
    }

    /// SSH with the transport helper as ProxyCommand. An interrupt anywhere
    /// in the session counts as the user ending it.
    pub fn ssh(&self, instance_id: &str, options: &SshOptions) -> Result<(), AppError> {
        let interrupts = self.runner.catch_interrupts();
        let session = Session::open(self.cloud, instance_id, SessionDocument::Ssh)?;
        let invocation = self.invocation(&session)?;
        let args = ssh_args(&invocation, instance_id, options);
        debug!(?args, "running ssh");

        let status = match self.runner.run("ssh", &args, RunMode::Foreground) {
            Ok(status) => status,
            Err(source) => {
                session.close()?;
                return Err(AppError::Launch {
                    program: "ssh".to_string(),
                    source,
                });
            }
        };
        session.close()?;

        if interrupts.tripped() {
            debug!(instance_id, "ssh interrupted by user");
            return Ok(());
        }
        if !status.success() {
            return Err(AppError::SshFailed(status));
        }
        Ok(())
    }

    /// Run one shell command remotely and print what it wrote to stdout.
    ///
    /// Ctrl-C while waiting stops the wait; the command keeps running remotely.
    pub fn send_command<W: Write>(
        &self,
        instance_id: &str,
        command: &str,
        out: &mut W,
    ) -> Result<(), AppError> {
        let interrupts = self.runner.catch_interrupts();
        let command_id = self
            .cloud
            .send_command(instance_id, command, &self.context.output)?;
        debug!(command_id, instance_id, command, "command sent");

        let Some(status) =
            self.cloud
                .wait_command_executed(&command_id, instance_id, &*interrupts)?
        else {
            warn!(
                command_id,
                instance_id, "interrupted; the command is still running on the instance"
            );
            return Ok(());
        };
        let invocation = self.cloud.get_command_invocation(&command_id, instance_id)?;
        write!(out, "{}", invocation.standard_output)?;
        out.flush()?;

        if status == CommandStatus::Success {
            Ok(())
        } else {
            if !invocation.standard_error.is_empty() {
                warn!(command_id, "stderr: {}", invocation.standard_error.trim_end());
            }
            Err(AppError::CommandFailed {
                command_id,
                status: status.label().to_string(),
            })
        }
    }

    fn invocation<B: SessionBroker + ?Sized>(
        &self,
        session: &Session<'_, B>,
    ) -> Result<TransportInvocation, AppError> {
        TransportInvocation::new(
            &self.context.plugin,
            session.handle(),
            &self.context.region,
            &self.context.profile,
        )
    }
}

/// Echo the id, nothing else.
pub fn print_id<W: Write>(instance_id: &str, out: &mut W) -> Result<(), AppError> {
    writeln!(out, "{}", instance_id)?;
    out.flush()?;
    Ok(())
}

/// Argument list for `ssh`, proxying through the transport helper.
pub fn ssh_args(
    invocation: &TransportInvocation,
    instance_id: &str,
    options: &SshOptions,
) -> Vec<String> {
    let mut args = vec!["-o".to_string(), invocation.ssh_proxy_option()];
    if let Some(identity) = &options.identity {
        args.push("-i".to_string());
        args.push(identity.display().to_string());
    }
    args.push(format!("{}@{}", options.user, instance_id));
    args
}
