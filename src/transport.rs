use std::io;
use std::process::{Command, ExitStatus, Stdio};

use serde::Serialize;
use tracing::debug;

use crate::aws::SessionHandle;
use crate::error::AppError;
use crate::signals::{InterruptFlag, InterruptLatch, UserSignalsIgnored};

pub const DEFAULT_PLUGIN: &str = "session-manager-plugin";
const PLUGIN_BANNER: &str = "The Session Manager plugin was installed successfully";

/// How a child process shares the terminal with us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Child owns the keyboard; user signals are ignored here until it exits.
    Interactive,
    /// Signal dispositions are left as the caller set them.
    Foreground,
}

/// Launches external programs with inherited stdio.
pub trait ProcessRunner {
    fn run(&self, program: &str, args: &[String], mode: RunMode) -> io::Result<ExitStatus>;
    /// Run without arguments and capture combined output.
    fn probe(&self, program: &str) -> io::Result<String>;
    /// Record Ctrl-C instead of dying until the returned flag is dropped.
    fn catch_interrupts(&self) -> Box<dyn InterruptFlag + '_>;
}

/// Runs real processes.
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String], mode: RunMode) -> io::Result<ExitStatus> {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        match mode {
            RunMode::Interactive => {
                let _ignored = UserSignalsIgnored::install();
                command.status()
            }
            RunMode::Foreground => command.status(),
        }
    }

    fn probe(&self, program: &str) -> io::Result<String> {
        let output = Command::new(program).stdin(Stdio::null()).output()?;
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(text)
    }

    fn catch_interrupts(&self) -> Box<dyn InterruptFlag + '_> {
        Box::new(InterruptLatch::install())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct SessionResponse<'a> {
    session_id: &'a str,
    token_value: &'a str,
    stream_url: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Target<'a> {
    target: &'a str,
}

/// A fully resolved transport helper command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportInvocation {
    pub program: String,
    /// Session response, region, "StartSession", profile, target, endpoint.
    pub args: Vec<String>,
}

impl TransportInvocation {
    pub fn new(
        program: &str,
        handle: &SessionHandle,
        region: &str,
        profile: &str,
    ) -> Result<Self, AppError> {
        let response = serde_json::to_string(&SessionResponse {
            session_id: &handle.session_id,
            token_value: &handle.token_value,
            stream_url: &handle.stream_url,
        })?;
        let target = serde_json::to_string(&Target {
            target: &handle.instance_id,
        })?;

        Ok(Self {
            program: program.to_string(),
            args: vec![
                response,
                region.to_string(),
                "StartSession".to_string(),
                profile.to_string(),
                target,
                handle.endpoint_url.clone(),
            ],
        })
    }

    /// The whole invocation as one POSIX shell string.
    pub fn proxy_command(&self) -> String {
        std::iter::once(&self.program)
            .chain(&self.args)
            .map(|word| quote(word))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// `ProxyCommand=` value for `ssh -o`, with `%` escaped from ssh's token expansion.
    pub fn ssh_proxy_option(&self) -> String {
        format!("ProxyCommand={}", self.proxy_command().replace('%', "%%"))
    }
}

fn quote(word: &str) -> String {
    match shlex::try_quote(word) {
        Ok(quoted) => quoted.into_owned(),
        // Only a NUL byte can fail; it can't reach a command line anyway.
        Err(_) => format!("'{}'", word.replace('\0', "").replace('\'', r"'\''")),
    }
}

/// Confirm the transport helper is installed before touching any session.
pub fn verify<R: ProcessRunner + ?Sized>(runner: &R, program: &str) -> Result<(), AppError> {
    let output = runner.probe(program).map_err(|source| launch_error(program, source))?;
    if output.contains(PLUGIN_BANNER) {
        debug!(program, "transport helper present");
        Ok(())
    } else {
        Err(AppError::TransportUnverified {
            program: program.to_string(),
            output: output.trim().to_string(),
        })
    }
}

/// Map a spawn failure, singling out the missing-binary case.
pub fn launch_error(program: &str, source: io::Error) -> AppError {
    if source.kind() == io::ErrorKind::NotFound {
        AppError::TransportNotFound {
            program: program.to_string(),
        }
    } else {
        AppError::Launch {
            program: program.to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> SessionHandle {
        SessionHandle {
            session_id: "alice-0a1b2c".to_string(),
            token_value: "tok\"en'with quotes".to_string(),
            stream_url: "wss://ssmmessages.eu-west-1.amazonaws.com/v1/data-channel/alice-0a1b2c"
                .to_string(),
            endpoint_url: "https://ssm.eu-west-1.amazonaws.com".to_string(),
            instance_id: "i-1".to_string(),
        }
    }

    struct Probe(io::Result<String>);

    impl ProcessRunner for Probe {
        fn run(&self, _: &str, _: &[String], _: RunMode) -> io::Result<ExitStatus> {
            unreachable!("verify only probes")
        }
        fn catch_interrupts(&self) -> Box<dyn InterruptFlag + '_> {
            unreachable!("verify only probes")
        }
        fn probe(&self, _program: &str) -> io::Result<String> {
            match &self.0 {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
            }
        }
    }

    #[test]
    fn test_invocation_argument_order() {
        let inv = TransportInvocation::new(DEFAULT_PLUGIN, &handle(), "eu-west-1", "ops").unwrap();
        assert_eq!(inv.program, "session-manager-plugin");
        assert_eq!(inv.args.len(), 6);
        assert_eq!(inv.args[1], "eu-west-1");
        assert_eq!(inv.args[2], "StartSession");
        assert_eq!(inv.args[3], "ops");
        assert_eq!(inv.args[4], r#"{"Target":"i-1"}"#);
        assert_eq!(inv.args[5], "https://ssm.eu-west-1.amazonaws.com");

        let response: serde_json::Value = serde_json::from_str(&inv.args[0]).unwrap();
        assert_eq!(response["SessionId"], "alice-0a1b2c");
        assert_eq!(response["TokenValue"], "tok\"en'with quotes");
        assert!(response["StreamUrl"].as_str().unwrap().starts_with("wss://"));
    }

    #[test]
    fn test_proxy_command_round_trips() {
        let inv = TransportInvocation::new(DEFAULT_PLUGIN, &handle(), "eu-west-1", "ops").unwrap();
        let words = shlex::split(&inv.proxy_command()).unwrap();
        assert_eq!(words[0], "session-manager-plugin");
        assert_eq!(&words[1..], inv.args.as_slice());
    }

    #[test]
    fn test_proxy_command_round_trips_awkward_args() {
        let inv = TransportInvocation {
            program: "/opt/session manager/plugin".to_string(),
            args: vec![
                r#"{"a":"b\"c"}"#.to_string(),
                "it's".to_string(),
                "StartSession".to_string(),
                "".to_string(),
                "$HOME `x` \\ ;".to_string(),
                "100%".to_string(),
            ],
        };
        let words = shlex::split(&inv.proxy_command()).unwrap();
        assert_eq!(words[0], inv.program);
        assert_eq!(&words[1..], inv.args.as_slice());
    }

    #[test]
    fn test_ssh_option_escapes_percent() {
        let inv = TransportInvocation {
            program: "plugin".to_string(),
            args: vec!["50%".to_string()],
        };
        let option = inv.ssh_proxy_option();
        assert!(option.starts_with("ProxyCommand=plugin "));
        assert!(option.contains("50%%"));
        assert!(!option.contains("50%%%"));
    }

    #[test]
    fn test_verify_accepts_banner() {
        let runner = Probe(Ok(format!("\n{}\n", PLUGIN_BANNER)));
        assert!(verify(&runner, DEFAULT_PLUGIN).is_ok());
    }

    #[test]
    fn test_verify_missing_binary() {
        let runner = Probe(Err(io::Error::from(io::ErrorKind::NotFound)));
        let err = verify(&runner, DEFAULT_PLUGIN).unwrap_err();
        assert!(matches!(err, AppError::TransportNotFound { .. }));
    }

    #[test]
    fn test_verify_unexpected_output() {
        let runner = Probe(Ok("command not understood".to_string()));
        let err = verify(&runner, DEFAULT_PLUGIN).unwrap_err();
        match err {
            AppError::TransportUnverified { output, .. } => {
                assert_eq!(output, "command not understood")
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
