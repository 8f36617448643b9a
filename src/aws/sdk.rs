use std::future::Future;
use std::time::Duration;

use aws_config::{BehaviorVersion, Region};
use aws_sdk_ssm::error::{DisplayErrorContext, ProvideErrorMetadata};
use chrono::{DateTime, Utc};
use tokio::runtime::Runtime;
use tracing::debug;

use crate::signals::InterruptFlag;

use super::{
    AgentStatus, AwsError, CommandInvocation, CommandStatus, InstanceRecord, Inventory,
    OutputLocation, PingStatus, RUN_SHELL_SCRIPT_DOCUMENT, RunCommand, SessionBroker,
    SessionDocument, SessionHandle,
};

/// How often a running command is polled for completion.
const COMMAND_POLL_INTERVAL: Duration = Duration::from_secs(2);
/// Granularity of the wait between polls, so Ctrl-C is noticed promptly.
const INTERRUPT_CHECK_INTERVAL: Duration = Duration::from_millis(100);

/// SSM and EC2 clients sharing one configuration, driven from synchronous code.
///
/// The SDK is async; every call is run to completion on a private
/// current-thread runtime so callers never see a future.
pub struct AwsClients {
    runtime: Runtime,
    ssm: aws_sdk_ssm::Client,
    ec2: aws_sdk_ec2::Client,
    region: String,
    endpoint_url: String,
}

impl AwsClients {
    /// Load credentials and region for `profile` (or the SDK default chain).
    pub fn connect(profile: Option<&str>, region: Option<&str>) -> Result<Self, AwsError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(AwsError::Runtime)?;

        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(profile) = profile {
            debug!(profile, "using named profile");
            loader = loader.profile_name(profile);
        }
        if let Some(region) = region {
            loader = loader.region(Region::new(region.to_string()));
        }
        let config = runtime.block_on(loader.load());

        let region = config
            .region()
            .map(|r| r.as_ref().to_string())
            .ok_or_else(|| AwsError::MissingRegion {
                profile: profile.unwrap_or("default").to_string(),
            })?;
        let endpoint_url = config
            .endpoint_url()
            .map(str::to_string)
            .unwrap_or_else(|| format!("https://ssm.{}.amazonaws.com", region));
        debug!(%region, %endpoint_url, "aws configuration loaded");

        Ok(Self {
            ssm: aws_sdk_ssm::Client::new(&config),
            ec2: aws_sdk_ec2::Client::new(&config),
            runtime,
            region,
            endpoint_url,
        })
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

fn service_error<E>(operation: &'static str, err: E) -> AwsError
where
    E: ProvideErrorMetadata + std::error::Error,
{
    let message = err
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| DisplayErrorContext(&err).to_string());
    AwsError::service(operation, err.code(), message)
}

fn required(
    value: Option<&str>,
    operation: &'static str,
    field: &'static str,
) -> Result<String, AwsError> {
    value
        .map(str::to_string)
        .ok_or(AwsError::MissingField { operation, field })
}

impl SessionBroker for AwsClients {
    fn describe_instance_information(&self) -> Result<Vec<AgentStatus>, AwsError> {
        let mut agents = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let page = self
                .block_on(
                    self.ssm
                        .describe_instance_information()
                        .set_next_token(next_token.take())
                        .send(),
                )
                .map_err(|e| service_error("DescribeInstanceInformation", e))?;

            for info in page.instance_information_list() {
                let Some(instance_id) = info.instance_id() else {
                    continue;
                };
                let ping_status = info
                    .ping_status()
                    .map(|s| PingStatus::from_name(s.as_str()))
                    .unwrap_or_else(|| PingStatus::Other(String::new()));
                agents.push(AgentStatus {
                    instance_id: instance_id.to_string(),
                    ping_status,
                });
            }

            match page.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }
        debug!(count = agents.len(), "managed instances listed");
        Ok(agents)
    }

    fn start_session(
        &self,
        instance_id: &str,
        document: SessionDocument,
    ) -> Result<SessionHandle, AwsError> {
        const OP: &str = "StartSession";
        let output = self
            .block_on(
                self.ssm
                    .start_session()
                    .target(instance_id)
                    .document_name(document.name())
                    .send(),
            )
            .map_err(|e| service_error(OP, e))?;

        Ok(SessionHandle {
            session_id: required(output.session_id(), OP, "SessionId")?,
            token_value: required(output.token_value(), OP, "TokenValue")?,
            stream_url: required(output.stream_url(), OP, "StreamUrl")?,
            endpoint_url: self.endpoint_url.clone(),
            instance_id: instance_id.to_string(),
        })
    }

    fn terminate_session(&self, session_id: &str) -> Result<(), AwsError> {
        self.block_on(self.ssm.terminate_session().session_id(session_id).send())
            .map_err(|e| service_error("TerminateSession", e))?;
        Ok(())
    }
}

impl Inventory for AwsClients {
    fn describe_instances(&self, instance_ids: &[String]) -> Result<Vec<InstanceRecord>, AwsError> {
        let mut records = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let page = self
                .block_on(
                    self.ec2
                        .describe_instances()
                        .set_instance_ids(Some(instance_ids.to_vec()))
                        .set_next_token(next_token.take())
                        .send(),
                )
                .map_err(|e| service_error("DescribeInstances", e))?;

            for reservation in page.reservations() {
                records.extend(reservation.instances().iter().map(instance_record));
            }

            match page.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }
        Ok(records)
    }
}

fn instance_record(instance: &aws_sdk_ec2::types::Instance) -> InstanceRecord {
    InstanceRecord {
        instance_id: instance.instance_id().unwrap_or_default().to_string(),
        launch_time: instance
            .launch_time()
            .and_then(|t| DateTime::<Utc>::from_timestamp(t.secs(), t.subsec_nanos())),
        image_id: instance.image_id().map(str::to_string),
        instance_type: instance.instance_type().map(|t| t.as_str().to_string()),
        private_ip: instance.private_ip_address().map(str::to_string),
        state: instance
            .state()
            .and_then(|s| s.name())
            .map(|n| n.as_str().to_string()),
        vpc_id: instance.vpc_id().map(str::to_string),
        subnet_id: instance.subnet_id().map(str::to_string),
        tags: instance
            .tags()
            .iter()
            .filter_map(|tag| Some((tag.key()?.to_string(), tag.value()?.to_string())))
            .collect(),
    }
}

impl RunCommand for AwsClients {
    fn send_command(
        &self,
        instance_id: &str,
        command: &str,
        output: &OutputLocation,
    ) -> Result<String, AwsError> {
        const OP: &str = "SendCommand";
        let response = self
            .block_on(
                self.ssm
                    .send_command()
                    .instance_ids(instance_id)
                    .document_name(RUN_SHELL_SCRIPT_DOCUMENT)
                    .parameters("commands", vec![command.to_string()])
                    .output_s3_bucket_name(output.bucket.as_str())
                    .output_s3_key_prefix(output.key_prefix.as_str())
                    .send(),
            )
            .map_err(|e| service_error(OP, e))?;

        required(
            response.command().and_then(|c| c.command_id()),
            OP,
            "CommandId",
        )
    }

    fn wait_command_executed(
        &self,
        command_id: &str,
        instance_id: &str,
        interrupts: &dyn InterruptFlag,
    ) -> Result<Option<CommandStatus>, AwsError> {
        loop {
            if interrupts.tripped() {
                return Ok(None);
            }
            let result = self.block_on(
                self.ssm
                    .get_command_invocation()
                    .command_id(command_id)
                    .instance_id(instance_id)
                    .send(),
            );
            match result {
                Ok(output) => {
                    let status = output
                        .status()
                        .map(|s| CommandStatus::from_name(s.as_str()))
                        .unwrap_or(CommandStatus::Pending);
                    if !status.is_running() {
                        return Ok(Some(status));
                    }
                    debug!(command_id, status = status.label(), "command still running");
                }
                // The invocation shows up a moment after SendCommand returns.
                Err(err)
                    if err
                        .as_service_error()
                        .is_some_and(|e| e.is_invocation_does_not_exist()) =>
                {
                    debug!(command_id, "invocation not registered yet");
                }
                Err(err) => return Err(service_error("GetCommandInvocation", err)),
            }
            let mut waited = Duration::ZERO;
            while waited < COMMAND_POLL_INTERVAL && !interrupts.tripped() {
                std::thread::sleep(INTERRUPT_CHECK_INTERVAL);
                waited += INTERRUPT_CHECK_INTERVAL;
            }
        }
    }

    fn get_command_invocation(
        &self,
        command_id: &str,
        instance_id: &str,
    ) -> Result<CommandInvocation, AwsError> {
        let output = self
            .block_on(
                self.ssm
                    .get_command_invocation()
                    .command_id(command_id)
                    .instance_id(instance_id)
                    .send(),
            )
            .map_err(|e| service_error("GetCommandInvocation", e))?;

        Ok(CommandInvocation {
            status: output
                .status()
                .map(|s| CommandStatus::from_name(s.as_str()))
                .unwrap_or(CommandStatus::Pending),
            standard_output: output.standard_output_content().unwrap_or_default().to_string(),
            standard_error: output.standard_error_content().unwrap_or_default().to_string(),
        })
    }
}
