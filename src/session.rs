use tracing::{info, warn};

use crate::aws::{AwsError, SessionBroker, SessionDocument, SessionHandle};

/// An open broker session that is terminated exactly once.
///
/// Call [`Session::close`] on the normal path to see termination errors.
/// Every other exit (early return, `?`, panic unwinding) goes through `Drop`,
/// which terminates the session and logs any failure.
pub struct Session<'a, B: SessionBroker + ?Sized> {
    broker: &'a B,
    handle: Option<SessionHandle>,
}

impl<'a, B: SessionBroker + ?Sized> Session<'a, B> {
    /// Start a session against `document`. Nothing needs closing on error.
    pub fn open(
        broker: &'a B,
        instance_id: &str,
        document: SessionDocument,
    ) -> Result<Self, AwsError> {
        let handle = broker.start_session(instance_id, document)?;
        info!(
            session_id = %handle.session_id,
            instance_id,
            document = document.name(),
            "session started"
        );
        Ok(Self {
            broker,
            handle: Some(handle),
        })
    }

    pub fn handle(&self) -> &SessionHandle {
        // Only `close` and `drop` take the handle, and both consume the session.
        self.handle
            .as_ref()
            .unwrap_or_else(|| unreachable!("session handle taken before close"))
    }

    /// Terminate the session now, reporting failure to the caller.
    pub fn close(mut self) -> Result<(), AwsError> {
        match self.handle.take() {
            Some(handle) => terminate(self.broker, &handle),
            None => Ok(()),
        }
    }
}

impl<B: SessionBroker + ?Sized> Drop for Session<'_, B> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = terminate(self.broker, &handle) {
                warn!(session_id = %handle.session_id, "failed to terminate session: {}", e);
            }
        }
    }
}

fn terminate<B: SessionBroker + ?Sized>(broker: &B, handle: &SessionHandle) -> Result<(), AwsError> {
    broker.terminate_session(&handle.session_id)?;
    info!(session_id = %handle.session_id, "session terminated");
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;

    use crate::aws::{AgentStatus, AwsError, SessionBroker, SessionDocument, SessionHandle};

    /// Broker double that counts opens and closes.
    #[derive(Default)]
    pub struct CountingBroker {
        pub opened: RefCell<Vec<(String, SessionDocument)>>,
        pub closed: RefCell<Vec<String>>,
        pub fail_start: bool,
        pub fail_terminate: bool,
    }

    impl CountingBroker {
        pub fn open_count(&self) -> usize {
            self.opened.borrow().len()
        }

        pub fn close_count(&self) -> usize {
            self.closed.borrow().len()
        }
    }

    impl SessionBroker for CountingBroker {
        fn describe_instance_information(&self) -> Result<Vec<AgentStatus>, AwsError> {
            Ok(Vec::new())
        }

        fn start_session(
            &self,
            instance_id: &str,
            document: SessionDocument,
        ) -> Result<SessionHandle, AwsError> {
            if self.fail_start {
                return Err(AwsError::service(
                    "StartSession",
                    Some("AccessDeniedException"),
                    "not authorized",
                ));
            }
            let n = self.open_count() + 1;
            self.opened
                .borrow_mut()
                .push((instance_id.to_string(), document));
            Ok(SessionHandle {
                session_id: format!("sess-{}", n),
                token_value: "token".to_string(),
                stream_url: format!("wss://ssmmessages.test/v1/data-channel/sess-{}", n),
                endpoint_url: "https://ssm.test.amazonaws.com".to_string(),
                instance_id: instance_id.to_string(),
            })
        }

        fn terminate_session(&self, session_id: &str) -> Result<(), AwsError> {
            self.closed.borrow_mut().push(session_id.to_string());
            if self.fail_terminate {
                return Err(AwsError::service(
                    "TerminateSession",
                    Some("ValidationException"),
                    "gone",
                ));
            }
            Ok(())
        }
    }
}
