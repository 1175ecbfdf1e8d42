//! ---
//! lab_section: "04-session"
//! lab_subsection: "module"
//! lab_type: "source"
//! lab_scope: "code"
//! lab_description: "Blocking command sessions over backend shell channels."
//! lab_version: "v0.1.0"
//! lab_owner: "tbd"
//! ---
use std::time::Duration;

use topolab_engine::{EngineError, ShellChannel};
use tracing::{debug, warn};

use crate::context::ContextFrame;
use crate::error::{Result, SessionError};

/// Liveness of the underlying channel as the session knows it.
///
/// A timed-out command leaves the channel `Unknown`: the command may still
/// be running remotely and its output may surface later. The session keeps
/// accepting sends in that state; the first one that completes normally
/// restores `Open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Open,
    Unknown,
    Closed,
}

/// One command stream to a node, bound to a single shell type.
///
/// Commands are strictly sequential: `send` takes `&mut self` and runs each
/// command to completion before the next. The session also carries the
/// stack of entered command contexts (see [`crate::context`]).
#[derive(Debug)]
pub struct Session {
    node: String,
    shell: String,
    channel: Box<dyn ShellChannel>,
    timeout: Option<Duration>,
    state: ChannelState,
    pub(crate) contexts: Vec<ContextFrame>,
}

impl Session {
    pub fn new(
        node: impl Into<String>,
        shell: impl Into<String>,
        channel: Box<dyn ShellChannel>,
    ) -> Self {
        Self {
            node: node.into(),
            shell: shell.into(),
            channel,
            timeout: None,
            state: ChannelState::Open,
            contexts: Vec::new(),
        }
    }

    /// Bound every subsequent command. `None` waits indefinitely, which is
    /// the default.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn node(&self) -> &str {
        &self.node
    }

    pub fn shell_type(&self) -> &str {
        &self.shell
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Run one command and return its raw output.
    ///
    /// Fails with [`SessionError::CommandFailed`] when the channel reports
    /// the command itself failed, and with [`SessionError::Timeout`] when
    /// the configured bound elapses first.
    pub async fn send(&mut self, command: &str) -> Result<String> {
        if self.state == ChannelState::Closed {
            return Err(SessionError::Closed);
        }
        debug!(node = %self.node, shell = %self.shell, %command, "sending command");

        let reply = match self.timeout {
            Some(bound) => match tokio::time::timeout(bound, self.channel.run(command)).await {
                Ok(reply) => reply,
                Err(_) => {
                    self.state = ChannelState::Unknown;
                    warn!(
                        node = %self.node,
                        %command,
                        ?bound,
                        "command timed out, channel state unknown"
                    );
                    return Err(SessionError::Timeout {
                        command: command.to_owned(),
                        bound,
                    });
                }
            },
            None => self.channel.run(command).await,
        };

        let reply = reply.map_err(|source| {
            if matches!(source, EngineError::ChannelClosed { .. }) {
                self.state = ChannelState::Closed;
            }
            SessionError::Channel {
                command: command.to_owned(),
                source,
            }
        })?;

        self.state = ChannelState::Open;
        if !reply.success {
            return Err(SessionError::CommandFailed {
                command: command.to_owned(),
                output: reply.output,
            });
        }
        Ok(reply.output)
    }

    /// Release the channel. Safe to call more than once.
    pub async fn close(&mut self) -> Result<()> {
        if self.state == ChannelState::Closed {
            return Ok(());
        }
        if !self.contexts.is_empty() {
            warn!(
                node = %self.node,
                depth = self.contexts.len(),
                "closing session with contexts still entered"
            );
        }
        self.channel
            .close()
            .await
            .map_err(|source| SessionError::Channel {
                command: "<close>".to_owned(),
                source,
            })?;
        self.state = ChannelState::Closed;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::support::StubChannel;

    #[tokio::test]
    async fn send_returns_output_and_keeps_order() {
        let stub = StubChannel::new();
        stub.reply("uname", "Linux");
        let log = stub.log();
        let mut session = Session::new("hs1", "bash", Box::new(stub));

        assert_eq!(session.send("uname").await.unwrap(), "Linux");
        assert_eq!(session.send("true").await.unwrap(), "");
        assert_eq!(*log.lock().unwrap(), ["uname", "true"]);
        assert_eq!(session.state(), ChannelState::Open);
    }

    #[tokio::test]
    async fn failed_command_surfaces_output() {
        let stub = StubChannel::new();
        stub.reply_failure("false", "exit 1");
        let mut session = Session::new("hs1", "bash", Box::new(stub));

        let err = session.send("false").await.unwrap_err();
        match err {
            SessionError::CommandFailed { command, output } => {
                assert_eq!(command, "false");
                assert_eq!(output, "exit 1");
            }
            other => panic!("unexpected error: {other}"),
        }
        // A failed command is not a transport failure.
        assert_eq!(session.state(), ChannelState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_marks_state_unknown_until_next_success() {
        let stub = StubChannel::new();
        stub.slow("sleep 60");
        let mut session = Session::new("hs1", "bash", Box::new(stub))
            .with_timeout(Some(Duration::from_millis(50)));

        let err = session.send("sleep 60").await.unwrap_err();
        assert!(matches!(err, SessionError::Timeout { .. }));
        assert_eq!(session.state(), ChannelState::Unknown);

        assert_eq!(session.send("echo ok").await.unwrap(), "");
        assert_eq!(session.state(), ChannelState::Open);
    }

    #[tokio::test]
    async fn close_is_idempotent_and_rejects_further_sends() {
        let stub = StubChannel::new();
        let mut session = Session::new("hs1", "bash", Box::new(stub));

        session.close().await.unwrap();
        session.close().await.unwrap();
        assert_eq!(session.state(), ChannelState::Closed);
        assert!(matches!(
            session.send("uname").await.unwrap_err(),
            SessionError::Closed
        ));
    }
}
