//! ---
//! lab_section: "04-session"
//! lab_subsection: "module"
//! lab_type: "source"
//! lab_scope: "code"
//! lab_description: "Scoped command contexts with guaranteed exit."
//! lab_version: "v0.1.0"
//! lab_owner: "tbd"
//! ---
//! Named command contexts on top of a [`Session`].
//!
//! Shells like network-device CLIs have nested modes (configure terminal,
//! interface config, ...). A [`ContextSpec`] captures how to enter one and
//! how to leave it; [`Session::with_context`] runs a body inside the
//! context and exits it afterwards even when the body fails, so a broken
//! assertion mid-configuration cannot leave the shell stranded in a mode.

use futures::future::BoxFuture;
use tracing::warn;

use crate::error::Result;
use crate::session::Session;

/// How a context is left when its frame is popped.
#[derive(Debug, Clone)]
pub enum ExitMode {
    /// One command returns all the way to the root mode (vtysh `end`).
    /// Sent only when popping this frame empties the context stack; an
    /// enclosing frame's exit covers it otherwise.
    SingleCommand(String),
    /// One command steps out exactly one level (`exit`), sent on every pop.
    PerLevel(String),
}

/// Entry and exit recipe for one named context.
#[derive(Debug, Clone)]
pub struct ContextSpec {
    name: String,
    enter: Vec<String>,
    exit: ExitMode,
}

impl ContextSpec {
    pub fn new(name: impl Into<String>, exit: ExitMode) -> Self {
        Self {
            name: name.into(),
            enter: Vec::new(),
            exit,
        }
    }

    /// Append a command to the entry sequence. Entry commands run in order
    /// and all must succeed before the context counts as entered.
    pub fn enter_with(mut self, command: impl Into<String>) -> Self {
        self.enter.push(command.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug)]
pub(crate) struct ContextFrame {
    name: String,
    exit: ExitMode,
}

impl Session {
    pub fn context_depth(&self) -> usize {
        self.contexts.len()
    }

    pub fn current_context(&self) -> Option<&str> {
        self.contexts.last().map(|frame| frame.name.as_str())
    }

    /// Enter a context by running its entry commands. The frame is pushed
    /// only once every entry command has succeeded.
    pub async fn enter_context(&mut self, spec: &ContextSpec) -> Result<()> {
        for command in &spec.enter {
            self.send(command).await?;
        }
        self.contexts.push(ContextFrame {
            name: spec.name.clone(),
            exit: spec.exit.clone(),
        });
        Ok(())
    }

    /// Pop the innermost context and run its exit command as its
    /// [`ExitMode`] dictates. A no-op at root.
    pub async fn exit_context(&mut self) -> Result<()> {
        let Some(frame) = self.contexts.pop() else {
            return Ok(());
        };
        match frame.exit {
            ExitMode::PerLevel(command) => {
                self.send(&command).await?;
            }
            ExitMode::SingleCommand(command) => {
                if self.contexts.is_empty() {
                    self.send(&command).await?;
                }
            }
        }
        Ok(())
    }

    /// Pop every entered context, innermost first.
    pub async fn exit_to_root(&mut self) -> Result<()> {
        while !self.contexts.is_empty() {
            self.exit_context().await?;
        }
        Ok(())
    }

    /// Run `body` inside `spec`, exiting the context afterwards no matter
    /// how the body ends. When both the body and the exit fail, the body's
    /// error is returned and the exit failure is logged.
    pub async fn with_context<T, F>(&mut self, spec: ContextSpec, body: F) -> Result<T>
    where
        F: for<'a> FnOnce(&'a mut Session) -> BoxFuture<'a, Result<T>>,
    {
        self.enter_context(&spec).await?;
        let result = body(self).await;
        let exited = self.exit_context().await;
        match (result, exited) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(exit_err)) => Err(exit_err),
            (Err(body_err), exited) => {
                if let Err(exit_err) = exited {
                    warn!(
                        node = %self.node(),
                        context = %spec.name(),
                        error = %exit_err,
                        "context exit failed after body error"
                    );
                }
                Err(body_err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SessionError;
    use crate::support::StubChannel;

    fn config_interface(port: &str) -> ContextSpec {
        ContextSpec::new(
            format!("config-if-{port}"),
            ExitMode::SingleCommand("end".to_owned()),
        )
        .enter_with("configure terminal")
        .enter_with(format!("interface {port}"))
    }

    #[tokio::test]
    async fn with_context_brackets_the_body() {
        let stub = StubChannel::new();
        let log = stub.log();
        let mut session = Session::new("ops1", "vtysh", Box::new(stub));

        session
            .with_context(config_interface("if02"), |session| {
                Box::pin(async move {
                    session.send("no routing").await?;
                    session.send("vlan access 8").await?;
                    Ok(())
                })
            })
            .await
            .unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            [
                "configure terminal",
                "interface if02",
                "no routing",
                "vlan access 8",
                "end",
            ]
        );
        assert_eq!(session.context_depth(), 0);
    }

    #[tokio::test]
    async fn context_exits_exactly_once_on_body_error() {
        let stub = StubChannel::new();
        stub.reply_failure("no routing", "% Unknown command");
        let log = stub.log();
        let mut session = Session::new("ops1", "vtysh", Box::new(stub));

        let err = session
            .with_context(config_interface("if02"), |session| {
                Box::pin(async move {
                    session.send("no routing").await?;
                    session.send("vlan access 8").await
                })
            })
            .await
            .unwrap_err();

        assert!(matches!(err, SessionError::CommandFailed { .. }));
        // The failed command short-circuits the body, but the exit still runs.
        assert_eq!(
            *log.lock().unwrap(),
            ["configure terminal", "interface if02", "no routing", "end"]
        );
        assert_eq!(session.context_depth(), 0);
    }

    #[tokio::test]
    async fn single_command_exit_waits_for_the_outermost_frame() {
        let stub = StubChannel::new();
        let log = stub.log();
        let mut session = Session::new("ops1", "vtysh", Box::new(stub));

        let outer = ContextSpec::new("configure", ExitMode::SingleCommand("end".to_owned()))
            .enter_with("configure terminal");
        let inner = ContextSpec::new("vlan-8", ExitMode::PerLevel("exit".to_owned()))
            .enter_with("vlan 8");

        session.enter_context(&outer).await.unwrap();
        session.enter_context(&inner).await.unwrap();
        assert_eq!(session.current_context(), Some("vlan-8"));

        session.exit_to_root().await.unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            ["configure terminal", "vlan 8", "exit", "end"]
        );
    }

    #[tokio::test]
    async fn failed_entry_does_not_push_a_frame() {
        let stub = StubChannel::new();
        stub.reply_failure("interface if99", "% Unknown interface");
        let mut session = Session::new("ops1", "vtysh", Box::new(stub));

        let err = session
            .enter_context(&config_interface("if99"))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::CommandFailed { .. }));
        assert_eq!(session.context_depth(), 0);
    }
}
