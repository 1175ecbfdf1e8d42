//! ---
//! lab_section: "04-session"
//! lab_subsection: "module"
//! lab_type: "source"
//! lab_scope: "test"
//! lab_description: "Scriptable stub channel shared by the session tests."
//! lab_version: "v0.1.0"
//! lab_owner: "tbd"
//! ---
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use topolab_engine::{EngineError, ShellChannel, ShellReply};

/// Minimal scriptable channel. Unknown commands reply with empty
/// successful output, matching the simulation backend's default.
#[derive(Debug)]
pub(crate) struct StubChannel {
    replies: Arc<Mutex<HashMap<String, ShellReply>>>,
    slow: Arc<Mutex<HashSet<String>>>,
    log: Arc<Mutex<Vec<String>>>,
    closed: bool,
}

impl StubChannel {
    pub(crate) fn new() -> Self {
        Self {
            replies: Arc::default(),
            slow: Arc::default(),
            log: Arc::default(),
            closed: false,
        }
    }

    pub(crate) fn reply(&self, command: &str, output: &str) {
        self.replies
            .lock()
            .unwrap()
            .insert(command.to_owned(), ShellReply::ok(output));
    }

    pub(crate) fn reply_failure(&self, command: &str, output: &str) {
        self.replies
            .lock()
            .unwrap()
            .insert(command.to_owned(), ShellReply::failed(output));
    }

    /// Make `command` hang for an hour, far beyond any test timeout.
    pub(crate) fn slow(&self, command: &str) {
        self.slow.lock().unwrap().insert(command.to_owned());
    }

    pub(crate) fn log(&self) -> Arc<Mutex<Vec<String>>> {
        self.log.clone()
    }
}

#[async_trait]
impl ShellChannel for StubChannel {
    async fn run(&mut self, command: &str) -> topolab_engine::Result<ShellReply> {
        if self.closed {
            return Err(EngineError::ChannelClosed {
                node: "stub".to_owned(),
            });
        }
        self.log.lock().unwrap().push(command.to_owned());
        if self.slow.lock().unwrap().contains(command) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        let reply = self
            .replies
            .lock()
            .unwrap()
            .get(command)
            .cloned()
            .unwrap_or_else(|| ShellReply::ok(""));
        Ok(reply)
    }

    async fn close(&mut self) -> topolab_engine::Result<()> {
        self.closed = true;
        Ok(())
    }
}
