//! ---
//! lab_section: "04-session"
//! lab_subsection: "module"
//! lab_type: "source"
//! lab_scope: "code"
//! lab_description: "Session error taxonomy."
//! lab_version: "v0.1.0"
//! lab_owner: "tbd"
//! ---
use std::time::Duration;

use thiserror::Error;
use topolab_engine::EngineError;

pub type Result<T> = std::result::Result<T, SessionError>;

/// Failures observed on a live session. `Timeout` leaves the channel in an
/// unknown state; any later successful send restores it.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session is closed")]
    Closed,
    #[error("command '{command}' did not complete within {bound:?}; channel state unknown")]
    Timeout { command: String, bound: Duration },
    #[error("channel failure while running '{command}'")]
    Channel {
        command: String,
        #[source]
        source: EngineError,
    },
    #[error("command '{command}' failed:\n{output}")]
    CommandFailed { command: String, output: String },
    #[error("command '{command}' produced unexpected output:\n{output}")]
    UnexpectedOutput { command: String, output: String },
    #[error("output of '{command}' did not match the expected shape:\n{text}")]
    UnparsableOutput { command: String, text: String },
    #[error("library '{library}' has no command '{command}'")]
    UnknownCommand { library: String, command: String },
}
