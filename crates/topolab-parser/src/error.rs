//! ---
//! lab_section: "02-topology-model"
//! lab_subsection: "module"
//! lab_type: "source"
//! lab_scope: "code"
//! lab_description: "Parse and reference error taxonomy."
//! lab_version: "v0.1.0"
//! lab_owner: "tbd"
//! ---
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ParseError>;

/// A structural error in a topology description, located by line number.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("line {line}: {kind}")]
pub struct ParseError {
    pub line: usize,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub fn new(line: usize, kind: ParseErrorKind) -> Self {
        Self { line, kind }
    }

    /// Whether this error is a reference error (a link naming an undeclared
    /// node, or an identifier declared twice) rather than a syntax error.
    pub fn is_reference(&self) -> bool {
        matches!(
            self.kind,
            ParseErrorKind::UnknownNode(_)
                | ParseErrorKind::DuplicateNode(_)
                | ParseErrorKind::DuplicatePort { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseErrorKind {
    #[error("malformed attribute block: {0}")]
    MalformedAttributes(String),
    #[error("malformed node declaration: {0}")]
    MalformedNode(String),
    #[error("malformed link declaration: {0}")]
    MalformedLink(String),
    #[error("duplicate node identifier '{0}'")]
    DuplicateNode(String),
    #[error("node '{0}' is missing the required 'type' attribute")]
    MissingType(String),
    #[error("link references undeclared node '{0}'")]
    UnknownNode(String),
    #[error("port '{port}' on node '{node}' is used by more than one link")]
    DuplicatePort { node: String, port: String },
}
