//! ---
//! lab_section: "04-session"
//! lab_subsection: "module"
//! lab_type: "source"
//! lab_scope: "code"
//! lab_description: "Named command libraries with response policies."
//! lab_version: "v0.1.0"
//! lab_owner: "tbd"
//! ---
//! Command libraries on top of raw sessions.
//!
//! A [`Library`] groups named commands for one kind of shell. Each command
//! carries a [`ResponsePolicy`]: configuration commands are expected to be
//! silent on success (any unexplained output is an error), while show-style
//! commands parse their output into named fields. A [`LibraryCatalog`]
//! routes libraries by node type and shell type.

use indexmap::IndexMap;
use regex::Regex;

use crate::error::{Result, SessionError};
use crate::session::Session;

/// Extracts named fields from command output. Every field's pattern must
/// match and expose the value as its first capture group.
#[derive(Debug, Clone, Default)]
pub struct OutputParser {
    fields: IndexMap<String, Regex>,
}

impl OutputParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(
        mut self,
        name: impl Into<String>,
        pattern: &str,
    ) -> std::result::Result<Self, regex::Error> {
        self.fields.insert(name.into(), Regex::new(pattern)?);
        Ok(self)
    }

    /// Parse `text`, failing with [`SessionError::UnparsableOutput`] when
    /// any field is missing.
    pub fn parse(&self, command: &str, text: &str) -> Result<IndexMap<String, String>> {
        let mut values = IndexMap::with_capacity(self.fields.len());
        for (name, pattern) in &self.fields {
            let captured = pattern
                .captures(text)
                .and_then(|caps| caps.get(1))
                .ok_or_else(|| SessionError::UnparsableOutput {
                    command: command.to_owned(),
                    text: text.to_owned(),
                })?;
            values.insert(name.clone(), captured.as_str().to_owned());
        }
        Ok(values)
    }
}

/// What a command's output means.
#[derive(Debug, Clone)]
pub enum ResponsePolicy {
    /// Success produces no output. Anything else is an error, except
    /// output matching `ignore` (banners, confirmations).
    Silent { ignore: Option<Regex> },
    /// Output is parsed into named fields.
    Parsed(OutputParser),
}

impl ResponsePolicy {
    pub fn silent() -> Self {
        Self::Silent { ignore: None }
    }

    pub fn silent_ignoring(pattern: &str) -> std::result::Result<Self, regex::Error> {
        Ok(Self::Silent {
            ignore: Some(Regex::new(pattern)?),
        })
    }
}

/// One named command: a template with `{}` positional placeholders and the
/// policy applied to its output.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    template: String,
    policy: ResponsePolicy,
}

impl CommandSpec {
    pub fn new(template: impl Into<String>, policy: ResponsePolicy) -> Self {
        Self {
            template: template.into(),
            policy,
        }
    }

    /// Substitute placeholders left to right. Surplus arguments are
    /// ignored; unfilled placeholders are left in place and will surface
    /// as a command failure downstream.
    pub fn render(&self, args: &[&str]) -> String {
        let mut rendered = self.template.clone();
        for arg in args {
            if !rendered.contains("{}") {
                break;
            }
            rendered = rendered.replacen("{}", arg, 1);
        }
        rendered
    }
}

/// Named commands for one shell flavor.
#[derive(Debug, Clone)]
pub struct Library {
    name: String,
    commands: IndexMap<String, CommandSpec>,
}

impl Library {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            commands: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn command(mut self, name: impl Into<String>, spec: CommandSpec) -> Self {
        self.commands.insert(name.into(), spec);
        self
    }

    /// Render and run a named command on `session`, applying its response
    /// policy. Silent commands yield an empty map on success.
    pub async fn call(
        &self,
        session: &mut Session,
        command: &str,
        args: &[&str],
    ) -> Result<IndexMap<String, String>> {
        let spec = self
            .commands
            .get(command)
            .ok_or_else(|| SessionError::UnknownCommand {
                library: self.name.clone(),
                command: command.to_owned(),
            })?;
        let rendered = spec.render(args);
        let output = session.send(&rendered).await?;
        match &spec.policy {
            ResponsePolicy::Silent { ignore } => {
                let trimmed = output.trim();
                let ignorable = trimmed.is_empty()
                    || ignore.as_ref().is_some_and(|pattern| pattern.is_match(trimmed));
                if ignorable {
                    Ok(IndexMap::new())
                } else {
                    Err(SessionError::UnexpectedOutput {
                        command: rendered,
                        output,
                    })
                }
            }
            ResponsePolicy::Parsed(parser) => parser.parse(&rendered, &output),
        }
    }
}

/// Libraries indexed by `(node_type, shell_type)`.
#[derive(Debug, Clone, Default)]
pub struct LibraryCatalog {
    entries: IndexMap<(String, String), Vec<Library>>,
}

impl LibraryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        node_type: impl Into<String>,
        shell_type: impl Into<String>,
        library: Library,
    ) {
        self.entries
            .entry((node_type.into(), shell_type.into()))
            .or_default()
            .push(library);
    }

    pub fn libraries(&self, node_type: &str, shell_type: &str) -> &[Library] {
        self.entries
            .get(&(node_type.to_owned(), shell_type.to_owned()))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn library(&self, node_type: &str, shell_type: &str, name: &str) -> Option<&Library> {
        self.libraries(node_type, shell_type)
            .iter()
            .find(|library| library.name == name)
    }
}
