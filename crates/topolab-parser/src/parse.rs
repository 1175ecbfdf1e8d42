//! ---
//! lab_section: "02-topology-model"
//! lab_subsection: "module"
//! lab_type: "source"
//! lab_scope: "code"
//! lab_description: "Line-oriented topology description parser."
//! lab_version: "v0.1.0"
//! lab_owner: "tbd"
//! ---
use indexmap::IndexMap;

use crate::attributes::{AttributeSet, AttributeValue};
use crate::error::{ParseError, ParseErrorKind, Result};
use crate::topology::{Endpoint, Link, Node, Topology};

/// Caller-supplied parsing options.
#[derive(Debug, Clone, Default)]
pub struct ParserOptions {
    /// Node type assumed for declarations without a `type` attribute. When
    /// unset, a missing `type` is an error at the declaring line.
    pub default_node_type: Option<String>,
}

impl ParserOptions {
    pub fn with_default_type(node_type: impl Into<String>) -> Self {
        Self {
            default_node_type: Some(node_type.into()),
        }
    }
}

/// Parse a topology description with default options.
pub fn parse_topology(text: &str) -> Result<Topology> {
    parse_topology_with(text, &ParserOptions::default())
}

/// Parse a topology description.
///
/// The first structural error aborts parsing with the offending line number.
/// Link endpoints may reference nodes declared later in the file; they are
/// resolved in a second pass once all declarations have been read.
pub fn parse_topology_with(text: &str, options: &ParserOptions) -> Result<Topology> {
    let mut nodes: IndexMap<String, Node> = IndexMap::new();
    let mut pending: Vec<PendingLink> = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let content = strip_comment(raw);
        let content = content.trim();
        if content.is_empty() {
            continue;
        }

        let (attributes, rest) = if content.starts_with('[') {
            parse_attribute_block(content, line)?
        } else {
            (AttributeSet::new(), content)
        };
        let rest = rest.trim();

        if rest.contains("--") {
            pending.push(parse_link_declaration(rest, attributes, line)?);
        } else {
            let node = parse_node_declaration(rest, attributes, options, line)?;
            if nodes.contains_key(&node.identifier) {
                return Err(ParseError::new(
                    line,
                    ParseErrorKind::DuplicateNode(node.identifier),
                ));
            }
            nodes.insert(node.identifier.clone(), node);
        }
    }

    let mut links = Vec::with_capacity(pending.len());
    for decl in pending {
        for endpoint in &decl.endpoints {
            let node = nodes.get_mut(&endpoint.node).ok_or_else(|| {
                ParseError::new(decl.line, ParseErrorKind::UnknownNode(endpoint.node.clone()))
            })?;
            if !node.declare_port(&endpoint.port) {
                return Err(ParseError::new(
                    decl.line,
                    ParseErrorKind::DuplicatePort {
                        node: endpoint.node.clone(),
                        port: endpoint.port.clone(),
                    },
                ));
            }
        }
        let [a, b] = decl.endpoints;
        links.push(Link::new(a, b, decl.attributes));
    }

    Ok(Topology { nodes, links })
}

struct PendingLink {
    endpoints: [Endpoint; 2],
    attributes: AttributeSet,
    line: usize,
}

/// Cut an unquoted `#` and everything after it.
fn strip_comment(line: &str) -> &str {
    let mut in_quotes = false;
    for (idx, ch) in line.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            '#' if !in_quotes => return &line[..idx],
            _ => {}
        }
    }
    line
}

/// Port labels are provisional names with no fixed shape; anything goes as
/// long as the label cannot be confused with the surrounding link syntax.
fn is_port_label(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| !c.is_whitespace() && c != ':')
}

fn is_name_token(token: &str) -> bool {
    let mut chars = token.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Parse a leading `[attr=value, ...]` block, returning the attributes and
/// the remainder of the line after the closing bracket.
///
/// Attributes are separated by commas; the separator may be omitted between
/// entries for compatibility with descriptions that use bare whitespace.
fn parse_attribute_block(content: &str, line: usize) -> Result<(AttributeSet, &str)> {
    debug_assert!(content.starts_with('['));
    let malformed =
        |reason: String| ParseError::new(line, ParseErrorKind::MalformedAttributes(reason));

    let mut close = None;
    let mut in_quotes = false;
    for (idx, ch) in content.char_indices().skip(1) {
        match ch {
            '"' => in_quotes = !in_quotes,
            ']' if !in_quotes => {
                close = Some(idx);
                break;
            }
            _ => {}
        }
    }
    let close = close.ok_or_else(|| malformed("missing closing ']'".to_owned()))?;
    let inner = &content[1..close];
    let rest = &content[close + 1..];

    let mut attributes = AttributeSet::new();
    let mut chars = inner.char_indices().peekable();
    loop {
        // Skip separators between entries.
        while matches!(chars.peek(), Some((_, c)) if c.is_whitespace() || *c == ',') {
            chars.next();
        }
        let Some(&(key_start, _)) = chars.peek() else {
            break;
        };

        let mut key_end = key_start;
        while matches!(chars.peek(), Some((_, c)) if c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        {
            let (idx, ch) = chars.next().unwrap_or((key_end, ' '));
            key_end = idx + ch.len_utf8();
        }
        let key = &inner[key_start..key_end];
        if key.is_empty() || !is_name_token(key) {
            return Err(malformed(format!(
                "expected attribute name, got '{}'",
                &inner[key_start..].trim_end()
            )));
        }
        while matches!(chars.peek(), Some((_, c)) if c.is_whitespace()) {
            chars.next();
        }
        match chars.next() {
            Some((_, '=')) => {}
            _ => return Err(malformed(format!("expected '=' after '{}'", key))),
        }
        while matches!(chars.peek(), Some((_, c)) if c.is_whitespace()) {
            chars.next();
        }

        let value = match chars.peek() {
            Some((_, '"')) => {
                let (open, _) = chars.next().unwrap_or((key_end, '"'));
                let mut end = None;
                for (idx, ch) in chars.by_ref() {
                    if ch == '"' {
                        end = Some(idx);
                        break;
                    }
                }
                let end = end.ok_or_else(|| malformed("unterminated quoted value".to_owned()))?;
                AttributeValue::Quoted(inner[open + 1..end].to_owned())
            }
            Some(&(start, _)) => {
                let mut end = start;
                while matches!(chars.peek(), Some((_, c)) if !c.is_whitespace() && *c != ',') {
                    let (idx, ch) = chars.next().unwrap_or((end, ' '));
                    end = idx + ch.len_utf8();
                }
                let token = &inner[start..end];
                if token.is_empty() {
                    return Err(malformed(format!("missing value for '{}'", key)));
                }
                match token.parse::<f64>() {
                    Ok(number) => AttributeValue::Number(number),
                    Err(_) => AttributeValue::Token(token.to_owned()),
                }
            }
            None => return Err(malformed(format!("missing value for '{}'", key))),
        };

        if attributes.insert(key.to_owned(), value).is_some() {
            return Err(malformed(format!("duplicate attribute '{}'", key)));
        }
    }

    Ok((attributes, rest))
}

fn parse_node_declaration(
    rest: &str,
    mut attributes: AttributeSet,
    options: &ParserOptions,
    line: usize,
) -> Result<Node> {
    if rest.is_empty() {
        return Err(ParseError::new(
            line,
            ParseErrorKind::MalformedNode("missing node identifier".to_owned()),
        ));
    }
    if !is_name_token(rest) {
        return Err(ParseError::new(
            line,
            ParseErrorKind::MalformedNode(format!("invalid identifier '{}'", rest)),
        ));
    }

    let typed = attributes
        .get("type")
        .map(|value| value.as_str().is_some())
        .unwrap_or(false);
    if !typed {
        match &options.default_node_type {
            Some(default) => {
                attributes.insert("type".to_owned(), AttributeValue::Token(default.clone()));
            }
            None => {
                return Err(ParseError::new(
                    line,
                    ParseErrorKind::MissingType(rest.to_owned()),
                ));
            }
        }
    }

    Ok(Node::new(rest, attributes))
}

fn parse_link_declaration(
    rest: &str,
    attributes: AttributeSet,
    line: usize,
) -> Result<PendingLink> {
    let malformed = |reason: String| ParseError::new(line, ParseErrorKind::MalformedLink(reason));

    let mut sides = rest.split("--");
    let (left, right) = match (sides.next(), sides.next(), sides.next()) {
        (Some(left), Some(right), None) => (left.trim(), right.trim()),
        _ => {
            return Err(malformed(
                "expected exactly one '--' between endpoints".to_owned(),
            ))
        }
    };

    let parse_endpoint = |side: &str| -> Result<Endpoint> {
        let mut parts = side.split(':');
        let (node, port) = match (parts.next(), parts.next(), parts.next()) {
            (Some(node), Some(port), None) => (node.trim(), port.trim()),
            _ => {
                return Err(malformed(format!(
                    "expected 'node:port_label', got '{}'",
                    side
                )))
            }
        };
        if !is_name_token(node) {
            return Err(malformed(format!("invalid node identifier '{}'", node)));
        }
        if !is_port_label(port) {
            return Err(malformed(format!("invalid port label '{}'", port)));
        }
        Ok(Endpoint::new(node, port))
    };

    Ok(PendingLink {
        endpoints: [parse_endpoint(left)?, parse_endpoint(right)?],
        attributes,
        line,
    })
}
