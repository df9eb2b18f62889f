//! Embedded deployment artifacts and the small template language they use.
//!
//! ```text
//! {{ name }}                          substitution
//! {{#if name}} … {{else}} … {{/if}}   non-empty text, true flag, non-empty list
//! {{#each name}} … {{ . }} … {{/each}}
//! ```
//!
//! A block tag alone on its line takes the whole line with it, so templates
//! can be laid out one tag per line without leaving blank lines behind.

use std::collections::HashMap;

use crate::{error::TemplateError, host::FIREWALL_TOOL, options::InstallOptions};

// ── Artifacts ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    ServiceUnit,
    AgentConfig,
    RegistryEntry,
    UninstallScript,
}

impl Artifact {
    pub const ALL: [Artifact; 4] = [
        Artifact::ServiceUnit,
        Artifact::AgentConfig,
        Artifact::RegistryEntry,
        Artifact::UninstallScript,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Artifact::ServiceUnit => "luna-agent.service",
            Artifact::AgentConfig => "agent.yml",
            Artifact::RegistryEntry => "luna-entry.yml",
            Artifact::UninstallScript => "uninstall.sh",
        }
    }

    fn source(self) -> &'static str {
        match self {
            Artifact::ServiceUnit => include_str!("../templates/luna-agent.service"),
            Artifact::AgentConfig => include_str!("../templates/agent.yml"),
            Artifact::RegistryEntry => include_str!("../templates/luna-entry.yml"),
            Artifact::UninstallScript => include_str!("../templates/uninstall.sh"),
        }
    }
}

/// Every embedded template, parsed up front.
pub struct Templates {
    parsed: HashMap<Artifact, Template>,
}

impl Templates {
    /// Fails on the first template that does not parse.
    pub fn load() -> Result<Self, TemplateError> {
        let mut parsed = HashMap::new();
        for artifact in Artifact::ALL {
            parsed.insert(artifact, Template::parse(artifact.name(), artifact.source())?);
        }
        Ok(Self { parsed })
    }

    /// Renders `artifact` with `options` as data, trimmed of surrounding
    /// whitespace.
    pub fn render(&self, artifact: Artifact, options: &InstallOptions) -> Result<Vec<u8>, TemplateError> {
        let template = &self.parsed[&artifact];
        let out = template.render(&Context::from_options(options))?;
        Ok(out.trim().as_bytes().to_vec())
    }
}

// ── Data ──────────────────────────────────────────────────────────────────────

const VARIABLES: [&str; 14] = [
    "install_directory",
    "binary_path",
    "config_path",
    "service_path",
    "service_name",
    "uninstall_script_path",
    "local_address",
    "hostname",
    "auth_token",
    "port",
    "hidden_mountpoints",
    "add_firewall_rule",
    "enable_service",
    "firewall_tool",
];

#[derive(Debug, Clone)]
pub enum Value {
    Text(String),
    Flag(bool),
    List(Vec<String>),
}

impl Value {
    fn truthy(&self) -> bool {
        match self {
            Value::Text(s) => !s.is_empty(),
            Value::Flag(b) => *b,
            Value::List(items) => !items.is_empty(),
        }
    }
}

pub struct Context {
    values: HashMap<&'static str, Value>,
}

impl Context {
    pub fn from_options(o: &InstallOptions) -> Self {
        fn path(p: &std::path::Path) -> Value {
            Value::Text(p.display().to_string())
        }
        let values = HashMap::from([
            ("install_directory", path(&o.install_directory)),
            ("binary_path", path(&o.binary_path)),
            ("config_path", path(&o.config_path)),
            ("service_path", path(&o.service_path)),
            ("service_name", Value::Text(o.service_name.clone())),
            ("uninstall_script_path", path(&o.uninstall_script_path)),
            ("local_address", Value::Text(o.local_address.clone())),
            ("hostname", Value::Text(o.hostname.clone())),
            ("auth_token", Value::Text(o.auth_token.clone())),
            ("port", Value::Text(o.port.to_string())),
            ("hidden_mountpoints", Value::List(o.hidden_mountpoints.clone())),
            ("add_firewall_rule", Value::Flag(o.add_firewall_rule)),
            ("enable_service", Value::Flag(o.enable_service)),
            ("firewall_tool", Value::Text(FIREWALL_TOOL.to_string())),
        ]);
        Self { values }
    }

    #[cfg(test)]
    fn set(&mut self, name: &'static str, value: Value) {
        self.values.insert(name, value);
    }
}

// ── Parsing ───────────────────────────────────────────────────────────────────

#[derive(Debug)]
enum Node {
    Text(String),
    Var(String),
    Item,
    If {
        name: String,
        then: Vec<Node>,
        otherwise: Vec<Node>,
    },
    Each {
        name: String,
        body: Vec<Node>,
    },
}

enum Token {
    Text(String),
    Tag(String),
}

fn is_block_tag(tag: &str) -> bool {
    tag.starts_with('#') || tag.starts_with('/') || tag == "else"
}

fn tokenize(template: &str, source: &str) -> Result<Vec<Token>, TemplateError> {
    let mut tokens = Vec::new();
    let mut rest = source;
    let mut offset = 0;
    let mut at_line_start = true;

    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let end = after.find("}}").ok_or(TemplateError::UnterminatedTag {
            template: template.to_string(),
            offset: offset + start,
        })?;
        let tag = after[..end].trim();
        let mut text = rest[..start].to_string();
        let mut consumed = start + 2 + end + 2;

        if is_block_tag(tag) {
            let tail = &rest[consumed..];
            let line_end = tail.find('\n');
            let after_blank = tail[..line_end.unwrap_or(tail.len())].trim().is_empty();
            let (line_start, before_blank) = match text.rfind('\n') {
                Some(i) => (i + 1, text[i + 1..].trim().is_empty()),
                None => (0, at_line_start && text.trim().is_empty()),
            };
            if before_blank && after_blank {
                text.truncate(line_start);
                consumed += line_end.map_or(tail.len(), |i| i + 1);
            }
        }

        if !text.is_empty() {
            tokens.push(Token::Text(text));
        }
        tokens.push(Token::Tag(tag.to_string()));

        at_line_start = rest[..consumed].ends_with('\n');
        offset += consumed;
        rest = &rest[consumed..];
    }

    if !rest.is_empty() {
        tokens.push(Token::Text(rest.to_string()));
    }
    Ok(tokens)
}

#[derive(Debug)]
pub struct Template {
    name: String,
    nodes: Vec<Node>,
}

impl Template {
    pub fn parse(name: &str, source: &str) -> Result<Self, TemplateError> {
        let mut tokens = tokenize(name, source)?.into_iter();
        let parser = Parser { template: name };
        let (nodes, end) = parser.block(&mut tokens, false)?;
        if let Some(tag) = end {
            return Err(parser.unexpected(&tag));
        }
        Ok(Self {
            name: name.to_string(),
            nodes,
        })
    }

    pub fn render(&self, ctx: &Context) -> Result<String, TemplateError> {
        let mut out = String::new();
        self.render_nodes(&self.nodes, ctx, None, &mut out)?;
        Ok(out)
    }

    fn lookup<'c>(&self, ctx: &'c Context, name: &str) -> Result<&'c Value, TemplateError> {
        ctx.values
            .get(name)
            .ok_or_else(|| TemplateError::UnknownVariable {
                template: self.name.clone(),
                name: name.to_string(),
            })
    }

    fn wrong_kind(&self, name: &str, expected: &'static str) -> TemplateError {
        TemplateError::WrongKind {
            template: self.name.clone(),
            name: name.to_string(),
            expected,
        }
    }

    fn render_nodes(
        &self,
        nodes: &[Node],
        ctx: &Context,
        item: Option<&str>,
        out: &mut String,
    ) -> Result<(), TemplateError> {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Var(name) => match self.lookup(ctx, name)? {
                    Value::Text(s) => out.push_str(s),
                    Value::Flag(b) => out.push_str(if *b { "true" } else { "false" }),
                    Value::List(_) => return Err(self.wrong_kind(name, "text")),
                },
                Node::Item => out.push_str(item.unwrap_or_default()),
                Node::If {
                    name,
                    then,
                    otherwise,
                } => {
                    let branch = if self.lookup(ctx, name)?.truthy() {
                        then
                    } else {
                        otherwise
                    };
                    self.render_nodes(branch, ctx, item, out)?;
                }
                Node::Each { name, body } => {
                    let Value::List(items) = self.lookup(ctx, name)? else {
                        return Err(self.wrong_kind(name, "a list"));
                    };
                    for entry in items {
                        self.render_nodes(body, ctx, Some(entry), out)?;
                    }
                }
            }
        }
        Ok(())
    }
}

struct Parser<'a> {
    template: &'a str,
}

impl Parser<'_> {
    fn unexpected(&self, tag: &str) -> TemplateError {
        TemplateError::UnexpectedTag {
            template: self.template.to_string(),
            tag: tag.to_string(),
        }
    }

    fn variable(&self, name: &str) -> Result<String, TemplateError> {
        if VARIABLES.contains(&name) {
            Ok(name.to_string())
        } else {
            Err(TemplateError::UnknownVariable {
                template: self.template.to_string(),
                name: name.to_string(),
            })
        }
    }

    /// Parses until a closing tag (`else`, `/if`, `/each`) or the end of
    /// input, returning the closing tag it stopped at.
    fn block(
        &self,
        tokens: &mut impl Iterator<Item = Token>,
        in_each: bool,
    ) -> Result<(Vec<Node>, Option<String>), TemplateError> {
        let mut nodes = Vec::new();

        while let Some(token) = tokens.next() {
            let tag = match token {
                Token::Text(text) => {
                    nodes.push(Node::Text(text));
                    continue;
                }
                Token::Tag(tag) => tag,
            };

            if tag == "else" || tag.starts_with('/') {
                return Ok((nodes, Some(tag)));
            }

            if let Some(name) = tag.strip_prefix("#if") {
                let name = self.variable(name.trim())?;
                let (then, end) = self.block(tokens, in_each)?;
                let otherwise = match end.as_deref() {
                    Some("/if") => Vec::new(),
                    Some("else") => match self.block(tokens, in_each)? {
                        (otherwise, Some(end)) if end == "/if" => otherwise,
                        (_, Some(end)) => return Err(self.unexpected(&end)),
                        (_, None) => return Err(self.unclosed("#if")),
                    },
                    Some(other) => return Err(self.unexpected(other)),
                    None => return Err(self.unclosed("#if")),
                };
                nodes.push(Node::If {
                    name,
                    then,
                    otherwise,
                });
            } else if let Some(name) = tag.strip_prefix("#each") {
                let name = self.variable(name.trim())?;
                let body = match self.block(tokens, true)? {
                    (body, Some(end)) if end == "/each" => body,
                    (_, Some(end)) => return Err(self.unexpected(&end)),
                    (_, None) => return Err(self.unclosed("#each")),
                };
                nodes.push(Node::Each { name, body });
            } else if tag == "." {
                if !in_each {
                    return Err(self.unexpected(&tag));
                }
                nodes.push(Node::Item);
            } else if tag.starts_with('#') {
                return Err(self.unexpected(&tag));
            } else {
                nodes.push(Node::Var(self.variable(&tag)?));
            }
        }

        Ok((nodes, None))
    }

    fn unclosed(&self, block: &str) -> TemplateError {
        TemplateError::UnclosedBlock {
            template: self.template.to_string(),
            block: block.to_string(),
        }
    }
}
