use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstallerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Command '{0}' not found, is it installed?")]
    CommandNotFound(String),

    #[error("Prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("automatic installation is only supported on Linux systems")]
    UnsupportedPlatform,

    #[error("automatic installation is only supported on systems running systemd")]
    NoSystemd,

    #[error("automatic installation is not possible inside Docker containers")]
    InsideContainer,

    #[error("the installer must be run as root (try sudo)")]
    NotRoot,

    #[error("getting current binary path: {0}")]
    CurrentExe(std::io::Error),

    #[error("{action} {path}: {source}")]
    Fs {
        action: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    StepFailed(String),
}

/// Raised while parsing or rendering an embedded artifact template.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("{template}: unknown variable '{name}'")]
    UnknownVariable { template: String, name: String },

    #[error("{template}: unterminated tag at byte {offset}")]
    UnterminatedTag { template: String, offset: usize },

    #[error("{template}: unexpected '{tag}'")]
    UnexpectedTag { template: String, tag: String },

    #[error("{template}: block '{block}' is never closed")]
    UnclosedBlock { template: String, block: String },

    #[error("{template}: '{name}' cannot be used as {expected}")]
    WrongKind {
        template: String,
        name: String,
        expected: &'static str,
    },
}

/// A rejected edit. Always recoverable: the editor shows it and asks again.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("invalid port number: {0}")]
    InvalidPort(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("a file already exists at {0}")]
    FileExists(String),

    #[error("expected yes or no, got: {0}")]
    InvalidChoice(String),
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("{0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected status code: {0}")]
    Status(u16),
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("reading config {path}: {source}")]
    ReadConfig {
        path: String,
        source: std::io::Error,
    },

    #[error("parsing config {path}: {source}")]
    ParseConfig {
        path: String,
        source: serde_yaml::Error,
    },

    #[error("PORT must be a valid port number, got: {0}")]
    InvalidPortEnv(String),

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}
