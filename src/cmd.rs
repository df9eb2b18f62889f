use std::{
    io,
    process::{Command, Stdio},
};

use crate::error::InstallerError;

// ── Data types ────────────────────────────────────────────────────────────────

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// `exit status 1`, or `terminated by signal`.
    pub fn status_text(&self) -> String {
        match self.code {
            Some(code) => format!("exit status {code}"),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Runs external programs. Implementations must be shareable with the
/// background thread of a progress step.
pub trait CommandRunner: Send + Sync {
    /// Runs to completion with output captured. A non-zero exit is not an
    /// error here; only failing to start the program is.
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, InstallerError>;
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn not_found_or_io(program: &str, err: io::Error) -> InstallerError {
    if err.kind() == io::ErrorKind::NotFound {
        InstallerError::CommandNotFound(program.to_string())
    } else {
        InstallerError::Io(err)
    }
}

// ── System runner ─────────────────────────────────────────────────────────────

/// Spawns real processes with stdin closed and stdout/stderr captured.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, InstallerError> {
        log::debug!("running {program} {}", args.join(" "));
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| not_found_or_io(program, e))?;

        let result = CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        };
        log::debug!("{program} finished with {}", result.status_text());
        Ok(result)
    }
}

// ── Recording runner (tests) ──────────────────────────────────────────────────

#[cfg(test)]
pub mod recording {
    use std::sync::Mutex;

    use super::{CommandOutput, CommandRunner};
    use crate::error::InstallerError;

    /// Answers every command with a canned output per program and keeps a
    /// log of invocations.
    #[derive(Default)]
    pub struct RecordingRunner {
        pub calls: Mutex<Vec<Vec<String>>>,
        failing: Vec<(&'static str, CommandOutput)>,
    }

    impl RecordingRunner {
        pub fn failing(mut self, program: &'static str, code: i32, stderr: &str) -> Self {
            self.failing.push((
                program,
                CommandOutput {
                    code: Some(code),
                    stdout: String::new(),
                    stderr: stderr.to_string(),
                },
            ));
            self
        }

        pub fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl CommandRunner for RecordingRunner {
        fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, InstallerError> {
            let mut call = vec![program.to_string()];
            call.extend(args.iter().map(|a| a.to_string()));
            self.calls.lock().unwrap().push(call);

            Ok(self
                .failing
                .iter()
                .find(|(p, _)| *p == program)
                .map(|(_, out)| out.clone())
                .unwrap_or(CommandOutput {
                    code: Some(0),
                    ..CommandOutput::default()
                }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_exit_code_and_streams() {
        let out = SystemRunner
            .run("sh", &["-c", "echo out; echo err >&2; exit 3"])
            .unwrap();
        assert_eq!(out.code, Some(3));
        assert!(!out.success());
        assert_eq!(out.stdout, "out");
        assert_eq!(out.stderr, "err");
        assert_eq!(out.status_text(), "exit status 3");
    }

    #[test]
    fn missing_program_is_reported_by_name() {
        let err = SystemRunner
            .run("definitely-not-a-real-program-4821", &[])
            .unwrap_err();
        assert!(matches!(err, InstallerError::CommandNotFound(p) if p == "definitely-not-a-real-program-4821"));
    }
}
