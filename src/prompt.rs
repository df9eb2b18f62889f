use std::fmt;

use dialoguer::{theme::Theme, Input};

use crate::{
    error::InstallerError,
    ui::{Palette, Tone},
};

/// Source of free-form answers typed by the user.
pub trait Prompt {
    /// Shows `message` and returns the trimmed answer; empty when the user
    /// just pressed Enter.
    fn ask(&mut self, message: &str) -> Result<String, InstallerError>;
}

// ── Terminal ──────────────────────────────────────────────────────────────────

/// Renders the answer line as a bare `> `.
struct AnswerTheme {
    palette: Palette,
}

impl Theme for AnswerTheme {
    fn format_input_prompt(
        &self,
        f: &mut dyn fmt::Write,
        _prompt: &str,
        _default: Option<&str>,
    ) -> fmt::Result {
        write!(f, "{} ", self.palette.paint(">", Tone::Muted))
    }

    fn format_input_prompt_selection(
        &self,
        f: &mut dyn fmt::Write,
        _prompt: &str,
        sel: &str,
    ) -> fmt::Result {
        write!(f, "{} {}", self.palette.paint(">", Tone::Muted), sel)
    }
}

pub struct TerminalPrompt {
    theme: AnswerTheme,
}

impl TerminalPrompt {
    pub fn new(palette: Palette) -> Self {
        Self {
            theme: AnswerTheme { palette },
        }
    }
}

impl Prompt for TerminalPrompt {
    fn ask(&mut self, message: &str) -> Result<String, InstallerError> {
        println!("\n{message}");
        let answer: String = Input::with_theme(&self.theme)
            .allow_empty(true)
            .interact_text()?;
        Ok(answer.trim().to_string())
    }
}

// ── Scripted (tests) ──────────────────────────────────────────────────────────
