use std::fmt::Display;

use console::{measure_text_width, Style};

// ── Palette ───────────────────────────────────────────────────────────────────

/// Colours used by the installer output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Red,
    Green,
    Yellow,
    Cyan,
    Muted,
}

impl Tone {
    fn style(self) -> Style {
        match self {
            Tone::Red => Style::new().red(),
            Tone::Green => Style::new().green(),
            Tone::Yellow => Style::new().yellow(),
            Tone::Cyan => Style::new().cyan(),
            Tone::Muted => Style::new().black().bright(),
        }
    }
}

/// Decides once, at startup, whether output gets ANSI decoration.
/// Copied by value into everything that renders text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    enabled: bool,
}

impl Palette {
    /// Styling is off when `NO_COLOR` is present or `TERM` is `dumb`.
    pub fn detect() -> Self {
        let no_color = std::env::var_os("NO_COLOR").is_some();
        let dumb = std::env::var("TERM").is_ok_and(|t| t == "dumb");
        Self::new(!no_color && !dumb)
    }

    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    #[cfg(test)]
    pub fn plain() -> Self {
        Self::new(false)
    }

    pub fn paint(&self, text: impl Display, tone: Tone) -> String {
        tone.style()
            .force_styling(self.enabled)
            .apply_to(text)
            .to_string()
    }

    pub fn println(&self, text: impl Display, tone: Tone) {
        println!("{}", self.paint(text, tone));
    }

    /// `key ....... value`, with the dots filling up to a fixed column.
    pub fn key_value(&self, key: &str, value: &str) -> String {
        let padding = 55usize.saturating_sub(measure_text_width(key)).max(3);
        format!(
            "{} {} {}",
            key,
            self.paint(".".repeat(padding), Tone::Muted),
            value
        )
    }

    /// `[option]`, the form used for anything the user can type.
    pub fn input_option(&self, option: &str) -> String {
        format!(
            "{}{}{}",
            self.paint("[", Tone::Muted),
            self.paint(option, Tone::Yellow),
            self.paint("]", Tone::Muted)
        )
    }
}

/// Removes ANSI escape sequences.
#[cfg(test)]
pub fn strip(text: &str) -> String {
    console::strip_ansi_codes(text).into_owned()
}

// ── Feedback messages ─────────────────────────────────────────────────────────

/// Red ✗ on stderr. Used for errors that end the process.
pub fn print_error(palette: &Palette, msg: &str) {
    eprintln!(
        "  {}  {}",
        palette.paint("✗", Tone::Red),
        palette.paint(msg, Tone::Red)
    );
}

/// A message framed above and below by a rule of the same width.
pub fn print_banner(palette: &Palette, msg: &str) {
    let rule = "=".repeat(measure_text_width(msg));
    println!();
    palette.println(&rule, Tone::Green);
    palette.println(msg, Tone::Green);
    palette.println(&rule, Tone::Green);
}
