use std::{
    fmt::Display,
    sync::mpsc::{self, RecvTimeoutError},
    thread,
    time::Duration,
};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::ui::{Palette, Tone};

/// Repaint cadence of the spinner.
pub const TICK: Duration = Duration::from_millis(110);

const FRAMES: [&str; 5] = ["-", "\\", "|", "/", " "];

// ── Outcome ───────────────────────────────────────────────────────────────────

/// Result of one long-running step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    /// Text printed after the label, may carry styling.
    pub text: String,
    pub error: Option<String>,
    /// Whether the orchestrator may carry on after this step.
    pub proceed: bool,
}

impl StepOutcome {
    pub fn done() -> Self {
        Self::success("DONE")
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            error: None,
            proceed: true,
        }
    }

    /// `FAILED` in red, with `err` on the line below.
    pub fn failed(palette: &Palette, err: impl Display) -> Self {
        Self::failed_as(palette.paint("FAILED", Tone::Red), err)
    }

    pub fn failed_as(text: impl Into<String>, err: impl Display) -> Self {
        Self {
            text: text.into(),
            error: Some(err.to_string()),
            proceed: false,
        }
    }
}

// ── Views ─────────────────────────────────────────────────────────────────────

/// Where a [`ProgressRunner`] draws. Only ever called from the thread that
/// called [`ProgressRunner::run`].
pub trait ProgressView {
    fn start(&mut self, label: &str);
    fn tick(&mut self);
    fn finish(&mut self, label: &str, outcome: &StepOutcome);
}

/// `[-] Label ........ ` on stdout, replaced by the outcome line when done.
pub struct SpinnerView {
    palette: Palette,
    bar: Option<ProgressBar>,
}

impl SpinnerView {
    pub fn new(palette: Palette) -> Self {
        Self { palette, bar: None }
    }

    fn style(&self) -> ProgressStyle {
        let template = format!(
            "{}{{spinner}}{} {{msg}}",
            self.palette.paint("[", Tone::Muted),
            self.palette.paint("]", Tone::Muted)
        );
        ProgressStyle::with_template(&template)
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&FRAMES)
    }
}

impl ProgressView for SpinnerView {
    fn start(&mut self, label: &str) {
        let pb = ProgressBar::with_draw_target(None, ProgressDrawTarget::stdout());
        pb.set_style(self.style());
        pb.set_message(self.palette.key_value(label, ""));
        self.bar = Some(pb);
    }

    fn tick(&mut self) {
        if let Some(pb) = &self.bar {
            pb.tick();
        }
    }

    fn finish(&mut self, label: &str, outcome: &StepOutcome) {
        if let Some(pb) = self.bar.take() {
            pb.finish_and_clear();
        }

        let symbol = match outcome.error {
            None => self.palette.paint("✔", Tone::Green),
            Some(_) => self.palette.paint("✘", Tone::Red),
        };
        println!(
            "{}{}{} {}{}",
            self.palette.paint("[", Tone::Muted),
            symbol,
            self.palette.paint("]", Tone::Muted),
            self.palette.key_value(label, ""),
            outcome.text
        );

        if let Some(err) = &outcome.error {
            self.palette.println(format!(" └╴ {err}"), Tone::Red);
        }
    }
}

// ── Runner ────────────────────────────────────────────────────────────────────

/// Runs a step on a background thread while the calling thread animates a
/// spinner, then reports the outcome exactly once.
pub struct ProgressRunner<V> {
    view: V,
    tick: Duration,
}

impl<V: ProgressView> ProgressRunner<V> {
    pub fn new(view: V) -> Self {
        Self::with_tick(view, TICK)
    }

    pub fn with_tick(view: V, tick: Duration) -> Self {
        Self { view, tick }
    }

    #[cfg(test)]
    pub fn view(&self) -> &V {
        &self.view
    }

    /// Returns the step's `proceed` flag. Never fails itself: a panicking
    /// action is reported as a failed step.
    pub fn run<F>(&mut self, label: &str, action: F) -> bool
    where
        F: FnOnce() -> StepOutcome + Send,
    {
        let (done_tx, done_rx) = mpsc::sync_channel::<StepOutcome>(1);
        let view = &mut self.view;
        let tick = self.tick;

        view.start(label);

        let outcome = thread::scope(|scope| {
            let worker = scope.spawn(move || {
                // The receiver outlives the scope, so this cannot fail.
                let _ = done_tx.send(action());
            });

            loop {
                match done_rx.recv_timeout(tick) {
                    Ok(outcome) => break outcome,
                    Err(RecvTimeoutError::Timeout) => view.tick(),
                    Err(RecvTimeoutError::Disconnected) => {
                        let reason = match worker.join() {
                            Ok(()) => "step ended without an outcome".to_string(),
                            Err(_) => "step panicked".to_string(),
                        };
                        break StepOutcome::failed_as("FAILED", reason);
                    }
                }
            }
        });

        log::debug!("step '{label}' finished: proceed={}", outcome.proceed);
        view.finish(label, &outcome);
        outcome.proceed
    }
}


#[cfg(test)]
mod tests {
    use super::recording::{Event, RecordingView};
    use super::*;

    fn runner() -> ProgressRunner<RecordingView> {
        ProgressRunner::with_tick(RecordingView::default(), Duration::from_millis(10))
    }

    #[test]
    fn outcome_is_reported_once_after_every_tick() {
        let mut r = runner();
        let proceed = r.run("Slow step", || {
            thread::sleep(Duration::from_millis(120));
            StepOutcome::done()
        });

        assert!(proceed);
        let events = &r.view().events;
        assert_eq!(events.first(), Some(&Event::Start("Slow step".into())));
        assert!(events.iter().filter(|e| **e == Event::Tick).count() >= 2);
        assert_eq!(r.view().finished().len(), 1);
        assert!(matches!(events.last(), Some(Event::Finish(_, _))));
    }

    #[test]
    fn instant_action_still_finishes_once() {
        let mut r = runner();
        assert!(r.run("Fast", StepOutcome::done));
        assert_eq!(r.view().finished().len(), 1);
        assert!(matches!(r.view().events.last(), Some(Event::Finish(_, _))));
    }

    #[test]
    fn failure_returns_the_action_flag() {
        let mut r = runner();
        let palette = Palette::plain();
        let proceed = r.run("Broken", || StepOutcome::failed(&palette, "boom"));

        assert!(!proceed);
        let (label, outcome) = r.view().finished()[0];
        assert_eq!(label, "Broken");
        assert_eq!(outcome.text, "FAILED");
        assert_eq!(outcome.error.as_deref(), Some("boom"));
    }

    #[test]
    fn soft_failure_may_still_proceed() {
        let mut r = runner();
        let proceed = r.run("Soft", || StepOutcome {
            text: "FAILED".into(),
            error: Some("not fatal".into()),
            proceed: true,
        });
        assert!(proceed);
    }

    #[test]
    fn panicking_action_is_reported_as_failure() {
        let mut r = runner();
        let proceed = r.run("Panics", || -> StepOutcome { panic!("bad step") });

        assert!(!proceed);
        let (_, outcome) = r.view().finished()[0];
        assert_eq!(outcome.error.as_deref(), Some("step panicked"));
    }

    #[test]
    fn action_can_borrow_caller_state() {
        let mut r = runner();
        let mut produced = Vec::new();
        r.run("Borrow", || {
            produced.extend_from_slice(b"bytes");
            StepOutcome::done()
        });
        assert_eq!(produced, b"bytes");
    }
}
