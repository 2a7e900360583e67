//! Spinners, the ingest progress bar and step output.
//!
//! Nothing animates unless stdout is a terminal; `--quiet` and `--json`
//! hide indicators as well.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};

use super::color::stdout_is_terminal;

const TICK: Duration = Duration::from_millis(80);
const SPINNER_FRAMES: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// How much progress feedback a command gives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressMode {
    /// Animated indicators on a terminal.
    Interactive,
    /// Final status lines only.
    Quiet,
    /// Nothing but the JSON document on stdout.
    Silent,
}

impl ProgressMode {
    pub fn detect(quiet: bool, json: bool) -> Self {
        match (json, quiet || !stdout_is_terminal()) {
            (true, _) => Self::Silent,
            (false, true) => Self::Quiet,
            (false, false) => Self::Interactive,
        }
    }

    pub fn is_interactive(&self) -> bool {
        *self == Self::Interactive
    }

    pub fn shows_messages(&self) -> bool {
        *self != Self::Silent
    }

    /// `make()` when animated output is allowed, a hidden bar otherwise.
    fn visible(&self, make: impl FnOnce() -> ProgressBar) -> ProgressBar {
        if self.is_interactive() {
            make()
        } else {
            ProgressBar::hidden()
        }
    }
}

fn spinner_style(template: &str) -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars(SPINNER_FRAMES)
}

fn running_spinner(template: &str, message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner().with_style(spinner_style(template));
    spinner.set_message(message);
    spinner.enable_steady_tick(TICK);
    spinner
}

/// A single spinner or bar.
pub struct Progress {
    bar: ProgressBar,
    mode: ProgressMode,
}

impl Progress {
    /// Spinner for work of unknown length, such as `rebuild`.
    pub fn spinner(message: &str, mode: ProgressMode) -> Self {
        let bar = mode.visible(|| {
            running_spinner("{spinner:.cyan} {msg} ({elapsed})", message.to_string())
        });
        Self { bar, mode }
    }

    /// Bar over `total` files.
    pub fn bar(total: u64, message: &str, mode: ProgressMode) -> Self {
        let bar = mode.visible(|| {
            let style = ProgressStyle::default_bar()
                .template("[{bar:20.cyan/dim}] {pos}/{len} {msg} ({elapsed}, eta {eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█░");
            ProgressBar::new(total)
                .with_style(style)
                .with_message(message.to_string())
        });
        Self { bar, mode }
    }

    pub fn set_position(&self, pos: u64) {
        self.bar.set_position(pos);
    }

    pub fn finish_clear(&self) {
        self.bar.finish_and_clear();
    }

    /// Clear the indicator and print `message` in its place unless silent.
    pub fn finish_with_message(&self, message: &str) {
        self.bar.finish_and_clear();
        if self.mode.shows_messages() && !message.is_empty() {
            println!("{}", message);
        }
    }
}

struct RunningStep {
    name: String,
    started: Instant,
    spinner: Option<ProgressBar>,
}

/// Phases of a command printed as a tree once each one finishes:
///
/// ```text
/// ├─ Loading models done (1.4s)
/// └─ Collecting images done (12ms)
/// ```
pub struct StepTree {
    mode: ProgressMode,
    running: Option<RunningStep>,
}

impl StepTree {
    pub fn new(mode: ProgressMode) -> Self {
        Self { mode, running: None }
    }

    /// Begin `name`, closing the previous step.
    pub fn step(&mut self, name: &str) {
        self.close(false);
        let spinner = self.mode.is_interactive().then(|| {
            running_spinner("├─ {spinner:.cyan} {msg}", format!("{}...", name))
        });
        self.running = Some(RunningStep {
            name: name.to_string(),
            started: Instant::now(),
            spinner,
        });
    }

    pub fn finish_last_step(&mut self) {
        self.close(true);
    }

    /// Stop the current step without reporting it, e.g. before an error.
    pub fn abandon(&mut self) {
        if let Some(spinner) = self.running.take().and_then(|step| step.spinner) {
            spinner.finish_and_clear();
        }
    }

    fn close(&mut self, last: bool) {
        let Some(step) = self.running.take() else {
            return;
        };
        if let Some(spinner) = &step.spinner {
            spinner.finish_and_clear();
        }
        if self.mode.is_interactive() {
            let branch = if last { "└─" } else { "├─" };
            println!(
                "{} {} done ({})",
                branch,
                step.name,
                format_duration(step.started.elapsed())
            );
        }
    }
}

/// `50ms` under a tenth of a second, `2.8s` above.
fn format_duration(d: Duration) -> String {
    if d < Duration::from_millis(100) {
        format!("{}ms", d.as_millis())
    } else {
        format!("{:.1}s", d.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_and_quiet_modes() {
        assert_eq!(ProgressMode::detect(false, true), ProgressMode::Silent);
        assert_eq!(ProgressMode::detect(true, true), ProgressMode::Silent);
        assert_eq!(ProgressMode::detect(true, false), ProgressMode::Quiet);
    }

    #[test]
    fn test_mode_flags() {
        assert!(ProgressMode::Interactive.is_interactive());
        assert!(!ProgressMode::Quiet.is_interactive());
        assert!(ProgressMode::Quiet.shows_messages());
        assert!(!ProgressMode::Silent.shows_messages());
    }

    #[test]
    fn test_hidden_indicators_accept_updates() {
        let progress = Progress::bar(10, "Ingesting", ProgressMode::Quiet);
        progress.set_position(5);
        progress.finish_clear();

        let spinner = Progress::spinner("Rebuilding", ProgressMode::Silent);
        spinner.finish_with_message("not printed");
    }

    #[test]
    fn test_step_tree_without_terminal() {
        let mut tree = StepTree::new(ProgressMode::Quiet);
        tree.step("Loading models");
        tree.step("Collecting images");
        tree.finish_last_step();
        tree.finish_last_step();
        tree.step("Searching");
        tree.abandon();
        assert!(tree.running.is_none());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
        assert_eq!(format_duration(Duration::from_millis(2800)), "2.8s");
    }
}
