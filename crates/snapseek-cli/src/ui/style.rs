//! Prefixed, optionally colored messages.
//!
//! | Prefix   | Used for                         | Color  |
//! |----------|----------------------------------|--------|
//! | `[ok]`   | finished ingest, describe, ...   | green  |
//! | `[err]`  | failed command                   | red    |
//! | `[warn]` | low-confidence results, warnings | yellow |
//! | `[info]` | empty index, counts              | blue   |
//! | `[hint]` | the next command to run          | cyan   |
//! | `[skip]` | files left out of an ingest      | dim    |

use owo_colors::{OwoColorize, Style as Paint};

use super::color::ColorMode;

/// Indentation of `Cause:`/`Hint:` lines under an error.
const CONTEXT_INDENT: &str = "      ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Ok,
    Err,
    Warn,
    Info,
    Hint,
    Skip,
}

impl MessageType {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Ok => "[ok]",
            Self::Err => "[err]",
            Self::Warn => "[warn]",
            Self::Info => "[info]",
            Self::Hint => "[hint]",
            Self::Skip => "[skip]",
        }
    }

    fn paint(&self) -> Paint {
        let paint = Paint::new();
        match self {
            Self::Ok => paint.green(),
            Self::Err => paint.red(),
            Self::Warn => paint.yellow(),
            Self::Info => paint.blue(),
            Self::Hint => paint.cyan(),
            Self::Skip => paint.dimmed(),
        }
    }
}

/// Renders CLI text. Colors are applied only when the [`ColorMode`] allows.
///
/// ```text
/// let style = Style::new(ColorMode::Never);
/// println!("{}", style.message(MessageType::Ok, "Ingested 3 images"));
/// ```
#[derive(Debug, Clone)]
pub struct Style {
    color_mode: ColorMode,
}

impl Style {
    pub fn new(color_mode: ColorMode) -> Self {
        Self { color_mode }
    }

    pub fn colors_enabled(&self) -> bool {
        self.color_mode.is_enabled()
    }

    fn apply(&self, text: &str, paint: Paint) -> String {
        if self.colors_enabled() {
            text.style(paint).to_string()
        } else {
            text.to_string()
        }
    }

    /// `[ok] Ingested 3 images`
    pub fn message(&self, kind: MessageType, text: &str) -> String {
        format!("{} {}", self.apply(kind.prefix(), kind.paint()), text)
    }

    /// A detail line under a message: `     Id: 0b7c9d2e-...`
    pub fn message_detail(&self, label: &str, value: &str) -> String {
        format!("     {}: {}", label, value)
    }

    pub fn section(&self, title: &str) -> String {
        self.apply(title, Paint::new().bold())
    }

    /// An `[err]` line followed by indented `Cause:` and `Hint:` lines.
    pub fn error_with_context(&self, msg: &str, cause: Option<&str>, hint: Option<&str>) -> String {
        let mut lines = vec![self.message(MessageType::Err, msg)];
        lines.extend(cause.map(|c| format!("{}Cause: {}", CONTEXT_INDENT, c)));
        lines.extend(hint.map(|h| format!("{}Hint: {}", CONTEXT_INDENT, h)));
        lines.join("\n")
    }

    pub fn key_value(&self, key: &str, value: &str) -> String {
        format!("{}: {}", self.apply(key, Paint::new().dimmed()), value)
    }

    /// First 8 characters of an external id.
    pub fn entry_id(&self, id: &str) -> String {
        let short: String = id.chars().take(8).collect();
        self.apply(&short, Paint::new().yellow())
    }

    pub fn file_path(&self, path: &str) -> String {
        self.apply(path, Paint::new().cyan())
    }

    /// Quoted caption, italic when colored.
    pub fn caption(&self, text: &str) -> String {
        self.apply(&format!("\"{}\"", text), Paint::new().italic())
    }

    pub fn active_flag(&self, active: bool) -> String {
        if active {
            self.apply("active", Paint::new().green())
        } else {
            self.apply("inactive", Paint::new().dimmed())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> Style {
        Style::new(ColorMode::Never)
    }

    #[test]
    fn test_prefixes() {
        let all = [
            MessageType::Ok,
            MessageType::Err,
            MessageType::Warn,
            MessageType::Info,
            MessageType::Hint,
            MessageType::Skip,
        ];
        let prefixes: Vec<_> = all.iter().map(MessageType::prefix).collect();
        assert_eq!(prefixes, ["[ok]", "[err]", "[warn]", "[info]", "[hint]", "[skip]"]);
    }

    #[test]
    fn test_plain_message_and_detail() {
        assert_eq!(plain().message(MessageType::Ok, "Ingested 2 of 2 images"), "[ok] Ingested 2 of 2 images");
        assert_eq!(plain().message(MessageType::Skip, "a.gif"), "[skip] a.gif");
        assert_eq!(plain().message_detail("Id", "abc"), "     Id: abc");
    }

    #[test]
    fn test_error_with_context() {
        let output = plain().error_with_context(
            "Configuration error",
            Some("index has dimension 768 but index.dimension is 512"),
            Some("Set index.dimension to match the embedding model"),
        );
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "[err] Configuration error");
        assert_eq!(lines[1], "      Cause: index has dimension 768 but index.dimension is 512");
        assert_eq!(lines[2], "      Hint: Set index.dimension to match the embedding model");
    }

    #[test]
    fn test_error_without_context_is_one_line() {
        assert_eq!(plain().error_with_context("boom", None, None), "[err] boom");
    }

    #[test]
    fn test_entry_id_is_shortened() {
        assert_eq!(plain().entry_id("0b7c9d2e-1111-2222-3333-444455556666"), "0b7c9d2e");
        assert_eq!(plain().entry_id("short"), "short");
    }

    #[test]
    fn test_flags_and_captions_without_color() {
        assert_eq!(plain().active_flag(true), "active");
        assert_eq!(plain().active_flag(false), "inactive");
        assert_eq!(plain().caption("a dog"), "\"a dog\"");
        assert_eq!(plain().key_value("Rows", "3"), "Rows: 3");
    }
}
