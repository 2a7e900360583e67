//! Whether to color output.
//!
//! `auto` colors only when stdout is a terminal and `NO_COLOR` is unset
//! (<https://no-color.org/>).

use std::io::IsTerminal;

/// The `--color` setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    Always,
    Never,
    #[default]
    Auto,
}

impl ColorMode {
    /// Parse a `--color` value, ignoring case. Unknown values give `None`.
    pub fn parse(value: &str) -> Option<Self> {
        [("always", Self::Always), ("never", Self::Never), ("auto", Self::Auto)]
            .into_iter()
            .find(|(name, _)| value.eq_ignore_ascii_case(name))
            .map(|(_, mode)| mode)
    }

    pub fn is_enabled(&self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => std::env::var_os("NO_COLOR").is_none() && stdout_is_terminal(),
        }
    }
}

pub fn stdout_is_terminal() -> bool {
    std::io::stdout().is_terminal()
}

/// Columns available on the terminal; 80 when stdout is not one.
pub fn terminal_width() -> usize {
    match terminal_size::terminal_size() {
        Some((terminal_size::Width(columns), _)) => usize::from(columns),
        None => 80,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(ColorMode::parse("always"), Some(ColorMode::Always));
        assert_eq!(ColorMode::parse("Never"), Some(ColorMode::Never));
        assert_eq!(ColorMode::parse("AUTO"), Some(ColorMode::Auto));
        assert_eq!(ColorMode::parse("sometimes"), None);
    }

    #[test]
    fn test_forced_modes_ignore_environment() {
        assert!(ColorMode::Always.is_enabled());
        assert!(!ColorMode::Never.is_enabled());
    }

    #[test]
    fn test_terminal_width_is_positive() {
        assert!(terminal_width() > 0);
    }
}
