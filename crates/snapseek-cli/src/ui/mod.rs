//! Terminal presentation for the `snapseek` binary.
//!
//! `style` prefixes and colors messages, `table` renders entries and search
//! results, and `progress` drives the ingest bar and step output. `color` and
//! `format` are the small helpers underneath.

pub mod color;
pub mod format;
pub mod progress;
pub mod style;
pub mod table;

pub use color::ColorMode;
pub use progress::{Progress, ProgressMode, StepTree};
pub use style::{MessageType, Style};
