//! Log ingestion: turning a tailed process or a random generator into a
//! stream of [`RequestLogRecord`]s.
//!
//! Components:
//! - `parser`: one raw line to an optional record.
//! - `synthetic`: weighted random request generator.
//! - `live_tail`: the external tail subprocess.
//! - `mode`: the process-wide synthetic/live switch.
//! - `source`: the background task tying it together, and its supervisor.

pub mod live_tail;
pub mod mode;
pub mod parser;
pub mod source;
pub mod synthetic;
pub mod types;

pub use mode::{SourceMode, SourceModeFlag};
pub use parser::parse_log_line;
pub use source::{LogEventSource, SourceSettings, SourceSupervisor};
pub use types::RequestLogRecord;
