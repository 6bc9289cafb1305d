//! Report sink adapters.

pub mod json_writer;
pub mod recording;

pub use json_writer::{JsonReportWriter, ReportDocument};
pub use recording::{FinishedCase, RecordingReportSink};
