//! Shared Utilities for the tx_convert tools
//!
//! Plumbing that is not specific to texture classification:
//! - Logging setup (tracing + rolling file appender)
//! - External tool process wrapper (stderr draining, timeout, cancellation)
//! - File collection and batch tallies
//! - Progress bar and summary report

pub mod batch;
pub mod logging;
pub mod progress;
pub mod report;
pub mod tool_process;

pub use batch::{collect_files, has_extension, BatchResult};
pub use logging::{init_logging, log_external_tool, LogConfig};
pub use progress::{create_progress_bar, format_duration, BatchProgress};
pub use report::{print_simple_summary, print_summary_report};
pub use tool_process::{CancelToken, ToolOutcome, ToolProcess};
