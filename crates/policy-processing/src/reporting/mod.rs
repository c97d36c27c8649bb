//! Output writing.
//!
//! The cleaned table, the per-column error tables and the optional JSON run
//! summary are all written through [`ReportWriter`]. Writes are idempotent:
//! re-running on identical input produces byte-identical files.
//!
//! # Example
//!
//! ```rust,ignore
//! use policy_processing::reporting::ReportWriter;
//!
//! let writer = ReportWriter::new("results");
//! let written = writer.write_error_tables(&report, &source)?;
//! writer.write_run_report(&run_report, "policies")?;
//! ```

mod writer;

pub use writer::ReportWriter;
