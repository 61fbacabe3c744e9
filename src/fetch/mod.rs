//! The two report workflows.
//!
//! Both write their report progressively to a caller-supplied writer (stdout
//! in the binaries) and turn remote failures into printed messages. Only
//! configuration errors and output I/O errors are returned as `Err`.

pub mod contributions;
pub mod structure;

/// Material both reports are about.
pub const TARGET_MATERIAL_ID: &str = "mp-126";

/// Render names the way the reports list them: `['id', 'formula']`.
pub(crate) fn name_list<S: AsRef<str>>(names: &[S]) -> String {
    let quoted: Vec<String> = names.iter().map(|n| format!("'{}'", n.as_ref())).collect();
    format!("[{}]", quoted.join(", "))
}

pub use contributions::{ContributionSet, QuerySource, fetch_contributions, run_contributions};
pub use structure::{StructureOutcome, failure_line, fetch_structure, run_structure};
