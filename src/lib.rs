#![forbid(unsafe_code)]

//! Rust client for the Materials Project and MPContribs APIs.
//!
//! Two small reports are built on top of it:
//!
//! - a contribution report that queries MPContribs for one material within a
//!   project, falls back to a formula search when nothing matches, and prints
//!   a flattened table of the records;
//! - a structure report that fetches one crystal structure from the Materials
//!   Project and prints its composition, symmetry, lattice and sites.
//!
//! **Quick start**
//! ```no_run
//! use mp_fetch::{Config, ContribsClient, ContributionsApi, Query};
//!
//! let config = Config::from_env()?;
//! let client = ContribsClient::new(&config, "open_catalyst_project")?;
//!
//! let query = Query::new().eq("data.mpid", "mp-126");
//! let records = client.query_contributions(&query, &["id", "formula", "data.mpid"], false)?;
//! println!("{} records", records.len());
//! # Ok::<(), mp_fetch::Error>(())
//! ```
//!
//! **Structures**
//! ```no_run
//! use mp_fetch::{Config, MpRester, StructureSession};
//!
//! let config = Config::from_env()?;
//! let session = MpRester::open(&config)?;
//! if let Some(structure) = session.get_structure_by_material_id("mp-126")? {
//!     println!("{}", structure.composition().reduced_formula());
//! }
//! # Ok::<(), mp_fetch::Error>(())
//! ```
//!
//! Notes:
//! - Both APIs authenticate with the same `MP_API_KEY`.
//! - All calls are blocking and issued exactly once; there is no retry.

mod config;
mod contribs;
mod endpoints;
mod error;
mod http;
mod materials;
mod periodic;
mod query;
mod structure;
mod url_builder;
mod value;

pub mod fetch;
pub mod logging;
pub mod table;

pub use crate::config::{API_KEY_VAR, CONTRIBS_HOST_VAR, Config, MP_ENDPOINT_VAR};
pub use crate::contribs::{ContribsClient, ContributionRecord, ContributionsApi, ProjectColumn};
pub use crate::error::{Error, Result};
pub use crate::materials::{MaterialSummary, MpRester, StructureSession};
pub use crate::query::Query;
pub use crate::structure::{Composition, Lattice, Site, Specie, Structure, Symmetry};
pub use crate::table::TabularView;
pub use crate::value::{FieldMap, FieldValue};
