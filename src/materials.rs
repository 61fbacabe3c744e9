//! Materials Project API session (`/materials/...` endpoints).

use reqwest::blocking::Client as HttpClient;
use serde::Deserialize;

use crate::config::Config;
use crate::error::Result;
use crate::http::{build_http, get_json};
use crate::structure::{RawStructure, Structure, Symmetry};
use crate::url_builder::{MATERIALS_CORE_PATH, MATERIALS_SUMMARY_PATH, materials_url};

/// Scalar properties from the summary endpoint.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MaterialSummary {
    #[serde(default)]
    pub formation_energy_per_atom: Option<f64>,
    #[serde(default)]
    pub band_gap: Option<f64>,
    #[serde(default)]
    pub energy_per_atom: Option<f64>,
}

impl MaterialSummary {
    pub fn is_empty(&self) -> bool {
        self.formation_energy_per_atom.is_none()
            && self.band_gap.is_none()
            && self.energy_per_atom.is_none()
    }
}

/// Contract the structure fetcher needs from a structure-database session.
///
/// Implementations release their resources on drop.
pub trait StructureSession {
    fn get_structure_by_material_id(&self, material_id: &str) -> Result<Option<Structure>>;

    /// Best-effort scalar properties. Sessions without them return `Ok(None)`.
    fn get_material_summary(&self, _material_id: &str) -> Result<Option<MaterialSummary>> {
        Ok(None)
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct CoreDoc {
    #[serde(default)]
    structure: Option<RawStructure>,
    #[serde(default)]
    symmetry: Option<Symmetry>,
}

const CORE_FIELDS: [&str; 3] = ["material_id", "structure", "symmetry"];
const SUMMARY_FIELDS: [&str; 4] = [
    "material_id",
    "formation_energy_per_atom",
    "band_gap",
    "energy_per_atom",
];

/// Open session against the Materials Project API.
///
/// Acquire with [`MpRester::open`]; the session is closed when the value is
/// dropped.
#[derive(Debug)]
pub struct MpRester {
    endpoint: String,
    http: HttpClient,
}

impl MpRester {
    pub fn open(config: &Config) -> Result<Self> {
        let http = build_http("x-api-key", &config.api_key)?;
        tracing::debug!(endpoint = %config.mp_endpoint, "opened Materials Project session");
        Ok(Self {
            endpoint: config.mp_endpoint.clone(),
            http,
        })
    }
}

impl Drop for MpRester {
    fn drop(&mut self) {
        tracing::debug!(endpoint = %self.endpoint, "closed Materials Project session");
    }
}

impl StructureSession for MpRester {
    fn get_structure_by_material_id(&self, material_id: &str) -> Result<Option<Structure>> {
        let url = materials_url(&self.endpoint, MATERIALS_CORE_PATH, material_id, &CORE_FIELDS)?;
        let resp: Envelope<CoreDoc> = get_json(&self.http, url)?;
        structure_from_docs(resp.data)
    }

    fn get_material_summary(&self, material_id: &str) -> Result<Option<MaterialSummary>> {
        let url = materials_url(&self.endpoint, MATERIALS_SUMMARY_PATH, material_id, &SUMMARY_FIELDS)?;
        let resp: Envelope<MaterialSummary> = get_json(&self.http, url)?;
        Ok(resp.data.into_iter().next().filter(|s| !s.is_empty()))
    }
}

fn structure_from_docs(docs: Vec<CoreDoc>) -> Result<Option<Structure>> {
    let Some(doc) = docs.into_iter().next() else {
        return Ok(None);
    };
    let Some(raw) = doc.structure else {
        return Ok(None);
    };
    let mut structure = Structure::try_from(raw)?;
    structure.symmetry = doc.symmetry;
    Ok(Some(structure))
}
