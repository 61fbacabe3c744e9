use std::io::Write;

use super::name_list;
use crate::config::Config;
use crate::contribs::{ContributionRecord, ContributionsApi};
use crate::error::Result;
use crate::query::Query;
use crate::table::{TabularView, normalize};

/// MPContribs project the contribution report is scoped to.
pub const PROJECT: &str = "open_catalyst_project";

/// Formula substring used when the material has no direct entries.
pub const FALLBACK_FORMULA: &str = "Pt";

pub const PRECISE_FIELDS: [&str; 9] = [
    "id",
    "identifier",
    "formula",
    "data.mpid",
    "data.adsorptionEnergy",
    "data.adsorbateSmiles",
    "data.adsorbateIUPACFormula",
    "data.bulkFormula",
    "data.surfaceTop",
];

pub const FALLBACK_FIELDS: [&str; 8] = [
    "id",
    "identifier",
    "formula",
    "data.mpid",
    "data.adsorptionEnergy",
    "data.adsorbateSmiles",
    "data.adsorbateIUPACFormula",
    "data.bulkFormula",
];

const FALLBACK_DETAIL_LIMIT: usize = 3;
const HEAD_ROWS: usize = 5;
const NA: &str = "N/A";

/// Which query produced the working set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuerySource {
    Precise,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct ContributionSet {
    pub source: QuerySource,
    pub records: Vec<ContributionRecord>,
    pub table: TabularView,
}

/// Load configuration, connect, and run [`fetch_contributions`] for the
/// default target.
///
/// Configuration errors are returned before `connect` is called.
pub fn run_contributions<C, L, F, W>(load_config: L, connect: F, out: &mut W) -> Result<Option<ContributionSet>>
where
    C: ContributionsApi,
    L: FnOnce() -> Result<Config>,
    F: FnOnce(&Config) -> Result<C>,
    W: Write,
{
    let config = load_config()?;
    let client = match connect(&config) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("cannot open contributions session: {e}");
            writeln!(out, "Error: {e}")?;
            return Ok(None);
        }
    };
    fetch_contributions(&client, super::TARGET_MATERIAL_ID, FALLBACK_FORMULA, out)
}

/// Query contributions for `mpid`, falling back to a formula search when the
/// precise query is empty.
pub fn fetch_contributions<C, W>(
    client: &C,
    mpid: &str,
    fallback_formula: &str,
    out: &mut W,
) -> Result<Option<ContributionSet>>
where
    C: ContributionsApi,
    W: Write,
{
    writeln!(out, "Available query parameters:")?;
    match client.available_query_params() {
        Ok(params) => writeln!(out, "{}", name_list(&params))?,
        Err(e) => {
            tracing::warn!("query params unavailable: {e}");
            writeln!(out, "Could not retrieve query params: {e}")?;
        }
    }

    writeln!(out, "\n=== Searching for {mpid} in Open Catalyst project ===")?;
    let precise = Query::new().eq("data.mpid", mpid);
    let mut records = match client.query_contributions(&precise, &PRECISE_FIELDS, false) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!("precise query failed: {e}");
            writeln!(out, "Error querying contributions: {e}")?;
            return Ok(None);
        }
    };
    writeln!(out, "Found {} entries for {mpid}", records.len())?;
    let mut source = QuerySource::Precise;

    if !records.is_empty() {
        writeln!(out, "\n=== Found {} entries for {mpid} ===", records.len())?;
        for (i, rec) in records.iter().enumerate() {
            write_precise_entry(out, i + 1, rec)?;
        }
    } else {
        writeln!(out, "\n=== No entries found for {mpid} in Open Catalyst project ===")?;
        writeln!(out, "Trying broader search with {fallback_formula}-containing materials...")?;

        let broad = Query::new().contains("formula", fallback_formula);
        match client.query_contributions(&broad, &FALLBACK_FIELDS, false) {
            Ok(found) => {
                writeln!(
                    out,
                    "Found {} {fallback_formula}-containing entries in Open Catalyst project",
                    found.len()
                )?;
                if found.is_empty() {
                    writeln!(out, "No {fallback_formula}-containing entries found")?;
                } else {
                    writeln!(out, "\n=== First {FALLBACK_DETAIL_LIMIT} {fallback_formula} entries ===")?;
                    for (i, rec) in found.iter().take(FALLBACK_DETAIL_LIMIT).enumerate() {
                        write_fallback_entry(out, fallback_formula, i + 1, rec)?;
                    }
                    records = found;
                    source = QuerySource::Fallback;
                }
            }
            Err(e) => {
                tracing::warn!("fallback query failed: {e}");
                writeln!(out, "Error in broader {fallback_formula} search: {e}")?;
            }
        }
    }

    if records.is_empty() {
        writeln!(out, "No data found")?;
        return Ok(None);
    }

    let table = TabularView::from_records(&records);
    write_table_summary(out, &table)?;
    tracing::debug!(rows = table.shape().0, ?source, "contribution table built");

    Ok(Some(ContributionSet {
        source,
        records,
        table,
    }))
}

fn text(v: Option<&str>) -> &str {
    v.unwrap_or(NA)
}

fn data_text(rec: &ContributionRecord, key: &str) -> String {
    rec.data_field(key)
        .map(ToString::to_string)
        .unwrap_or_else(|| NA.to_string())
}

fn write_precise_entry<W: Write>(out: &mut W, n: usize, rec: &ContributionRecord) -> Result<()> {
    writeln!(out, "\n--- Entry {n} ---")?;
    writeln!(out, "ID: {}", text(rec.id.as_deref()))?;
    writeln!(out, "Identifier: {}", text(rec.identifier.as_deref()))?;
    writeln!(out, "Formula: {}", text(rec.formula.as_deref()))?;
    if rec.data.is_some() {
        writeln!(out, "MPID: {}", data_text(rec, "mpid"))?;
        writeln!(out, "Adsorption Energy: {}", data_text(rec, "adsorptionEnergy"))?;
        writeln!(out, "Adsorbate SMILES: {}", data_text(rec, "adsorbateSmiles"))?;
        writeln!(out, "Adsorbate Formula: {}", data_text(rec, "adsorbateIUPACFormula"))?;
        writeln!(out, "Bulk Formula: {}", data_text(rec, "bulkFormula"))?;
        writeln!(out, "Surface Top: {}", data_text(rec, "surfaceTop"))?;
    }
    Ok(())
}

fn write_fallback_entry<W: Write>(
    out: &mut W,
    label: &str,
    n: usize,
    rec: &ContributionRecord,
) -> Result<()> {
    writeln!(out, "\n--- {label} Entry {n} ---")?;
    writeln!(out, "ID: {}", text(rec.id.as_deref()))?;
    writeln!(out, "Formula: {}", text(rec.formula.as_deref()))?;
    if rec.data.is_some() {
        writeln!(out, "MPID: {}", data_text(rec, "mpid"))?;
        writeln!(out, "Adsorption Energy: {}", data_text(rec, "adsorptionEnergy"))?;
        writeln!(out, "Adsorbate: {}", data_text(rec, "adsorbateSmiles"))?;
        writeln!(out, "Bulk Formula: {}", data_text(rec, "bulkFormula"))?;
    }
    Ok(())
}

fn write_table_summary<W: Write>(out: &mut W, table: &TabularView) -> Result<()> {
    let (rows, cols) = table.shape();
    writeln!(out, "\n=== Table shape: ({rows}, {cols}) ===")?;
    writeln!(out, "Column names:")?;
    writeln!(out, "{}", name_list(table.columns()))?;
    writeln!(out, "\nFirst few rows:")?;
    writeln!(out, "{}", table.head(HEAD_ROWS).render())?;

    let Some(data) = table.column("data") else {
        return Ok(());
    };
    if data.iter().all(|v| v.is_empty()) {
        writeln!(out, "Data column exists but contains no usable data")?;
        return Ok(());
    }
    match normalize(&data) {
        Ok(normalized) => {
            writeln!(out, "\n=== Normalized data columns: {} ===", name_list(normalized.columns()))?;
            writeln!(out, "Sample normalized data:")?;
            writeln!(out, "{}", normalized.head(HEAD_ROWS).render())?;
        }
        Err(e) => {
            tracing::warn!("{e}");
            writeln!(out, "Could not normalize data: {e}")?;
        }
    }
    Ok(())
}
