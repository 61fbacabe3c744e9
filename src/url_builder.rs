use url::Url;

use crate::error::Result;
use crate::query::Query;

/// MPContribs never returns more than this many contributions per page.
pub const CONTRIBS_MAX_LIMIT: usize = 500;

pub const CONTRIBUTIONS_PATH: &str = "contributions/";
pub const PROJECTS_PATH: &str = "projects/";
pub const MATERIALS_CORE_PATH: &str = "materials/core/";
pub const MATERIALS_SUMMARY_PATH: &str = "materials/summary/";

fn join(base_url: &str, path: &str) -> Result<Url> {
    let base = format!("{}/", base_url.trim_end_matches('/'));
    Ok(Url::parse(&base)?.join(path)?)
}

/// `{base}/contributions/?project=..&<filters>&_fields=..&_limit=..&_page=..`
pub fn contributions_url(
    base_url: &str,
    project: &str,
    query: &Query,
    fields: &[&str],
    page: usize,
) -> Result<Url> {
    let mut url = join(base_url, CONTRIBUTIONS_PATH)?;
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("project", project);
        for (k, v) in query.iter() {
            pairs.append_pair(k, v);
        }
        if !fields.is_empty() {
            pairs.append_pair("_fields", &fields.join(","));
        }
        pairs.append_pair("_limit", &CONTRIBS_MAX_LIMIT.to_string());
        pairs.append_pair("_page", &page.to_string());
    }
    Ok(url)
}

/// `{base}/projects/{project}?_fields=..`
pub fn project_url(base_url: &str, project: &str, fields: &[&str]) -> Result<Url> {
    let mut url = join(base_url, PROJECTS_PATH)?.join(project)?;
    if !fields.is_empty() {
        url.query_pairs_mut().append_pair("_fields", &fields.join(","));
    }
    Ok(url)
}

/// `{endpoint}/materials/{core|summary}/?material_ids=..&_fields=..`
pub fn materials_url(endpoint: &str, path: &str, material_id: &str, fields: &[&str]) -> Result<Url> {
    let mut url = join(endpoint, path)?;
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("material_ids", material_id);
        if !fields.is_empty() {
            pairs.append_pair("_fields", &fields.join(","));
        }
    }
    Ok(url)
}
