//! MPContribs client: contribution queries scoped to one project.

use reqwest::blocking::Client as HttpClient;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Result;
use crate::http::{build_http, get_json};
use crate::query::{Query, path_to_key};
use crate::url_builder::{contributions_url, project_url};
use crate::value::{FieldMap, FieldValue};

/// One contribution as returned by the server (after field projection).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContributionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<FieldValue>,
    /// Any other top-level fields the projection returned.
    #[serde(flatten)]
    pub extra: FieldMap,
}

impl ContributionRecord {
    /// Top-level fields in display order: id, identifier, formula, extras, data.
    pub fn top_level_fields(&self) -> Vec<(String, FieldValue)> {
        let mut out = Vec::new();
        for (k, v) in [
            ("id", &self.id),
            ("identifier", &self.identifier),
            ("formula", &self.formula),
        ] {
            if let Some(v) = v {
                out.push((k.to_string(), FieldValue::Str(v.clone())));
            }
        }
        for (k, v) in &self.extra {
            out.push((k.clone(), v.clone()));
        }
        if let Some(data) = &self.data {
            out.push(("data".to_string(), data.clone()));
        }
        out
    }

    /// Value under `data.<path>`, if present.
    pub fn data_field(&self, path: &str) -> Option<&FieldValue> {
        self.data.as_ref().and_then(|d| d.get_path(path))
    }
}

/// Contract the contribution fetcher needs from an MPContribs session.
pub trait ContributionsApi {
    /// Filter keys the project accepts.
    fn available_query_params(&self) -> Result<Vec<String>>;

    /// Run `query` with the given field projection. With `paginate == false`
    /// only the first page is returned.
    fn query_contributions(
        &self,
        query: &Query,
        fields: &[&str],
        paginate: bool,
    ) -> Result<Vec<ContributionRecord>>;
}

impl<T: ContributionsApi + ?Sized> ContributionsApi for &T {
    fn available_query_params(&self) -> Result<Vec<String>> {
        (**self).available_query_params()
    }

    fn query_contributions(
        &self,
        query: &Query,
        fields: &[&str],
        paginate: bool,
    ) -> Result<Vec<ContributionRecord>> {
        (**self).query_contributions(query, fields, paginate)
    }
}

#[derive(Debug, Deserialize)]
struct ContributionsPage {
    #[serde(default)]
    data: Vec<ContributionRecord>,
    #[serde(default)]
    total_pages: Option<usize>,
}

/// Column descriptor from `GET /projects/{name}?_fields=columns`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectColumn {
    pub path: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

impl ProjectColumn {
    fn is_numeric(&self) -> bool {
        self.min.is_some()
            || self.max.is_some()
            || self
                .unit
                .as_deref()
                .is_some_and(|u| !u.is_empty() && u != "NaN")
    }
}

#[derive(Debug, Deserialize)]
struct ProjectColumns {
    #[serde(default)]
    columns: Vec<ProjectColumn>,
}

const BASE_QUERY_PARAMS: [&str; 5] = [
    "formula__contains",
    "formula__exact",
    "id__in",
    "identifier__exact",
    "identifier__in",
];

const NUMERIC_OPS: [&str; 5] = ["exact", "gt", "gte", "lt", "lte"];
const STRING_OPS: [&str; 2] = ["exact", "contains"];

/// Filter keys derived from a project's column list, sorted.
pub fn query_params_from_columns(columns: &[ProjectColumn]) -> Vec<String> {
    let mut out: Vec<String> = BASE_QUERY_PARAMS.iter().map(|s| s.to_string()).collect();
    for col in columns.iter().filter(|c| c.path.starts_with("data.")) {
        let key = path_to_key(&col.path);
        if col.is_numeric() {
            for op in NUMERIC_OPS {
                out.push(format!("{key}__value__{op}"));
            }
        } else {
            for op in STRING_OPS {
                out.push(format!("{key}__{op}"));
            }
        }
    }
    out.sort();
    out.dedup();
    out
}

/// HTTP session against the MPContribs API for one project.
#[derive(Debug, Clone)]
pub struct ContribsClient {
    base_url: String,
    project: String,
    http: HttpClient,
}

impl ContribsClient {
    pub fn new(config: &Config, project: impl Into<String>) -> Result<Self> {
        let http = build_http("x-api-key", &config.api_key)?;
        Ok(Self {
            base_url: config.contribs_url.clone(),
            project: project.into(),
            http,
        })
    }
}

impl ContributionsApi for ContribsClient {
    fn available_query_params(&self) -> Result<Vec<String>> {
        let url = project_url(&self.base_url, &self.project, &["columns"])?;
        let resp: ProjectColumns = get_json(&self.http, url)?;
        Ok(query_params_from_columns(&resp.columns))
    }

    fn query_contributions(
        &self,
        query: &Query,
        fields: &[&str],
        paginate: bool,
    ) -> Result<Vec<ContributionRecord>> {
        let mut out = Vec::new();
        let mut page = 1;
        loop {
            let url = contributions_url(&self.base_url, &self.project, query, fields, page)?;
            let resp: ContributionsPage = get_json(&self.http, url)?;
            let n = resp.data.len();
            out.extend(resp.data);
            tracing::debug!(page, records = n, total_pages = ?resp.total_pages, "contributions page");

            if !paginate || n == 0 {
                break;
            }
            match resp.total_pages {
                Some(total) if page < total => page += 1,
                _ => break,
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::http::test_server::serve;

    #[test]
    fn record_parses_with_nested_data_and_extras() {
        let rec: ContributionRecord = serde_json::from_str(
            r#"{"id": "6123abc", "identifier": "mp-126", "formula": "Pt",
                "project": "open_catalyst_project",
                "data": {"mpid": "mp-126",
                         "adsorptionEnergy": {"display": "-0.42 eV", "value": -0.42, "unit": "eV"}}}"#,
        )
        .unwrap();
        assert_eq!(rec.id.as_deref(), Some("6123abc"));
        assert_eq!(
            rec.data_field("mpid"),
            Some(&FieldValue::Str("mp-126".into()))
        );
        assert_eq!(
            rec.data_field("adsorptionEnergy").map(ToString::to_string).as_deref(),
            Some("-0.42 eV")
        );
        assert_eq!(
            rec.extra.get("project"),
            Some(&FieldValue::Str("open_catalyst_project".into()))
        );

        let keys: Vec<String> = rec.top_level_fields().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["id", "identifier", "formula", "project", "data"]);
    }

    #[test]
    fn record_tolerates_missing_fields() {
        let rec: ContributionRecord = serde_json::from_str(r#"{"formula": "Pt3Ni", "data": null}"#).unwrap();
        assert_eq!(rec.id, None);
        assert_eq!(rec.data, None);
        assert!(rec.data_field("mpid").is_none());
        assert_eq!(rec.top_level_fields().len(), 1);
    }

    #[test]
    fn page_parses_total_pages() {
        let page: ContributionsPage = serde_json::from_str(
            r#"{"data": [{"id": "a"}, {"id": "b"}], "has_more": true, "total_count": 3, "total_pages": 2}"#,
        )
        .unwrap();
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.total_pages, Some(2));
    }

    #[test]
    fn query_params_follow_column_types() {
        let columns: ProjectColumns = serde_json::from_str(
            r#"{"columns": [
                {"path": "data.mpid", "unit": "NaN"},
                {"path": "data.adsorptionEnergy", "unit": "eV", "min": -3.1, "max": 2.0},
                {"path": "formula"}
            ]}"#,
        )
        .unwrap();
        let params = query_params_from_columns(&columns.columns);
        assert!(params.contains(&"data__mpid__exact".to_string()));
        assert!(params.contains(&"data__mpid__contains".to_string()));
        assert!(params.contains(&"data__adsorptionEnergy__value__lte".to_string()));
        assert!(!params.contains(&"data__adsorptionEnergy__contains".to_string()));
        assert!(params.contains(&"formula__contains".to_string()));
        let mut sorted = params.clone();
        sorted.sort();
        assert_eq!(params, sorted);
    }

    fn client_for(base: &str) -> ContribsClient {
        let cfg = Config::from_lookup(|k| match k {
            "MP_API_KEY" => Some("key".into()),
            "MPCONTRIBS_API_HOST" => Some(base.to_string()),
            _ => None,
        })
        .unwrap();
        ContribsClient::new(&cfg, "open_catalyst_project").unwrap()
    }

    const PAGE_1: &str = r#"{"data": [{"id": "a"}, {"id": "b"}], "total_pages": 2}"#;
    const PAGE_2: &str = r#"{"data": [{"id": "c"}], "total_pages": 2}"#;

    #[test]
    fn paginated_query_walks_all_pages() {
        let (base, server) = serve(vec![(200, PAGE_1), (200, PAGE_2)]);
        let client = client_for(&base);
        let q = Query::new().eq("data.mpid", "mp-126");
        let records = client.query_contributions(&q, &["id"], true).unwrap();
        let ids: Vec<_> = records.iter().filter_map(|r| r.id.as_deref()).collect();
        assert_eq!(ids, ["a", "b", "c"]);

        let seen = server.join().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].target.starts_with("/contributions/?project=open_catalyst_project&data__mpid=mp-126"));
        assert!(seen[0].target.ends_with("_page=1"));
        assert!(seen[1].target.ends_with("_page=2"));
    }

    #[test]
    fn unpaginated_query_reads_one_page() {
        let (base, server) = serve(vec![(200, PAGE_1)]);
        let client = client_for(&base);
        let records = client.query_contributions(&Query::new(), &["id"], false).unwrap();
        assert_eq!(records.len(), 2);

        let seen = server.join().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].target.ends_with("_limit=500&_page=1"));
    }

    #[test]
    fn rejected_query_is_api_error() {
        let (base, server) = serve(vec![(403, r#"{"error": "bad key"}"#)]);
        let client = client_for(&base);
        let err = client.query_contributions(&Query::new(), &["id"], false).unwrap_err();
        assert!(matches!(&err, Error::Api { status: 403, message } if message == "bad key"));
        assert!(!err.is_configuration());
        server.join().unwrap();
    }

    #[test]
    fn query_params_come_from_project_columns() {
        let (base, server) = serve(vec![(
            200,
            r#"{"columns": [{"path": "data.mpid", "unit": "NaN"}]}"#,
        )]);
        let params = client_for(&base).available_query_params().unwrap();
        assert!(params.contains(&"data__mpid__exact".to_string()));

        let seen = server.join().unwrap();
        assert_eq!(seen[0].target, "/projects/open_catalyst_project?_fields=columns");
    }
}
