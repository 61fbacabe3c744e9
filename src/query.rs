use std::collections::BTreeMap;

/// MPContribs filter expressed as keyword/value pairs.
///
/// Keys follow the server's filter syntax: a dotted field path with `.`
/// replaced by `__`, optionally suffixed by an operator
/// (`data__mpid`, `formula__contains`, `data__adsorptionEnergy__value__lt`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub(crate) inner: BTreeMap<String, String>,
}

impl Query {
    pub fn new() -> Self {
        Self {
            inner: BTreeMap::new(),
        }
    }

    /// Insert a raw keyword/value pair.
    pub fn kw(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.inner.insert(key.into(), value.into());
        self
    }

    /// Equality on a dotted field path, e.g. `eq("data.mpid", "mp-126")`.
    pub fn eq(self, path: &str, value: impl Into<String>) -> Self {
        self.kw(path_to_key(path), value)
    }

    /// Substring match on a dotted field path.
    pub fn contains(self, path: &str, value: impl Into<String>) -> Self {
        self.kw(format!("{}__contains", path_to_key(path)), value)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.inner.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.inner.iter()
    }
}

/// `data.adsorptionEnergy` -> `data__adsorptionEnergy`.
pub fn path_to_key(path: &str) -> String {
    path.split('.')
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("__")
}
