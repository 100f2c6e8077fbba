//! FHIR search parameter and sort translation

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Sort direction of a list column
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortDirection {
    type Err = std::convert::Infallible;

    /// `"desc"` (any case) is descending; anything else is ascending
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("desc") {
            Ok(SortDirection::Desc)
        } else {
            Ok(SortDirection::Asc)
        }
    }
}

/// Ordered FHIR search parameters (`key=value` pairs, keys may repeat)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchParams(Vec<(String, String)>);

impl SearchParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter unconditionally
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    /// Append a parameter when the value is present and not blank
    pub fn push_opt(&mut self, key: &str, value: Option<&str>) {
        if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
            self.push(key, value);
        }
    }

    /// Builder-style [`SearchParams::push`]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(key, value);
        self
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }

    /// First value for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn extend(&mut self, other: SearchParams) {
        self.0.extend(other.0);
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SearchParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl IntoIterator for SearchParams {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Translate application sort fields into FHIR `_sort` tokens.
///
/// Fields and directions are zipped by position; missing directions are
/// ascending. Fields found in `field_map` are renamed, others pass
/// through unchanged. Descending tokens get a `-` prefix.
pub fn to_sort_fields<S: AsRef<str>>(
    fields: &[S],
    directions: &[SortDirection],
    field_map: &[(&str, &str)],
) -> Vec<String> {
    fields
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let field = field.as_ref();
            let name = field_map
                .iter()
                .find(|(app, _)| *app == field)
                .map(|(_, wire)| *wire)
                .unwrap_or(field);

            match directions.get(i).copied().unwrap_or_default() {
                SortDirection::Asc => name.to_string(),
                SortDirection::Desc => format!("-{}", name),
            }
        })
        .collect()
}
