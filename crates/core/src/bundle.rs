use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// FHIR Bundle types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum BundleType {
    Searchset,
    History,
    Collection,
    Document,
    Message,
    Transaction,
    TransactionResponse,
    Batch,
    BatchResponse,
    Subscription,
}

/// FHIR Bundle resource.
///
/// Entries default to raw JSON so the transport layer can stay
/// resource-agnostic; mappers decode into `Bundle<T>` for a typed view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bundle<R = JsonValue> {
    pub resource_type: String,

    #[serde(rename = "type")]
    pub bundle_type: BundleType,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub link: Vec<BundleLink>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entry: Vec<BundleEntry<R>>,
}

/// Link to related bundles (pagination)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BundleLink {
    pub relation: String,
    pub url: String,
}

/// Entry in a Bundle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntry<R = JsonValue> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<R>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<BundleEntrySearch>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<BundleEntryRequest>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<BundleEntryResponse>,
}

/// Search metadata on a searchset entry (`match` or `include`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BundleEntrySearch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

/// HTTP verb for transaction/batch entries
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

/// Request details of a transaction/batch entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BundleEntryRequest {
    pub method: HttpVerb,
    pub url: String,
}

/// Outcome of a single transaction/batch entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntryResponse {
    pub status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<JsonValue>,
}

impl<R> Bundle<R> {
    fn with_type(bundle_type: BundleType, entry: Vec<BundleEntry<R>>) -> Self {
        Self {
            resource_type: "Bundle".to_string(),
            bundle_type,
            total: None,
            link: Vec::new(),
            entry,
        }
    }

    /// Create a transaction bundle (all-or-nothing on the server)
    pub fn transaction(entry: Vec<BundleEntry<R>>) -> Self {
        Self::with_type(BundleType::Transaction, entry)
    }

    /// Create a batch bundle (entries processed independently)
    pub fn batch(entry: Vec<BundleEntry<R>>) -> Self {
        Self::with_type(BundleType::Batch, entry)
    }

    /// Create a searchset bundle
    pub fn searchset(total: u32, entry: Vec<BundleEntry<R>>) -> Self {
        let mut bundle = Self::with_type(BundleType::Searchset, entry);
        bundle.total = Some(total);
        bundle
    }

    /// Iterate over the resources of all entries that carry one
    pub fn resources(&self) -> impl Iterator<Item = &R> {
        self.entry.iter().filter_map(|e| e.resource.as_ref())
    }
}

impl<R> BundleEntry<R> {
    /// Plain entry holding a resource
    pub fn new(full_url: Option<String>, resource: R) -> Self {
        Self {
            full_url,
            resource: Some(resource),
            search: None,
            request: None,
            response: None,
        }
    }

    /// Transaction entry creating `resource` under `resource_type`
    pub fn create(resource_type: &str, resource: R) -> Self {
        let mut entry = Self::new(None, resource);
        entry.request = Some(BundleEntryRequest {
            method: HttpVerb::Post,
            url: resource_type.to_string(),
        });
        entry
    }

    /// Transaction entry replacing `<resource_type>/<id>` with `resource`
    pub fn update(resource_type: &str, id: &str, resource: R) -> Self {
        let mut entry = Self::new(None, resource);
        entry.request = Some(BundleEntryRequest {
            method: HttpVerb::Put,
            url: format!("{}/{}", resource_type, id),
        });
        entry
    }

    /// Transaction entry deleting `<resource_type>/<id>`
    pub fn delete(resource_type: &str, id: &str) -> Self {
        Self {
            full_url: None,
            resource: None,
            search: None,
            request: Some(BundleEntryRequest {
                method: HttpVerb::Delete,
                url: format!("{}/{}", resource_type, id),
            }),
            response: None,
        }
    }

    /// Whether the entry is a search match (entries without a mode count as matches)
    pub fn is_match(&self) -> bool {
        self.search
            .as_ref()
            .and_then(|s| s.mode.as_deref())
            .is_none_or(|mode| mode == "match")
    }
}
