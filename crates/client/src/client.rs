//! Generic FHIR REST client
//!
//! Resource-agnostic: bodies go in and come out as raw JSON. Every failure
//! is returned as a [`ClientError`]; no retries happen here.

use std::collections::HashMap;
use std::sync::Arc;

use emr_core::{Bundle, BundleType, SearchParams, parse_reference, reference_type};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::auth::{self, CredentialStore, FileCredentialStore};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::transport::{
    HttpRequest, HttpResponse, Method, REQUEST_ID_HEADER, ReqwestTransport, Transport,
};

pub const FHIR_JSON: &str = "application/fhir+json";
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Paged, sorted and filtered search against one resource type
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchRequest {
    pub resource_type: String,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub filters: SearchParams,
    /// `_sort` tokens, already prefixed with `-` for descending
    pub sort_fields: Vec<String>,
    /// `_elements` to return
    pub result_fields: Vec<String>,
}

impl SearchRequest {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            ..Default::default()
        }
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn filters(mut self, filters: SearchParams) -> Self {
        self.filters.extend(filters);
        self
    }

    pub fn filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push(key, value);
        self
    }

    pub fn sort(mut self, sort_fields: Vec<String>) -> Self {
        self.sort_fields = sort_fields;
        self
    }

    pub fn elements(mut self, result_fields: Vec<String>) -> Self {
        self.result_fields = result_fields;
        self
    }

    /// Search parameters in wire order
    pub fn to_params(&self) -> SearchParams {
        let mut params = SearchParams::new();

        if let Some(count) = self.page_size {
            params.push("_count", count.to_string());
        }
        if let (Some(page), Some(count)) = (self.page, self.page_size) {
            params.push("_skip", (u64::from(page) * u64::from(count)).to_string());
        }
        params.extend(self.filters.clone());
        if !self.sort_fields.is_empty() {
            params.push("_sort", self.sort_fields.join(","));
        }
        if !self.result_fields.is_empty() {
            params.push("_elements", self.result_fields.join(","));
        }
        params.push("_total", "accurate");

        params
    }

    /// `application/x-www-form-urlencoded` body for `POST <type>/_search`
    pub fn to_form_body(&self) -> String {
        self.to_params()
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Matched entries of a searchset and its total
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult<R = JsonValue> {
    pub entries: Vec<R>,
    pub total: u32,
}

/// Read of one resource, optionally with references resolved inline
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadRequest {
    pub resource_type: String,
    pub resource_id: String,
    /// Dotted element paths whose references are replaced by the resource
    /// they point at, e.g. `subject` or `participant.actor`
    pub resolve_references: Vec<String>,
}

impl ReadRequest {
    pub fn new(resource_type: impl Into<String>, resource_id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
            resolve_references: Vec::new(),
        }
    }

    pub fn resolve(mut self, path: impl Into<String>) -> Self {
        self.resolve_references.push(path.into());
        self
    }

    /// `_include` values, one per distinct search parameter
    fn includes(&self) -> Vec<String> {
        let mut includes: Vec<String> = Vec::new();
        for path in &self.resolve_references {
            let element = path.split('.').next().unwrap_or(path);
            let param = include_param(&self.resource_type, element);
            let include = format!("{}:{}", self.resource_type, param);
            if !includes.contains(&include) {
                includes.push(include);
            }
        }
        includes
    }
}

/// Elements whose reference search parameter is not named after them
const INCLUDE_PARAMS: &[(&str, &str, &str)] = &[
    ("Appointment", "participant", "actor"),
    ("Location", "managingOrganization", "organization"),
    ("Location", "partOf", "partof"),
    ("Patient", "managingOrganization", "organization"),
];

/// Search parameter for a top-level reference element: an explicit
/// override, otherwise the element name in kebab case
/// (`generalPractitioner` → `general-practitioner`)
fn include_param(resource_type: &str, element: &str) -> String {
    if let Some((_, _, param)) = INCLUDE_PARAMS
        .iter()
        .find(|(rt, el, _)| *rt == resource_type && *el == element)
    {
        return (*param).to_string();
    }

    let mut param = String::with_capacity(element.len() + 4);
    for c in element.chars() {
        if c.is_ascii_uppercase() {
            param.push('-');
            param.push(c.to_ascii_lowercase());
        } else {
            param.push(c);
        }
    }
    param
}

/// Low-level FHIR client: builds requests, attaches credentials and
/// unwraps response bodies
#[derive(Clone)]
pub struct FhirClient {
    transport: Arc<dyn Transport>,
    api_key: Option<String>,
    credentials: Option<Arc<dyn CredentialStore>>,
    storage_key: Option<String>,
}

impl FhirClient {
    /// Client over HTTP, reading session users from the configured store file
    pub fn new(config: &ClientConfig) -> Self {
        let transport = Arc::new(ReqwestTransport::new(config.base_url.clone()));
        let client = Self::with_transport(config, transport);

        match &config.session_store_path {
            Some(path) => client.with_credential_store(Arc::new(FileCredentialStore::new(path))),
            None => client,
        }
    }

    /// Client over an arbitrary transport
    pub fn with_transport(config: &ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            api_key: config.api_key.clone(),
            credentials: None,
            storage_key: config.auth.as_ref().map(|auth| auth.storage_key()),
        }
    }

    pub fn with_credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.credentials = Some(store);
        self
    }

    fn headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![
            ("Accept".to_string(), FHIR_JSON.to_string()),
            (REQUEST_ID_HEADER.to_string(), Uuid::new_v4().to_string()),
        ];

        if let Some(key) = &self.api_key {
            headers.push(("x-api-key".to_string(), key.clone()));
        }

        let token = match (&self.credentials, &self.storage_key) {
            (Some(store), Some(key)) => auth::bearer_token(store.as_ref(), key),
            _ => None,
        };
        if let Some(token) = token {
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }

        headers
    }

    fn request(&self, method: Method, path: impl Into<String>) -> HttpRequest {
        let mut request = HttpRequest::new(method, path);
        request.headers = self.headers();
        request
    }

    fn with_json_body(
        mut request: HttpRequest,
        body: &impl serde::Serialize,
    ) -> Result<HttpRequest, ClientError> {
        request
            .headers
            .push(("Content-Type".to_string(), FHIR_JSON.to_string()));
        request.body = Some(serde_json::to_string(body)?);
        Ok(request)
    }

    /// Execute a request, turning non-2xx responses into errors
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ClientError> {
        let method = request.method;
        let path = request.path.clone();
        tracing::debug!(
            %method,
            path = %path,
            request_id = request.header(REQUEST_ID_HEADER).unwrap_or_default(),
            "FHIR request"
        );

        let response = self.transport.execute(request).await?;
        if !response.is_success() {
            let err = ClientError::from_status(response.status, &response.body);
            tracing::warn!(
                %method,
                path = %path,
                status = response.status,
                error = %err,
                "FHIR request failed"
            );
            return Err(err);
        }

        Ok(response)
    }

    /// Search `<type>` with a form-encoded `POST <type>/_search`
    pub async fn search(&self, search: &SearchRequest) -> Result<SearchResult, ClientError> {
        let mut request = self.request(Method::Post, format!("{}/_search", search.resource_type));
        request
            .headers
            .push(("Content-Type".to_string(), FORM_URLENCODED.to_string()));
        request.body = Some(search.to_form_body());

        let response = self.send(request).await?;
        let bundle: Bundle = decode(&response.body)?;

        let entries: Vec<JsonValue> = bundle
            .entry
            .into_iter()
            .filter(|entry| entry.is_match())
            .filter_map(|entry| entry.resource)
            .collect();
        let total = bundle.total.unwrap_or(entries.len() as u32);

        Ok(SearchResult { entries, total })
    }

    /// Read one resource
    pub async fn get_by_id(&self, read: &ReadRequest) -> Result<JsonValue, ClientError> {
        if read.resolve_references.is_empty() {
            let path = format!("{}/{}", read.resource_type, read.resource_id);
            let response = self.send(self.request(Method::Get, path)).await?;
            return decode(&response.body);
        }

        let mut request = self.request(Method::Get, read.resource_type.clone());
        request
            .query
            .push(("_id".to_string(), read.resource_id.clone()));
        for include in read.includes() {
            request.query.push(("_include".to_string(), include));
        }

        let response = self.send(request).await?;
        let bundle: Bundle = decode(&response.body)?;

        let mut matched = None;
        let mut included = HashMap::new();
        for entry in bundle.entry {
            let is_match = entry.is_match();
            let Some(resource) = entry.resource else {
                continue;
            };
            if is_match && matched.is_none() {
                matched = Some(resource);
            } else if let Some(key) = resource_key(&resource) {
                included.insert(key, resource);
            }
        }

        let mut resource = matched.ok_or_else(|| {
            ClientError::NotFound(format!("{}/{}", read.resource_type, read.resource_id))
        })?;
        for path in &read.resolve_references {
            let segments: Vec<&str> = path.split('.').collect();
            inline_references(&mut resource, &segments, &included);
        }

        Ok(resource)
    }

    /// Create a resource; the server assigns its id
    pub async fn create(&self, resource: JsonValue) -> Result<JsonValue, ClientError> {
        let resource_type = resource_type_of(&resource)?;
        let mut request =
            Self::with_json_body(self.request(Method::Post, resource_type), &resource)?;
        request
            .headers
            .push(("Prefer".to_string(), "return=representation".to_string()));

        let response = self.send(request).await?;
        if !response.body.iter().all(u8::is_ascii_whitespace) {
            return decode(&response.body);
        }

        // Server answered without a body; echo the submitted resource
        let mut created = resource;
        if let (Some(location), JsonValue::Object(fields)) = (&response.location, &mut created) {
            let id = id_from_location(location);
            if !id.is_empty() {
                fields.insert("id".to_string(), JsonValue::String(id.to_string()));
            }
        }
        Ok(created)
    }

    /// Replace a resource; it must carry an id
    pub async fn update(&self, resource: JsonValue) -> Result<JsonValue, ClientError> {
        let resource_type = resource_type_of(&resource)?;
        let id = resource
            .get("id")
            .and_then(JsonValue::as_str)
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                ClientError::InvalidRequest(format!("{resource_type} update requires an id"))
            })?
            .to_string();

        let request = Self::with_json_body(
            self.request(Method::Put, format!("{resource_type}/{id}")),
            &resource,
        )?;

        let response = self.send(request).await?;
        if response.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(resource);
        }
        decode(&response.body)
    }

    /// Delete a resource; any 2xx counts as success
    pub async fn delete(&self, resource_type: &str, resource_id: &str) -> Result<(), ClientError> {
        if resource_id.trim().is_empty() {
            return Err(ClientError::InvalidRequest(format!(
                "{resource_type} delete requires an id"
            )));
        }

        let path = format!("{resource_type}/{resource_id}");
        self.send(self.request(Method::Delete, path)).await?;
        Ok(())
    }

    /// Submit a transaction or batch bundle to the base URL
    pub async fn post_bundle(&self, bundle: &Bundle) -> Result<Bundle, ClientError> {
        if !matches!(bundle.bundle_type, BundleType::Transaction | BundleType::Batch) {
            return Err(ClientError::InvalidRequest(
                "Only transaction and batch bundles can be posted".to_string(),
            ));
        }

        let request = Self::with_json_body(self.request(Method::Post, ""), bundle)?;
        let response = self.send(request).await?;
        decode(&response.body)
    }
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, ClientError> {
    Ok(serde_json::from_slice(body)?)
}

fn resource_type_of(resource: &JsonValue) -> Result<String, ClientError> {
    resource
        .get("resourceType")
        .and_then(JsonValue::as_str)
        .map(str::to_string)
        .ok_or_else(|| ClientError::InvalidRequest("Resource has no resourceType".to_string()))
}

/// `"<type>/<id>"` of a resource
fn resource_key(resource: &JsonValue) -> Option<String> {
    let resource_type = resource.get("resourceType")?.as_str()?;
    let id = resource.get("id")?.as_str()?;
    Some(format!("{resource_type}/{id}"))
}

/// Id from a `Location` header such as `<base>/Patient/123/_history/1`
pub fn id_from_location(location: &str) -> &str {
    parse_reference(location)
}

/// Replace `{reference}` values reached by `path` with included resources.
/// Arrays are traversed at every level; unknown references are left alone.
fn inline_references(value: &mut JsonValue, path: &[&str], included: &HashMap<String, JsonValue>) {
    match value {
        JsonValue::Array(items) => {
            for item in items {
                inline_references(item, path, included);
            }
        }
        JsonValue::Object(fields) => {
            let Some((head, rest)) = path.split_first() else {
                return;
            };
            let Some(child) = fields.get_mut(*head) else {
                return;
            };

            if !rest.is_empty() {
                inline_references(child, rest, included);
                return;
            }

            match child {
                JsonValue::Array(items) => {
                    for item in items {
                        inline_one(item, included);
                    }
                }
                other => inline_one(other, included),
            }
        }
        _ => {}
    }
}

fn inline_one(value: &mut JsonValue, included: &HashMap<String, JsonValue>) {
    let Some(reference) = value.get("reference").and_then(JsonValue::as_str) else {
        return;
    };
    let Some(resource_type) = reference_type(reference) else {
        return;
    };
    let key = format!("{}/{}", resource_type, parse_reference(reference));

    if let Some(resource) = included.get(&key) {
        *value = resource.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn form_body_follows_search_grammar_order() {
        let search = SearchRequest::new("Condition")
            .page(2)
            .page_size(20)
            .filter("patient", "42")
            .sort(vec!["-recorded-date".to_string(), "code".to_string()])
            .elements(vec!["id".to_string(), "code".to_string()]);

        assert_eq!(
            search.to_form_body(),
            "_count=20&_skip=40&patient=42&_sort=-recorded-date%2Ccode&_elements=id%2Ccode&_total=accurate"
        );
    }

    #[test]
    fn skip_needs_both_page_and_size() {
        let search = SearchRequest::new("Patient").page(3);
        assert_eq!(search.to_form_body(), "_total=accurate");
    }

    #[test]
    fn filter_values_are_percent_encoded() {
        let search = SearchRequest::new("Patient").filter("name", "Tan Ah Kow&co");
        assert_eq!(search.to_form_body(), "name=Tan%20Ah%20Kow%26co&_total=accurate");
    }

    #[test]
    fn includes_are_deduplicated_top_level_elements() {
        let read = ReadRequest::new("Encounter", "e1")
            .resolve("participant.actor")
            .resolve("subject")
            .resolve("participant.individual");
        assert_eq!(read.includes(), vec!["Encounter:participant", "Encounter:subject"]);
    }

    #[test]
    fn includes_use_search_parameter_names() {
        let read = ReadRequest::new("Appointment", "a1").resolve("participant.actor");
        assert_eq!(read.includes(), vec!["Appointment:actor"]);

        let read = ReadRequest::new("Patient", "p1")
            .resolve("generalPractitioner")
            .resolve("managingOrganization");
        assert_eq!(
            read.includes(),
            vec!["Patient:general-practitioner", "Patient:organization"]
        );
    }

    #[test]
    fn references_are_inlined_through_arrays() {
        let mut encounter = json!({
            "resourceType": "Encounter",
            "subject": {"reference": "Patient/42"},
            "participant": [
                {"actor": {"reference": "Practitioner/7"}},
                {"actor": {"reference": "Practitioner/unknown"}}
            ]
        });
        let included = HashMap::from([
            ("Patient/42".to_string(), json!({"resourceType": "Patient", "id": "42"})),
            ("Practitioner/7".to_string(), json!({"resourceType": "Practitioner", "id": "7"})),
        ]);

        inline_references(&mut encounter, &["subject"], &included);
        inline_references(&mut encounter, &["participant", "actor"], &included);

        assert_eq!(encounter["subject"]["resourceType"], "Patient");
        assert_eq!(encounter["participant"][0]["actor"]["id"], "7");
        assert_eq!(
            encounter["participant"][1]["actor"],
            json!({"reference": "Practitioner/unknown"})
        );
    }

    #[test]
    fn location_header_yields_id() {
        assert_eq!(
            id_from_location("http://fhir.test/r5/Patient/123/_history/1"),
            "123"
        );
        assert_eq!(id_from_location("Patient/9"), "9");
    }
}
