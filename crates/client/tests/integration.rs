//! Integration tests for the FHIR client stack.
//!
//! A scripted in-process transport records every request and answers from
//! a queue, so these tests exercise request building, credentials, error
//! boxing and cache invalidation without a network.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value as JsonValue, json};

use emr_client::{
    AuthConfig, ClientConfig, ClientError, FhirApi, FhirClient, HttpRequest, HttpResponse,
    ListRequest, MemoryCredentialStore, Method, QueryErrorKind, QueryResult, ReadRequest,
    SearchRequest, Services, Transport,
};
use emr_core::resources::{ConditionFilters, ConditionRecord, PatientFilters, PatientRecord};
use emr_core::{Bundle, BundleEntry, SortDirection};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const BASE_URL: &str = "http://fhir.test/r5";
const TEST_API_KEY: &str = "test-secret-key";

/// Transport that records requests and replays scripted responses
#[derive(Default)]
struct ScriptedTransport {
    requests: Mutex<Vec<HttpRequest>>,
    responses: Mutex<VecDeque<Result<HttpResponse, ClientError>>>,
}

impl ScriptedTransport {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn respond(&self, status: u16, body: JsonValue) {
        self.responses.lock().unwrap().push_back(Ok(HttpResponse {
            status,
            location: None,
            body: serde_json::to_vec(&body).unwrap(),
        }));
    }

    fn respond_raw(&self, response: HttpResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    fn fail(&self, err: ClientError) {
        self.responses.lock().unwrap().push_back(Err(err));
    }

    fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn last_request(&self) -> HttpRequest {
        self.requests().pop().expect("No request was sent")
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ClientError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::Network("No scripted response".to_string())))
    }
}

fn test_client(transport: &Arc<ScriptedTransport>) -> FhirClient {
    FhirClient::with_transport(&ClientConfig::new(BASE_URL), transport.clone())
}

fn searchset(resources: Vec<JsonValue>) -> JsonValue {
    let entries: Vec<JsonValue> = resources
        .iter()
        .map(|r| json!({"resource": r, "search": {"mode": "match"}}))
        .collect();
    json!({
        "resourceType": "Bundle",
        "type": "searchset",
        "total": resources.len(),
        "entry": entries
    })
}

fn patient_json(id: &str, family: &str) -> JsonValue {
    json!({
        "resourceType": "Patient",
        "id": id,
        "name": [{"family": family, "given": ["Mei Ling"]}],
        "gender": "female"
    })
}

// ---------------------------------------------------------------------------
// Generic FHIR client
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_search_posts_form_encoded_body() {
    let transport = ScriptedTransport::new();
    transport.respond(200, searchset(vec![patient_json("42", "Tan")]));
    let client = test_client(&transport);

    let search = SearchRequest::new("Patient")
        .page(1)
        .page_size(10)
        .filter("identifier", "S1234567D");
    let result = client.search(&search).await.unwrap();

    assert_eq!(result.total, 1);
    assert_eq!(result.entries[0]["id"], "42");

    let request = transport.last_request();
    assert_eq!(request.method, Method::Post);
    assert_eq!(request.path, "Patient/_search");
    assert_eq!(
        request.header("Content-Type"),
        Some("application/x-www-form-urlencoded")
    );
    assert_eq!(request.header("Accept"), Some("application/fhir+json"));
    assert!(
        request
            .body
            .as_deref()
            .unwrap()
            .contains("_count=10&_skip=10&identifier=S1234567D&_total=accurate")
    );
}

#[tokio::test]
async fn test_search_without_entries_is_empty() {
    let transport = ScriptedTransport::new();
    transport.respond(200, json!({"resourceType": "Bundle", "type": "searchset", "total": 0}));
    let client = test_client(&transport);

    let result = client.search(&SearchRequest::new("Condition")).await.unwrap();
    assert!(result.entries.is_empty());
    assert_eq!(result.total, 0);
}

#[tokio::test]
async fn test_credentials_are_attached_when_configured() {
    let transport = ScriptedTransport::new();
    transport.respond(200, patient_json("42", "Tan"));

    let auth = AuthConfig::new("https://id.example.org", "emr-web");
    let store = Arc::new(MemoryCredentialStore::new());
    store.set_item(auth.storage_key(), r#"{"access_token":"tok-123"}"#);

    let config = ClientConfig::new(BASE_URL)
        .with_api_key(TEST_API_KEY)
        .with_auth(auth);
    let client = FhirClient::with_transport(&config, transport.clone()).with_credential_store(store);

    client.get_by_id(&ReadRequest::new("Patient", "42")).await.unwrap();

    let request = transport.last_request();
    assert_eq!(request.method, Method::Get);
    assert_eq!(request.path, "Patient/42");
    assert_eq!(request.header("x-api-key"), Some(TEST_API_KEY));
    assert_eq!(request.header("Authorization"), Some("Bearer tok-123"));

    let request_id = request.header("X-Request-ID").unwrap();
    assert!(uuid::Uuid::parse_str(request_id).is_ok());
}

#[tokio::test]
async fn test_missing_credentials_fail_open() {
    let transport = ScriptedTransport::new();
    transport.respond(200, patient_json("42", "Tan"));

    // Auth configured but the store holds no session user
    let config = ClientConfig::new(BASE_URL).with_auth(AuthConfig::new("a", "c"));
    let client = FhirClient::with_transport(&config, transport.clone())
        .with_credential_store(Arc::new(MemoryCredentialStore::new()));

    client.get_by_id(&ReadRequest::new("Patient", "42")).await.unwrap();

    let request = transport.last_request();
    assert_eq!(request.header("x-api-key"), None);
    assert_eq!(request.header("Authorization"), None);
}

#[tokio::test]
async fn test_non_2xx_becomes_status_error() {
    let transport = ScriptedTransport::new();
    transport.respond(
        404,
        json!({
            "resourceType": "OperationOutcome",
            "issue": [{"severity": "error", "code": "not-found", "diagnostics": "Patient/99 not found"}]
        }),
    );
    let client = test_client(&transport);

    let err = client
        .get_by_id(&ReadRequest::new("Patient", "99"))
        .await
        .unwrap_err();

    match err {
        ClientError::Status {
            status,
            message,
            outcome,
        } => {
            assert_eq!(status, 404);
            assert_eq!(message, "Patient/99 not found");
            assert!(outcome.is_some());
        }
        other => panic!("Expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_get_resolves_references_inline() {
    let transport = ScriptedTransport::new();
    transport.respond(
        200,
        json!({
            "resourceType": "Bundle",
            "type": "searchset",
            "entry": [
                {
                    "resource": {
                        "resourceType": "Encounter",
                        "id": "e1",
                        "subject": {"reference": "Patient/42"},
                        "participant": [{"actor": {"reference": "Practitioner/7"}}]
                    },
                    "search": {"mode": "match"}
                },
                {"resource": patient_json("42", "Tan"), "search": {"mode": "include"}},
                {
                    "resource": {"resourceType": "Practitioner", "id": "7"},
                    "search": {"mode": "include"}
                }
            ]
        }),
    );
    let client = test_client(&transport);

    let read = ReadRequest::new("Encounter", "e1")
        .resolve("subject")
        .resolve("participant.actor");
    let encounter = client.get_by_id(&read).await.unwrap();

    assert_eq!(encounter["subject"]["name"][0]["family"], "Tan");
    assert_eq!(encounter["participant"][0]["actor"]["resourceType"], "Practitioner");

    let request = transport.last_request();
    assert_eq!(request.path, "Encounter");
    assert_eq!(
        request.query,
        vec![
            ("_id".to_string(), "e1".to_string()),
            ("_include".to_string(), "Encounter:subject".to_string()),
            ("_include".to_string(), "Encounter:participant".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_get_with_references_and_no_match_is_not_found() {
    let transport = ScriptedTransport::new();
    transport.respond(200, json!({"resourceType": "Bundle", "type": "searchset", "total": 0}));
    let client = test_client(&transport);

    let read = ReadRequest::new("Encounter", "missing").resolve("subject");
    let err = client.get_by_id(&read).await.unwrap_err();
    assert!(matches!(err, ClientError::NotFound(_)));
}

#[tokio::test]
async fn test_create_without_body_uses_location_header() {
    let transport = ScriptedTransport::new();
    transport.respond_raw(HttpResponse {
        status: 201,
        location: Some(format!("{BASE_URL}/Patient/123/_history/1")),
        body: Vec::new(),
    });
    let client = test_client(&transport);

    let created = client
        .create(json!({"resourceType": "Patient", "gender": "male"}))
        .await
        .unwrap();

    assert_eq!(created["id"], "123");
    assert_eq!(created["gender"], "male");

    let request = transport.last_request();
    assert_eq!(request.method, Method::Post);
    assert_eq!(request.path, "Patient");
    assert_eq!(request.header("Prefer"), Some("return=representation"));
    assert_eq!(request.header("Content-Type"), Some("application/fhir+json"));
}

#[tokio::test]
async fn test_update_requires_id() {
    let transport = ScriptedTransport::new();
    let client = test_client(&transport);

    let err = client
        .update(json!({"resourceType": "Patient", "gender": "male"}))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::InvalidRequest(_)));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_delete_accepts_no_content() {
    let transport = ScriptedTransport::new();
    transport.respond_raw(HttpResponse {
        status: 204,
        location: None,
        body: Vec::new(),
    });
    let client = test_client(&transport);

    client.delete("Condition", "c1").await.unwrap();

    let request = transport.last_request();
    assert_eq!(request.method, Method::Delete);
    assert_eq!(request.path, "Condition/c1");
}

#[tokio::test]
async fn test_post_bundle_goes_to_base_url() {
    let transport = ScriptedTransport::new();
    transport.respond(
        200,
        json!({
            "resourceType": "Bundle",
            "type": "transaction-response",
            "entry": [
                {"response": {"status": "201 Created", "location": "Patient/5/_history/1"}},
                {"response": {"status": "204 No Content"}}
            ]
        }),
    );
    let client = test_client(&transport);

    let bundle: Bundle = Bundle::transaction(vec![
        BundleEntry::create("Patient", patient_json("", "Lim")),
        BundleEntry::delete("Condition", "c1"),
    ]);
    let response = client.post_bundle(&bundle).await.unwrap();
    assert_eq!(response.entry.len(), 2);

    let request = transport.last_request();
    assert_eq!(request.path, "");
    let body: JsonValue = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
    assert_eq!(body["type"], "transaction");
    assert_eq!(body["entry"][1]["request"]["method"], "DELETE");
}

// ---------------------------------------------------------------------------
// Cache-integration client
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_transport_failure_is_boxed() {
    let transport = ScriptedTransport::new();
    transport.fail(ClientError::Network("connection refused".to_string()));
    let api = FhirApi::new(test_client(&transport));

    let result = api
        .search(&SearchRequest::new("Patient"), |found| Ok(found.entries.len()))
        .await;

    let err = result.error().expect("Expected an error envelope");
    assert_eq!(err.kind, QueryErrorKind::Transport);
    assert!(err.message.contains("connection refused"));
}

#[tokio::test]
async fn test_mapping_failure_is_boxed() {
    let transport = ScriptedTransport::new();
    transport.respond(200, json!({"resourceType": "Condition", "id": "c1"}));
    let api = FhirApi::new(test_client(&transport));

    let result = api
        .get_by_id(&ReadRequest::new("Patient", "c1"), |value| {
            emr_core::resource::from_json::<emr_core::resources::Patient>(value)
        })
        .await;

    assert_eq!(result.error().unwrap().kind, QueryErrorKind::Mapping);
}

#[tokio::test]
async fn test_malformed_json_is_boxed() {
    let transport = ScriptedTransport::new();
    transport.respond_raw(HttpResponse {
        status: 200,
        location: None,
        body: b"<html>gateway</html>".to_vec(),
    });
    let api = FhirApi::new(test_client(&transport));

    let result = api
        .get_by_id(&ReadRequest::new("Patient", "1"), Ok)
        .await;

    assert_eq!(result.error().unwrap().kind, QueryErrorKind::Decode);
}

// ---------------------------------------------------------------------------
// Services and cache invalidation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_patient_list_prefers_mrn_over_search() {
    let transport = ScriptedTransport::new();
    transport.respond(200, searchset(vec![patient_json("42", "Tan")]));
    let services = Services::with_client(test_client(&transport));

    let request = ListRequest {
        page: Some(0),
        page_size: Some(10),
        filters: PatientFilters {
            search: Some("tan".to_string()),
            mrn: Some("S1234567D".to_string()),
            ..Default::default()
        },
        sort_fields: vec!["birthDate".to_string()],
        sort_directions: vec![SortDirection::Desc],
        result_fields: Vec::new(),
    };
    let page = services.patients.list(&request).await.into_result().unwrap();

    assert_eq!(page.total, 1);
    assert_eq!(page.data[0].family_name, "Tan");

    let body = transport.last_request().body.unwrap();
    assert!(body.contains("identifier=S1234567D"));
    assert!(!body.contains("name="));
    assert!(body.contains("_sort=-birthdate"));
}

#[tokio::test]
async fn test_list_is_cached_until_create() {
    let transport = ScriptedTransport::new();
    transport.respond(200, searchset(vec![patient_json("42", "Tan")]));
    transport.respond(201, patient_json("43", "Lim"));
    transport.respond(200, searchset(vec![patient_json("42", "Tan"), patient_json("43", "Lim")]));
    let services = Services::with_client(test_client(&transport));

    let request = ListRequest::<PatientFilters>::default();
    let first = services.patients.list(&request).await;
    let second = services.patients.list(&request).await;
    assert_eq!(first, second);
    assert_eq!(transport.requests().len(), 1);

    let created = services
        .patients
        .create(&PatientRecord {
            family_name: "Lim".to_string(),
            ..Default::default()
        })
        .await;
    assert_eq!(created.data().unwrap().id.as_deref(), Some("43"));

    let create_body: JsonValue =
        serde_json::from_str(transport.last_request().body.as_deref().unwrap()).unwrap();
    assert!(create_body.get("id").is_none());

    let third = services.patients.list(&request).await;
    assert_eq!(transport.requests().len(), 3);
    assert_eq!(third.data().unwrap().data.len(), 2);
}

#[tokio::test]
async fn test_update_invalidates_the_record() {
    let transport = ScriptedTransport::new();
    let condition = json!({
        "resourceType": "Condition",
        "id": "c1",
        "clinicalStatus": {"coding": [{"code": "active"}]},
        "subject": {"reference": "Patient/42"}
    });
    transport.respond(200, condition.clone());
    transport.respond(200, json!({
        "resourceType": "Condition",
        "id": "c1",
        "clinicalStatus": {"coding": [{"code": "resolved"}]},
        "subject": {"reference": "Patient/42"}
    }));
    transport.respond(200, condition);
    let services = Services::with_client(test_client(&transport));

    let record = services.conditions.get("c1").await.into_result().unwrap();
    services.conditions.get("c1").await.into_result().unwrap();
    assert_eq!(transport.requests().len(), 1);

    let updated = services
        .conditions
        .update(&ConditionRecord {
            clinical_status: "resolved".to_string(),
            ..record
        })
        .await;
    assert_eq!(updated.data().unwrap().clinical_status, "resolved");

    let request = transport.last_request();
    assert_eq!(request.method, Method::Put);
    assert_eq!(request.path, "Condition/c1");

    services.conditions.get("c1").await;
    assert_eq!(transport.requests().len(), 3);
}

#[tokio::test]
async fn test_update_without_id_is_a_mapping_error() {
    let transport = ScriptedTransport::new();
    let services = Services::with_client(test_client(&transport));

    let result = services
        .conditions
        .update(&ConditionRecord::default())
        .await;

    assert_eq!(result.error().unwrap().kind, QueryErrorKind::Mapping);
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_failed_results_are_not_cached() {
    let transport = ScriptedTransport::new();
    transport.fail(ClientError::Network("timeout".to_string()));
    transport.respond(200, searchset(Vec::new()));
    let services = Services::with_client(test_client(&transport));

    let request = ListRequest {
        filters: ConditionFilters {
            patient_id: Some("42".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };

    assert!(services.conditions.list(&request).await.is_error());
    let retry = services.conditions.list(&request).await;
    assert!(matches!(retry, QueryResult::Data(ref page) if page.data.is_empty()));
    assert_eq!(transport.requests().len(), 2);
}

#[tokio::test]
async fn test_delete_invalidates_lists() {
    let transport = ScriptedTransport::new();
    transport.respond(200, searchset(vec![patient_json("42", "Tan")]));
    transport.respond_raw(HttpResponse {
        status: 204,
        location: None,
        body: Vec::new(),
    });
    transport.respond(200, searchset(Vec::new()));
    let services = Services::with_client(test_client(&transport));

    let request = ListRequest::<PatientFilters>::default();
    services.patients.list(&request).await;
    assert!(!services.cache.is_empty());

    assert!(services.patients.delete("42").await.is_data());
    assert!(services.cache.is_empty());

    let page = services.patients.list(&request).await.into_result().unwrap();
    assert!(page.data.is_empty());
}
