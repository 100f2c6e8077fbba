//! Cache-integration client
//!
//! [`FhirApi`] wraps [`FhirClient`] and never fails: every transport or
//! mapping error comes back as [`QueryResult::Error`], ready to be stored
//! by the query layer next to successful results.

use emr_core::{Bundle, MappingError};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::client::{FhirClient, ReadRequest, SearchRequest, SearchResult};
use crate::error::ClientError;

/// `{"data": ...}` or `{"error": ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryResult<T> {
    Data(T),
    Error(QueryError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueryErrorKind {
    Transport,
    Status,
    Decode,
    NotFound,
    InvalidRequest,
    Mapping,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryError {
    pub kind: QueryErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub message: String,
}

impl From<ClientError> for QueryError {
    fn from(err: ClientError) -> Self {
        let kind = match &err {
            ClientError::Http(_) | ClientError::Network(_) => QueryErrorKind::Transport,
            ClientError::Status { .. } => QueryErrorKind::Status,
            ClientError::Decode(_) => QueryErrorKind::Decode,
            ClientError::NotFound(_) => QueryErrorKind::NotFound,
            ClientError::InvalidRequest(_) => QueryErrorKind::InvalidRequest,
            ClientError::Mapping(_) => QueryErrorKind::Mapping,
        };

        QueryError {
            kind,
            status: err.status(),
            message: err.to_string(),
        }
    }
}

impl<T> QueryResult<T> {
    pub fn is_data(&self) -> bool {
        matches!(self, QueryResult::Data(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, QueryResult::Error(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            QueryResult::Data(data) => Some(data),
            QueryResult::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&QueryError> {
        match self {
            QueryResult::Data(_) => None,
            QueryResult::Error(err) => Some(err),
        }
    }

    pub fn into_result(self) -> Result<T, QueryError> {
        match self {
            QueryResult::Data(data) => Ok(data),
            QueryResult::Error(err) => Err(err),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> QueryResult<U> {
        match self {
            QueryResult::Data(data) => QueryResult::Data(f(data)),
            QueryResult::Error(err) => QueryResult::Error(err),
        }
    }
}

impl<T> From<Result<T, ClientError>> for QueryResult<T> {
    fn from(result: Result<T, ClientError>) -> Self {
        match result {
            Ok(data) => QueryResult::Data(data),
            Err(err) => {
                tracing::warn!(error = %err, "Query failed");
                QueryResult::Error(err.into())
            }
        }
    }
}

/// Result-returning facade over [`FhirClient`], applying caller-supplied
/// wire/app mapper functions
#[derive(Clone)]
pub struct FhirApi {
    client: FhirClient,
}

impl FhirApi {
    pub fn new(client: FhirClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &FhirClient {
        &self.client
    }

    pub async fn search<T, F>(&self, request: &SearchRequest, map_fn: F) -> QueryResult<T>
    where
        F: FnOnce(SearchResult) -> Result<T, MappingError>,
    {
        let result = async {
            let found = self.client.search(request).await?;
            Ok::<_, ClientError>(map_fn(found)?)
        };
        result.await.into()
    }

    pub async fn get_by_id<T, F>(&self, request: &ReadRequest, map_fn: F) -> QueryResult<T>
    where
        F: FnOnce(JsonValue) -> Result<T, MappingError>,
    {
        let result = async {
            let resource = self.client.get_by_id(request).await?;
            Ok::<_, ClientError>(map_fn(resource)?)
        };
        result.await.into()
    }

    pub async fn create<B, T, Req, Res>(
        &self,
        body: B,
        map_req_fn: Req,
        map_res_fn: Res,
    ) -> QueryResult<T>
    where
        Req: FnOnce(B) -> Result<JsonValue, MappingError>,
        Res: FnOnce(JsonValue) -> Result<T, MappingError>,
    {
        let result = async {
            let created = self.client.create(map_req_fn(body)?).await?;
            Ok::<_, ClientError>(map_res_fn(created)?)
        };
        result.await.into()
    }

    pub async fn update<B, T, Req, Res>(
        &self,
        body: B,
        map_req_fn: Req,
        map_res_fn: Res,
    ) -> QueryResult<T>
    where
        Req: FnOnce(B) -> Result<JsonValue, MappingError>,
        Res: FnOnce(JsonValue) -> Result<T, MappingError>,
    {
        let result = async {
            let updated = self.client.update(map_req_fn(body)?).await?;
            Ok::<_, ClientError>(map_res_fn(updated)?)
        };
        result.await.into()
    }

    pub async fn delete(&self, resource_type: &str, resource_id: &str) -> QueryResult<()> {
        self.client.delete(resource_type, resource_id).await.into()
    }

    pub async fn post_bundle(&self, bundle: &Bundle) -> QueryResult<Bundle> {
        self.client.post_bundle(bundle).await.into()
    }
}
