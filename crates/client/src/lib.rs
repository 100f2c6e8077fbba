//! emr-client: FHIR REST client, cache integration and per-resource services
//!
//! Layers, innermost first:
//! - [`transport`]: the HTTP seam, the only place network I/O happens
//! - [`client`]: the generic FHIR client, which returns `Result`
//! - [`query`]: the cache-integration client, which returns [`QueryResult`]
//! - [`services`]: one service per resource kind with cache tags

pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod query;
pub mod services;
pub mod transport;

pub use auth::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use cache::{QueryCache, Tag};
pub use client::{FhirClient, ReadRequest, SearchRequest, SearchResult};
pub use config::{AuthConfig, ClientConfig};
pub use error::ClientError;
pub use query::{FhirApi, QueryError, QueryErrorKind, QueryResult};
pub use services::{ListRequest, Page, ResourceService, Services};
pub use transport::{HttpRequest, HttpResponse, Method, ReqwestTransport, Transport};
