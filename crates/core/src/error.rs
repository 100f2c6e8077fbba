use thiserror::Error;

/// Errors raised while converting between FHIR JSON and typed wire resources
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("Failed to decode {resource_type}: {source}")]
    Decode {
        resource_type: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Expected resourceType '{expected}', got '{found}'")]
    UnexpectedResourceType {
        expected: &'static str,
        found: String,
    },

    #[error("{0} resource has no id")]
    MissingId(&'static str),
}
