//! Typed wire resources and their bridge to raw FHIR JSON

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value as JsonValue;

use crate::error::MappingError;

/// A FHIR resource kind with a fixed `resourceType` tag
pub trait FhirResource: Serialize + DeserializeOwned {
    const RESOURCE_TYPE: &'static str;

    /// Server-assigned id, absent on resources that were never stored
    fn id(&self) -> Option<&str>;
}

/// Decode raw JSON into a typed wire resource, checking `resourceType`.
///
/// A missing `resourceType` is accepted; a different one is an error.
pub fn from_json<R: FhirResource>(value: JsonValue) -> Result<R, MappingError> {
    if let Some(found) = value.get("resourceType").and_then(|v| v.as_str()) {
        if found != R::RESOURCE_TYPE {
            return Err(MappingError::UnexpectedResourceType {
                expected: R::RESOURCE_TYPE,
                found: found.to_string(),
            });
        }
    }

    serde_json::from_value(value).map_err(|source| MappingError::Decode {
        resource_type: R::RESOURCE_TYPE,
        source,
    })
}

/// Encode a typed wire resource as JSON with its `resourceType` tag first
pub fn to_json<R: FhirResource>(resource: &R) -> Result<JsonValue, MappingError> {
    let value = serde_json::to_value(resource).map_err(|source| MappingError::Decode {
        resource_type: R::RESOURCE_TYPE,
        source,
    })?;

    let mut tagged = serde_json::Map::new();
    tagged.insert(
        "resourceType".to_string(),
        JsonValue::String(R::RESOURCE_TYPE.to_string()),
    );
    if let JsonValue::Object(fields) = value {
        tagged.extend(fields);
    }

    Ok(JsonValue::Object(tagged))
}

/// Implements [`FhirResource`] for a wire struct with an `id: Option<String>` field
macro_rules! fhir_resource {
    ($ty:ty, $name:literal) => {
        impl $crate::resource::FhirResource for $ty {
            const RESOURCE_TYPE: &'static str = $name;

            fn id(&self) -> Option<&str> {
                self.id.as_deref()
            }
        }
    };
}

pub(crate) use fhir_resource;
