//! The per-resource mapping contract

use std::fmt::Debug;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value as JsonValue;

use crate::bundle::Bundle;
use crate::error::MappingError;
use crate::resource::{self, FhirResource};
use crate::search::{self, SearchParams, SortDirection};

/// Bidirectional mapping between a FHIR wire resource and its flattened
/// application record, plus filter and sort translation.
///
/// Implementations are zero-sized types; every method is a pure function
/// of its input and the resource's constant tables.
pub trait ResourceMapper: 'static {
    /// Typed FHIR resource
    type Wire: FhirResource;

    /// Flattened application record
    type Record: Clone + Debug + Default + Serialize + Send + Sync + 'static;

    /// Application-level list filters
    type Filters: Clone + Debug + Default + DeserializeOwned + Send + Sync;

    /// Application sort field → FHIR search parameter
    const SORT_FIELDS: &'static [(&'static str, &'static str)];

    /// FHIR `resourceType` of the wire resource
    fn resource_type() -> &'static str {
        <Self::Wire as FhirResource>::RESOURCE_TYPE
    }

    /// Wire → record. Never fails; absent elements become defaults.
    fn from_wire(wire: &Self::Wire) -> Self::Record;

    /// Record → wire. Required elements get defaults; `id` is set only
    /// when the record has one.
    fn to_wire(record: &Self::Record) -> Self::Wire;

    /// Application filters → FHIR search parameters, skipping empty ones
    fn to_filter_params(filters: &Self::Filters) -> SearchParams;

    /// Application sort fields → `_sort` tokens
    fn to_sort_fields<S: AsRef<str>>(fields: &[S], directions: &[SortDirection]) -> Vec<String> {
        search::to_sort_fields(fields, directions, Self::SORT_FIELDS)
    }

    /// Every matched entry resource of a searchset; `[]` when there are no entries
    fn from_bundle(bundle: &Bundle<Self::Wire>) -> Vec<Self::Record> {
        bundle
            .entry
            .iter()
            .filter(|entry| entry.is_match())
            .filter_map(|entry| entry.resource.as_ref())
            .map(Self::from_wire)
            .collect()
    }

    /// Raw JSON → record
    fn from_json(value: JsonValue) -> Result<Self::Record, MappingError> {
        resource::from_json::<Self::Wire>(value).map(|wire| Self::from_wire(&wire))
    }

    /// Record → raw JSON
    fn to_json(record: &Self::Record) -> Result<JsonValue, MappingError> {
        resource::to_json(&Self::to_wire(record))
    }

    /// Id of a record, if it has one
    fn record_id(record: &Self::Record) -> Option<&str>;
}
