//! emr-core: FHIR R5 resource mapping for the EMR workspace
//!
//! This crate holds everything that does not touch the network: typed
//! wire resources, the flattened records the UI edits, and the mappers
//! between them, plus bundle, outcome, reference, date and search helpers.

pub mod bundle;
pub mod codes;
pub mod datatypes;
pub mod date;
pub mod error;
pub mod mapper;
pub mod outcome;
pub mod reference;
pub mod resource;
pub mod resources;
pub mod search;

mod validation;

pub use bundle::{Bundle, BundleEntry, BundleLink, BundleType, HttpVerb};
pub use codes::CodeTable;
pub use date::{DateLike, format_date, format_date_time, format_search_date};
pub use error::MappingError;
pub use mapper::ResourceMapper;
pub use outcome::{IssueSeverity, OperationOutcome, OperationOutcomeIssue};
pub use reference::{make_reference, parse_reference, reference_type};
pub use resource::FhirResource;
pub use search::{SearchParams, SortDirection};
