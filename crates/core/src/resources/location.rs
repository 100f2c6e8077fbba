//! Location: wards, clinics and rooms

use serde::{Deserialize, Serialize};

use crate::codes::{CodeTable, systems};
use crate::datatypes::{
    Address, CodeableConcept, ExtendedContactDetail, Reference, build_address, build_telecom,
    non_empty, telecom_value,
};
use crate::mapper::ResourceMapper;
use crate::resource::fhir_resource;
use crate::search::SearchParams;
use crate::validation::{Checks, is_email, is_phone, is_postal_code};

pub const DEFAULT_STATUS: &str = "active";
pub const DEFAULT_MODE: &str = "instance";

pub const STATUS: CodeTable = CodeTable::new(
    "http://hl7.org/fhir/location-status",
    &[
        ("active", "Active"),
        ("suspended", "Suspended"),
        ("inactive", "Inactive"),
    ],
);

pub const MODE: CodeTable = CodeTable::new(
    "http://hl7.org/fhir/location-mode",
    &[("instance", "Instance"), ("kind", "Kind")],
);

pub const TYPE: CodeTable = CodeTable::new(
    systems::ROLE_CODE,
    &[
        ("HOSP", "Hospital"),
        ("ER", "Emergency room"),
        ("ICU", "Intensive care unit"),
        ("OR", "Operating room"),
        ("PEDU", "Pediatric unit"),
        ("OF", "Outpatient facility"),
        ("PHARM", "Pharmacy"),
        ("RADDX", "Radiology diagnostics or therapeutics unit"),
        ("HLAB", "Hospital laboratory"),
        ("GIM", "General internal medicine clinic"),
    ],
);

pub const PHYSICAL_TYPE: CodeTable = CodeTable::new(
    "http://terminology.hl7.org/CodeSystem/location-physical-type",
    &[
        ("si", "Site"),
        ("bu", "Building"),
        ("wi", "Wing"),
        ("wa", "Ward"),
        ("lvl", "Level"),
        ("co", "Corridor"),
        ("ro", "Room"),
        ("bd", "Bed"),
        ("area", "Area"),
    ],
);

/// FHIR Location resource
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Vec::is_empty")]
    pub location_type: Vec<CodeableConcept>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contact: Vec<ExtendedContactDetail>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub physical_type: Option<CodeableConcept>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub managing_organization: Option<Reference>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub part_of: Option<Reference>,
}

fhir_resource!(Location, "Location");

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocationRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub description: String,
    pub status: String,
    pub mode: String,
    /// v3-RoleCode service delivery location type
    pub location_type: String,
    pub physical_type: String,
    pub phone: String,
    pub email: String,
    pub address_line: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub managing_organization_id: String,
    pub part_of_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocationFilters {
    pub search: Option<String>,
    pub name: Option<String>,
    pub status: Option<String>,
    pub location_type: Option<String>,
    pub city: Option<String>,
    pub managing_organization_id: Option<String>,
    pub part_of_id: Option<String>,
}

pub struct LocationMapper;

impl ResourceMapper for LocationMapper {
    type Wire = Location;
    type Record = LocationRecord;
    type Filters = LocationFilters;

    const SORT_FIELDS: &'static [(&'static str, &'static str)] = &[
        ("locationType", "type"),
        ("city", "address-city"),
        ("postalCode", "address-postalcode"),
        ("managingOrganizationId", "organization"),
        ("partOfId", "partof"),
    ];

    fn from_wire(wire: &Location) -> LocationRecord {
        let telecom = wire
            .contact
            .first()
            .map(|c| c.telecom.as_slice())
            .unwrap_or_default();
        let address = wire.address.as_ref();

        LocationRecord {
            id: wire.id.clone(),
            name: wire.name.clone().unwrap_or_default(),
            description: wire.description.clone().unwrap_or_default(),
            status: wire.status.clone().unwrap_or_default(),
            mode: wire.mode.clone().unwrap_or_default(),
            location_type: wire
                .location_type
                .first()
                .map(|c| c.code().to_string())
                .unwrap_or_default(),
            physical_type: wire
                .physical_type
                .as_ref()
                .map(|c| c.code().to_string())
                .unwrap_or_default(),
            phone: telecom_value(telecom, "phone").to_string(),
            email: telecom_value(telecom, "email").to_string(),
            address_line: address
                .and_then(|a| a.line.first().cloned())
                .unwrap_or_default(),
            city: address.and_then(|a| a.city.clone()).unwrap_or_default(),
            state: address.and_then(|a| a.state.clone()).unwrap_or_default(),
            postal_code: address.and_then(|a| a.postal_code.clone()).unwrap_or_default(),
            country: address.and_then(|a| a.country.clone()).unwrap_or_default(),
            managing_organization_id: wire
                .managing_organization
                .as_ref()
                .map(|r| r.id().to_string())
                .unwrap_or_default(),
            part_of_id: wire
                .part_of
                .as_ref()
                .map(|r| r.id().to_string())
                .unwrap_or_default(),
        }
    }

    fn to_wire(record: &LocationRecord) -> Location {
        let telecom = build_telecom(&record.phone, &record.email);

        Location {
            id: record.id.as_deref().and_then(non_empty),
            status: Some(non_empty(&record.status).unwrap_or_else(|| DEFAULT_STATUS.to_string())),
            name: non_empty(&record.name),
            description: non_empty(&record.description),
            mode: Some(non_empty(&record.mode).unwrap_or_else(|| DEFAULT_MODE.to_string())),
            location_type: TYPE.optional_concept(&record.location_type).into_iter().collect(),
            contact: if telecom.is_empty() {
                Vec::new()
            } else {
                vec![ExtendedContactDetail { telecom }]
            },
            address: build_address(
                &record.address_line,
                &record.city,
                &record.state,
                &record.postal_code,
                &record.country,
            ),
            physical_type: PHYSICAL_TYPE.optional_concept(&record.physical_type),
            managing_organization: non_empty(&record.managing_organization_id)
                .map(|id| Reference::to("Organization", &id)),
            part_of: non_empty(&record.part_of_id).map(|id| Reference::to("Location", &id)),
        }
    }

    fn to_filter_params(filters: &LocationFilters) -> SearchParams {
        let mut params = SearchParams::new();
        params.push_opt("name", filters.search.as_deref());
        params.push_opt("name", filters.name.as_deref());
        params.push_opt("status", filters.status.as_deref());
        params.push_opt("type", filters.location_type.as_deref());
        params.push_opt("address-city", filters.city.as_deref());
        params.push_opt("organization", filters.managing_organization_id.as_deref());
        params.push_opt("partof", filters.part_of_id.as_deref());
        params
    }

    fn record_id(record: &LocationRecord) -> Option<&str> {
        record.id.as_deref()
    }
}

/// Pre-submit checks for a location form
pub fn validate(record: &LocationRecord) -> Vec<String> {
    Checks::default()
        .required(&record.name, "Name")
        .max_len(&record.name, 200, "Name")
        .one_of(&record.status, STATUS.codes(), "Status")
        .one_of(&record.mode, MODE.codes(), "Mode")
        .one_of(&record.location_type, TYPE.codes(), "Type")
        .one_of(&record.physical_type, PHYSICAL_TYPE.codes(), "Physical type")
        .format(&record.email, is_email, "Email")
        .format(&record.phone, is_phone, "Phone")
        .format(&record.postal_code, is_postal_code, "Postal code")
        .finish()
}
