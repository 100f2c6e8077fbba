//! Patient: demographics and the medical record number

use serde::{Deserialize, Serialize};

use crate::codes::{CodeTable, systems};
use crate::datatypes::{
    Address, CodeableConcept, ContactPoint, HumanName, Identifier, Reference, build_address,
    build_telecom, non_empty, telecom_value,
};
use crate::date::{self, DateLike};
use crate::mapper::ResourceMapper;
use crate::resource::fhir_resource;
use crate::search::SearchParams;

/// Identifier system for medical record numbers
pub const MRN_SYSTEM: &str = "urn:emr:mrn";

pub const GENDER: CodeTable = CodeTable::new(
    "http://hl7.org/fhir/administrative-gender",
    &[
        ("male", "Male"),
        ("female", "Female"),
        ("other", "Other"),
        ("unknown", "Unknown"),
    ],
);

pub const MARITAL_STATUS: CodeTable = CodeTable::new(
    systems::MARITAL_STATUS,
    &[
        ("A", "Annulled"),
        ("D", "Divorced"),
        ("I", "Interlocutory"),
        ("L", "Legally Separated"),
        ("M", "Married"),
        ("C", "Common Law"),
        ("P", "Polygamous"),
        ("T", "Domestic partner"),
        ("U", "unmarried"),
        ("S", "Never Married"),
        ("W", "Widowed"),
        ("UNK", "unknown"),
    ],
);

/// FHIR Patient resource
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identifier: Vec<Identifier>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub name: Vec<HumanName>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub telecom: Vec<ContactPoint>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub address: Vec<Address>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub marital_status: Option<CodeableConcept>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub general_practitioner: Vec<Reference>,
}

fhir_resource!(Patient, "Patient");

/// Patient as shown in the patient list and edit form
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PatientRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub mrn: String,
    pub family_name: String,
    pub given_name: String,
    pub gender: String,
    pub birth_date: String,
    pub phone: String,
    pub email: String,
    pub address_line: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub marital_status: String,
    pub active: bool,
    pub general_practitioner_id: String,
}

impl PatientRecord {
    pub fn with_birth_date(mut self, value: impl DateLike) -> Self {
        self.birth_date = value.to_iso_date();
        self
    }
}

/// Patient list filters
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PatientFilters {
    /// Free-text name search; ignored when `mrn` is also given
    pub search: Option<String>,
    pub mrn: Option<String>,
    pub gender: Option<String>,
    pub birth_date: Option<String>,
    pub active: Option<bool>,
    pub general_practitioner_id: Option<String>,
}

pub struct PatientMapper;

impl ResourceMapper for PatientMapper {
    type Wire = Patient;
    type Record = PatientRecord;
    type Filters = PatientFilters;

    const SORT_FIELDS: &'static [(&'static str, &'static str)] = &[
        ("familyName", "family"),
        ("givenName", "given"),
        ("name", "family"),
        ("birthDate", "birthdate"),
        ("mrn", "identifier"),
        ("lastUpdated", "_lastUpdated"),
    ];

    fn from_wire(wire: &Patient) -> PatientRecord {
        let name = wire.name.first();
        let address = wire.address.first();
        let mrn = wire
            .identifier
            .iter()
            .find(|i| i.system.as_deref() == Some(MRN_SYSTEM))
            .or_else(|| wire.identifier.first())
            .and_then(|i| i.value.clone())
            .unwrap_or_default();

        PatientRecord {
            id: wire.id.clone(),
            mrn,
            family_name: name.and_then(|n| n.family.clone()).unwrap_or_default(),
            given_name: name.map(|n| n.given.join(" ")).unwrap_or_default(),
            gender: wire.gender.clone().unwrap_or_default(),
            birth_date: date::app_date(wire.birth_date.as_deref()),
            phone: telecom_value(&wire.telecom, "phone").to_string(),
            email: telecom_value(&wire.telecom, "email").to_string(),
            address_line: address.map(|a| a.line.join(", ")).unwrap_or_default(),
            city: address.and_then(|a| a.city.clone()).unwrap_or_default(),
            state: address.and_then(|a| a.state.clone()).unwrap_or_default(),
            postal_code: address.and_then(|a| a.postal_code.clone()).unwrap_or_default(),
            country: address.and_then(|a| a.country.clone()).unwrap_or_default(),
            marital_status: wire
                .marital_status
                .as_ref()
                .map(|m| m.code().to_string())
                .unwrap_or_default(),
            active: wire.active.unwrap_or(true),
            general_practitioner_id: wire
                .general_practitioner
                .first()
                .map(|r| r.id().to_string())
                .unwrap_or_default(),
        }
    }

    fn to_wire(record: &PatientRecord) -> Patient {
        let identifier = non_empty(&record.mrn)
            .map(|mrn| Identifier {
                use_type: Some("usual".to_string()),
                id_type: Some(CodeableConcept::single(
                    systems::IDENTIFIER_TYPE,
                    "MR",
                    Some("Medical record number"),
                )),
                system: Some(MRN_SYSTEM.to_string()),
                value: Some(mrn),
            })
            .into_iter()
            .collect();

        let family = non_empty(&record.family_name);
        let given: Vec<String> = record
            .given_name
            .split_whitespace()
            .map(str::to_string)
            .collect();
        let name = if family.is_none() && given.is_empty() {
            Vec::new()
        } else {
            vec![HumanName {
                use_type: Some("official".to_string()),
                family,
                given,
                ..Default::default()
            }]
        };

        Patient {
            id: record.id.as_deref().and_then(non_empty),
            identifier,
            active: Some(record.active),
            name,
            telecom: build_telecom(&record.phone, &record.email),
            gender: non_empty(&record.gender).map(|g| g.to_lowercase()),
            birth_date: date::format_date(&record.birth_date),
            address: build_address(
                &record.address_line,
                &record.city,
                &record.state,
                &record.postal_code,
                &record.country,
            )
            .into_iter()
            .collect(),
            marital_status: MARITAL_STATUS.optional_concept(&record.marital_status),
            general_practitioner: non_empty(&record.general_practitioner_id)
                .map(|id| Reference::to("Practitioner", &id))
                .into_iter()
                .collect(),
        }
    }

    /// `mrn` takes the server's single identifier slot; a free-text
    /// `search` alongside it is dropped rather than combined.
    fn to_filter_params(filters: &PatientFilters) -> SearchParams {
        let mut params = SearchParams::new();

        let mrn = filters.mrn.as_deref().map(str::trim).filter(|m| !m.is_empty());
        match mrn {
            Some(mrn) => params.push("identifier", mrn),
            None => params.push_opt("name", filters.search.as_deref()),
        }

        params.push_opt("gender", filters.gender.as_deref());
        params.push_opt(
            "birthdate",
            filters
                .birth_date
                .as_deref()
                .and_then(date::format_search_date)
                .as_deref(),
        );
        if let Some(active) = filters.active {
            params.push("active", active.to_string());
        }
        params.push_opt(
            "general-practitioner",
            filters.general_practitioner_id.as_deref(),
        );

        params
    }

    fn record_id(record: &PatientRecord) -> Option<&str> {
        record.id.as_deref()
    }
}
