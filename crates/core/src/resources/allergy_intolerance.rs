//! AllergyIntolerance: allergies and intolerances with their first reaction

use serde::{Deserialize, Serialize};

use crate::codes::{CodeTable, systems};
use crate::datatypes::{Annotation, CodeableConcept, CodeableReference, Reference, non_empty};
use crate::date::{self, DateLike};
use crate::mapper::ResourceMapper;
use crate::resource::fhir_resource;
use crate::search::SearchParams;

pub const DEFAULT_CLINICAL_STATUS: &str = "active";
pub const DEFAULT_VERIFICATION_STATUS: &str = "unconfirmed";

pub const CLINICAL_STATUS: CodeTable = CodeTable::new(
    "http://terminology.hl7.org/CodeSystem/allergyintolerance-clinical",
    &[
        ("active", "Active"),
        ("inactive", "Inactive"),
        ("resolved", "Resolved"),
    ],
);

pub const VERIFICATION_STATUS: CodeTable = CodeTable::new(
    "http://terminology.hl7.org/CodeSystem/allergyintolerance-verification",
    &[
        ("unconfirmed", "Unconfirmed"),
        ("presumed", "Presumed"),
        ("confirmed", "Confirmed"),
        ("refuted", "Refuted"),
        ("entered-in-error", "Entered in Error"),
    ],
);

pub const TYPE: CodeTable = CodeTable::new(
    "http://hl7.org/fhir/allergy-intolerance-type",
    &[("allergy", "Allergy"), ("intolerance", "Intolerance")],
);

pub const CATEGORY: CodeTable = CodeTable::new(
    "http://hl7.org/fhir/allergy-intolerance-category",
    &[
        ("food", "Food"),
        ("medication", "Medication"),
        ("environment", "Environment"),
        ("biologic", "Biologic"),
    ],
);

pub const CRITICALITY: CodeTable = CodeTable::new(
    "http://hl7.org/fhir/allergy-intolerance-criticality",
    &[
        ("low", "Low Risk"),
        ("high", "High Risk"),
        ("unable-to-assess", "Unable to Assess Risk"),
    ],
);

pub const REACTION_SEVERITY: CodeTable = CodeTable::new(
    "http://hl7.org/fhir/reaction-event-severity",
    &[("mild", "Mild"), ("moderate", "Moderate"), ("severe", "Severe")],
);

/// FHIR AllergyIntolerance resource
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AllergyIntolerance {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub clinical_status: Option<CodeableConcept>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_status: Option<CodeableConcept>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub allergy_type: Option<CodeableConcept>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub category: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub criticality: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<CodeableConcept>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient: Option<Reference>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub onset_date_time: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub recorded_date: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub note: Vec<Annotation>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reaction: Vec<Reaction>,
}

fhir_resource!(AllergyIntolerance, "AllergyIntolerance");

/// Adverse reaction event
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Reaction {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub manifestation: Vec<CodeableReference>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AllergyIntoleranceRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub patient_id: String,
    pub clinical_status: String,
    pub verification_status: String,
    pub allergy_type: String,
    pub category: String,
    pub criticality: String,
    pub code: String,
    pub code_display: String,
    pub code_system: String,
    pub onset_date: String,
    pub recorded_date: String,
    /// Display text of the first reaction manifestation
    pub reaction: String,
    pub reaction_severity: String,
    pub note: String,
}

impl AllergyIntoleranceRecord {
    pub fn with_onset_date(mut self, value: impl DateLike) -> Self {
        self.onset_date = value.to_iso_date();
        self
    }

    pub fn with_recorded_date(mut self, value: impl DateLike) -> Self {
        self.recorded_date = value.to_iso_date();
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AllergyIntoleranceFilters {
    /// Free-text search over the substance code
    pub search: Option<String>,
    pub patient_id: Option<String>,
    pub clinical_status: Option<String>,
    pub verification_status: Option<String>,
    pub allergy_type: Option<String>,
    pub category: Option<String>,
    pub criticality: Option<String>,
    pub code: Option<String>,
}

pub struct AllergyIntoleranceMapper;

impl ResourceMapper for AllergyIntoleranceMapper {
    type Wire = AllergyIntolerance;
    type Record = AllergyIntoleranceRecord;
    type Filters = AllergyIntoleranceFilters;

    const SORT_FIELDS: &'static [(&'static str, &'static str)] = &[
        ("clinicalStatus", "clinical-status"),
        ("verificationStatus", "verification-status"),
        ("allergyType", "type"),
        ("recordedDate", "date"),
        ("patientId", "patient"),
        ("codeDisplay", "code"),
    ];

    fn from_wire(wire: &AllergyIntolerance) -> AllergyIntoleranceRecord {
        let reaction = wire.reaction.first();
        let manifestation = reaction
            .and_then(|r| r.manifestation.first())
            .and_then(|m| m.concept.as_ref())
            .map(|c| c.display().to_string())
            .unwrap_or_default();

        AllergyIntoleranceRecord {
            id: wire.id.clone(),
            patient_id: wire.patient.as_ref().map(|r| r.id().to_string()).unwrap_or_default(),
            clinical_status: wire
                .clinical_status
                .as_ref()
                .map(|c| c.code())
                .filter(|c| !c.is_empty())
                .unwrap_or(DEFAULT_CLINICAL_STATUS)
                .to_string(),
            verification_status: wire
                .verification_status
                .as_ref()
                .map(|c| c.code().to_string())
                .unwrap_or_default(),
            allergy_type: wire
                .allergy_type
                .as_ref()
                .map(|c| c.code().to_string())
                .unwrap_or_default(),
            category: wire.category.first().cloned().unwrap_or_default(),
            criticality: wire.criticality.clone().unwrap_or_default(),
            code: wire.code.as_ref().map(|c| c.code().to_string()).unwrap_or_default(),
            code_display: wire
                .code
                .as_ref()
                .map(|c| c.display().to_string())
                .unwrap_or_default(),
            code_system: wire
                .code
                .as_ref()
                .map(|c| c.system().to_string())
                .unwrap_or_default(),
            onset_date: date::app_date(wire.onset_date_time.as_deref()),
            recorded_date: date::app_date(wire.recorded_date.as_deref()),
            reaction: manifestation,
            reaction_severity: reaction
                .and_then(|r| r.severity.clone())
                .unwrap_or_default(),
            note: wire.note.first().map(|n| n.text.clone()).unwrap_or_default(),
        }
    }

    fn to_wire(record: &AllergyIntoleranceRecord) -> AllergyIntolerance {
        let code = if record.code.trim().is_empty() && record.code_display.trim().is_empty() {
            None
        } else {
            let system = non_empty(&record.code_system);
            Some(CodeableConcept::single(
                system.as_deref().unwrap_or(systems::SNOMED),
                &record.code,
                Some(record.code_display.as_str()),
            ))
        };

        let manifestation = non_empty(&record.reaction);
        let severity = non_empty(&record.reaction_severity);
        let reaction = if manifestation.is_none() && severity.is_none() {
            Vec::new()
        } else {
            vec![Reaction {
                manifestation: manifestation
                    .map(|text| {
                        CodeableReference::concept(CodeableConcept {
                            coding: Vec::new(),
                            text: Some(text),
                        })
                    })
                    .into_iter()
                    .collect(),
                severity,
                description: None,
            }]
        };

        AllergyIntolerance {
            id: record.id.as_deref().and_then(non_empty),
            clinical_status: Some(
                CLINICAL_STATUS.concept_or(&record.clinical_status, DEFAULT_CLINICAL_STATUS),
            ),
            verification_status: Some(
                VERIFICATION_STATUS
                    .concept_or(&record.verification_status, DEFAULT_VERIFICATION_STATUS),
            ),
            allergy_type: TYPE.optional_concept(&record.allergy_type),
            category: non_empty(&record.category).into_iter().collect(),
            criticality: non_empty(&record.criticality),
            code,
            patient: non_empty(&record.patient_id).map(|id| Reference::to("Patient", &id)),
            onset_date_time: date::format_date(&record.onset_date),
            recorded_date: date::format_date(&record.recorded_date),
            note: non_empty(&record.note)
                .map(|text| Annotation { text })
                .into_iter()
                .collect(),
            reaction,
        }
    }

    fn to_filter_params(filters: &AllergyIntoleranceFilters) -> SearchParams {
        let mut params = SearchParams::new();
        params.push_opt("code:text", filters.search.as_deref());
        params.push_opt("patient", filters.patient_id.as_deref());
        params.push_opt("clinical-status", filters.clinical_status.as_deref());
        params.push_opt("verification-status", filters.verification_status.as_deref());
        params.push_opt("type", filters.allergy_type.as_deref());
        params.push_opt("category", filters.category.as_deref());
        params.push_opt("criticality", filters.criticality.as_deref());
        params.push_opt("code", filters.code.as_deref());
        params
    }

    fn record_id(record: &AllergyIntoleranceRecord) -> Option<&str> {
        record.id.as_deref()
    }
}
