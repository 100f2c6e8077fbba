//! Condition: problems and diagnoses

use serde::{Deserialize, Serialize};

use crate::codes::{CodeTable, systems};
use crate::datatypes::{Annotation, CodeableConcept, Reference, non_empty};
use crate::date::{self, DateLike};
use crate::mapper::ResourceMapper;
use crate::resource::fhir_resource;
use crate::search::SearchParams;

pub const DEFAULT_CLINICAL_STATUS: &str = "active";
pub const DEFAULT_VERIFICATION_STATUS: &str = "unconfirmed";

pub const CLINICAL_STATUS: CodeTable = CodeTable::new(
    "http://terminology.hl7.org/CodeSystem/condition-clinical",
    &[
        ("active", "Active"),
        ("recurrence", "Recurrence"),
        ("relapse", "Relapse"),
        ("inactive", "Inactive"),
        ("remission", "Remission"),
        ("resolved", "Resolved"),
        ("unknown", "Unknown"),
    ],
);

pub const VERIFICATION_STATUS: CodeTable = CodeTable::new(
    "http://terminology.hl7.org/CodeSystem/condition-ver-status",
    &[
        ("unconfirmed", "Unconfirmed"),
        ("provisional", "Provisional"),
        ("differential", "Differential"),
        ("confirmed", "Confirmed"),
        ("refuted", "Refuted"),
        ("entered-in-error", "Entered in Error"),
    ],
);

pub const CATEGORY: CodeTable = CodeTable::new(
    "http://terminology.hl7.org/CodeSystem/condition-category",
    &[
        ("problem-list-item", "Problem List Item"),
        ("encounter-diagnosis", "Encounter Diagnosis"),
    ],
);

pub const SEVERITY: CodeTable = CodeTable::new(
    systems::SNOMED,
    &[
        ("24484000", "Severe"),
        ("6736007", "Moderate"),
        ("255604002", "Mild"),
    ],
);

/// FHIR Condition resource
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub clinical_status: Option<CodeableConcept>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_status: Option<CodeableConcept>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub category: Vec<CodeableConcept>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<CodeableConcept>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<CodeableConcept>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<Reference>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub encounter: Option<Reference>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub onset_date_time: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub abatement_date_time: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub recorded_date: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub note: Vec<Annotation>,
}

fhir_resource!(Condition, "Condition");

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConditionRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub patient_id: String,
    pub encounter_id: String,
    pub clinical_status: String,
    pub verification_status: String,
    pub category: String,
    /// SNOMED severity code
    pub severity: String,
    pub code: String,
    pub code_display: String,
    pub code_system: String,
    pub onset_date: String,
    pub abatement_date: String,
    pub recorded_date: String,
    pub note: String,
}

impl ConditionRecord {
    pub fn with_onset_date(mut self, value: impl DateLike) -> Self {
        self.onset_date = value.to_iso_date();
        self
    }

    pub fn with_abatement_date(mut self, value: impl DateLike) -> Self {
        self.abatement_date = value.to_iso_date();
        self
    }

    pub fn with_recorded_date(mut self, value: impl DateLike) -> Self {
        self.recorded_date = value.to_iso_date();
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConditionFilters {
    /// Free-text search over the condition code
    pub search: Option<String>,
    pub patient_id: Option<String>,
    pub encounter_id: Option<String>,
    pub clinical_status: Option<String>,
    pub verification_status: Option<String>,
    pub category: Option<String>,
    pub severity: Option<String>,
    pub code: Option<String>,
}

pub struct ConditionMapper;

impl ResourceMapper for ConditionMapper {
    type Wire = Condition;
    type Record = ConditionRecord;
    type Filters = ConditionFilters;

    const SORT_FIELDS: &'static [(&'static str, &'static str)] = &[
        ("clinicalStatus", "clinical-status"),
        ("verificationStatus", "verification-status"),
        ("recordedDate", "recorded-date"),
        ("onsetDate", "onset-date"),
        ("abatementDate", "abatement-date"),
        ("patientId", "patient"),
        ("codeDisplay", "code"),
    ];

    fn from_wire(wire: &Condition) -> ConditionRecord {
        let concept_code = |c: &Option<CodeableConcept>| {
            c.as_ref().map(|c| c.code().to_string()).unwrap_or_default()
        };

        ConditionRecord {
            id: wire.id.clone(),
            patient_id: wire.subject.as_ref().map(|r| r.id().to_string()).unwrap_or_default(),
            encounter_id: wire
                .encounter
                .as_ref()
                .map(|r| r.id().to_string())
                .unwrap_or_default(),
            clinical_status: concept_code(&wire.clinical_status),
            verification_status: concept_code(&wire.verification_status),
            category: wire
                .category
                .first()
                .map(|c| c.code().to_string())
                .unwrap_or_default(),
            severity: concept_code(&wire.severity),
            code: concept_code(&wire.code),
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
            abatement_date: date::app_date(wire.abatement_date_time.as_deref()),
            recorded_date: date::app_date(wire.recorded_date.as_deref()),
            note: wire.note.first().map(|n| n.text.clone()).unwrap_or_default(),
        }
    }

    fn to_wire(record: &ConditionRecord) -> Condition {
        let code = if record.code.trim().is_empty() && record.code_display.trim().is_empty() {
            None
        } else {
            let system = if record.code_system.trim().is_empty() {
                systems::SNOMED
            } else {
                record.code_system.as_str()
            };
            Some(CodeableConcept::single(
                system,
                &record.code,
                Some(record.code_display.as_str()),
            ))
        };

        Condition {
            id: record.id.as_deref().and_then(non_empty),
            clinical_status: Some(
                CLINICAL_STATUS.concept_or(&record.clinical_status, DEFAULT_CLINICAL_STATUS),
            ),
            verification_status: Some(
                VERIFICATION_STATUS
                    .concept_or(&record.verification_status, DEFAULT_VERIFICATION_STATUS),
            ),
            category: CATEGORY.optional_concept(&record.category).into_iter().collect(),
            severity: SEVERITY.optional_concept(&record.severity),
            code,
            subject: non_empty(&record.patient_id).map(|id| Reference::to("Patient", &id)),
            encounter: non_empty(&record.encounter_id).map(|id| Reference::to("Encounter", &id)),
            onset_date_time: date::format_date(&record.onset_date),
            abatement_date_time: date::format_date(&record.abatement_date),
            recorded_date: date::format_date(&record.recorded_date),
            note: non_empty(&record.note)
                .map(|text| Annotation { text })
                .into_iter()
                .collect(),
        }
    }

    fn to_filter_params(filters: &ConditionFilters) -> SearchParams {
        let mut params = SearchParams::new();
        params.push_opt("code:text", filters.search.as_deref());
        params.push_opt("patient", filters.patient_id.as_deref());
        params.push_opt("encounter", filters.encounter_id.as_deref());
        params.push_opt("clinical-status", filters.clinical_status.as_deref());
        params.push_opt("verification-status", filters.verification_status.as_deref());
        params.push_opt("category", filters.category.as_deref());
        params.push_opt("severity", filters.severity.as_deref());
        params.push_opt("code", filters.code.as_deref());
        params
    }

    fn record_id(record: &ConditionRecord) -> Option<&str> {
        record.id.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::SortDirection;
    use serde_json::json;

    fn sample_record() -> ConditionRecord {
        ConditionRecord {
            id: Some("c1".to_string()),
            patient_id: "42".to_string(),
            encounter_id: "e9".to_string(),
            clinical_status: "active".to_string(),
            verification_status: "confirmed".to_string(),
            category: "problem-list-item".to_string(),
            severity: "6736007".to_string(),
            code: "38341003".to_string(),
            code_display: "Hypertensive disorder".to_string(),
            code_system: systems::SNOMED.to_string(),
            onset_date: "2019-06-01".to_string(),
            abatement_date: "".to_string(),
            recorded_date: "2019-06-03".to_string(),
            note: "Monitor monthly".to_string(),
        }
    }

    #[test]
    fn round_trip_preserves_modeled_fields() {
        let record = sample_record();
        assert_eq!(ConditionMapper::from_wire(&ConditionMapper::to_wire(&record)), record);
    }

    #[test]
    fn statuses_default_when_absent() {
        let wire = ConditionMapper::to_wire(&ConditionRecord {
            code: "38341003".to_string(),
            ..Default::default()
        });

        let clinical = wire.clinical_status.unwrap();
        assert_eq!(clinical.code(), "active");
        assert_eq!(clinical.display(), "Active");
        assert_eq!(wire.verification_status.unwrap().code(), "unconfirmed");
        assert!(wire.id.is_none());
    }

    #[test]
    fn only_first_coding_is_kept() {
        let record = ConditionMapper::from_json(json!({
            "resourceType": "Condition",
            "code": {"coding": [
                {"system": "http://snomed.info/sct", "code": "44054006", "display": "Diabetes mellitus type 2"},
                {"system": "http://hl7.org/fhir/sid/icd-10", "code": "E11", "display": "Type 2 diabetes"}
            ]},
            "subject": {"reference": "Patient/42"}
        }))
        .unwrap();

        assert_eq!(record.code, "44054006");
        assert_eq!(record.patient_id, "42");

        let wire = ConditionMapper::to_wire(&record);
        assert_eq!(wire.code.unwrap().coding.len(), 1);
    }

    #[test]
    fn onset_date_time_is_normalized() {
        let record = ConditionMapper::from_json(json!({
            "resourceType": "Condition",
            "onsetDateTime": "2019-06-01T08:00:00Z"
        }))
        .unwrap();
        assert_eq!(record.onset_date, "2019-06-01");
        assert_eq!(record.clinical_status, "");
    }

    #[test]
    fn filters_use_search_parameter_names() {
        let params = ConditionMapper::to_filter_params(&ConditionFilters {
            patient_id: Some("42".to_string()),
            clinical_status: Some("active".to_string()),
            search: Some("diabetes".to_string()),
            ..Default::default()
        });

        let pairs: Vec<_> = params.iter().collect();
        assert_eq!(
            pairs,
            vec![
                ("code:text", "diabetes"),
                ("patient", "42"),
                ("clinical-status", "active")
            ]
        );
    }

    #[test]
    fn sort_fields_translate_and_pad() {
        let tokens = ConditionMapper::to_sort_fields(
            &["recordedDate", "clinicalStatus"],
            &[SortDirection::Desc],
        );
        assert_eq!(tokens, vec!["-recorded-date", "clinical-status"]);
    }

    #[test]
    fn partial_dates_survive_round_trip() {
        let record = ConditionRecord {
            onset_date: "2019".to_string(),
            abatement_date: "2021-02".to_string(),
            ..sample_record()
        };
        assert_eq!(ConditionMapper::from_wire(&ConditionMapper::to_wire(&record)), record);
    }
}
