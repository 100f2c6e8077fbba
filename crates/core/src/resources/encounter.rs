//! Encounter: visits and admissions

use serde::{Deserialize, Serialize};

use crate::codes::{CodeTable, systems};
use crate::datatypes::{CodeableConcept, CodeableReference, Period, Reference, non_empty};
use crate::date::{self, DateLike};
use crate::mapper::ResourceMapper;
use crate::reference::reference_type;
use crate::resource::fhir_resource;
use crate::search::SearchParams;

pub const DEFAULT_STATUS: &str = "planned";
pub const DEFAULT_CLASS: &str = "AMB";

pub const STATUS: CodeTable = CodeTable::new(
    "http://hl7.org/fhir/encounter-status",
    &[
        ("planned", "Planned"),
        ("in-progress", "In Progress"),
        ("on-hold", "On Hold"),
        ("discharged", "Discharged"),
        ("completed", "Completed"),
        ("cancelled", "Cancelled"),
        ("discontinued", "Discontinued"),
        ("entered-in-error", "Entered in Error"),
        ("unknown", "Unknown"),
    ],
);

pub const CLASS: CodeTable = CodeTable::new(
    systems::ACT_CODE,
    &[
        ("AMB", "ambulatory"),
        ("EMER", "emergency"),
        ("FLD", "field"),
        ("HH", "home health"),
        ("IMP", "inpatient encounter"),
        ("ACUTE", "inpatient acute"),
        ("NONAC", "inpatient non-acute"),
        ("OBSENC", "observation encounter"),
        ("PRENC", "pre-admission"),
        ("SS", "short stay"),
        ("VR", "virtual"),
    ],
);

/// Participation type for the attending practitioner
pub const PARTICIPANT_TYPE: CodeTable = CodeTable::new(
    "http://terminology.hl7.org/CodeSystem/v3-ParticipationType",
    &[
        ("ATND", "attender"),
        ("CON", "consultant"),
        ("REF", "referrer"),
        ("PPRF", "primary performer"),
    ],
);

/// FHIR Encounter resource
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Encounter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub class: Vec<CodeableConcept>,

    #[serde(rename = "type", default, skip_serializing_if = "Vec::is_empty")]
    pub encounter_type: Vec<CodeableConcept>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<Reference>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub participant: Vec<EncounterParticipant>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_period: Option<Period>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reason: Vec<EncounterReason>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub location: Vec<EncounterLocation>,
}

fhir_resource!(Encounter, "Encounter");

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EncounterParticipant {
    #[serde(rename = "type", default, skip_serializing_if = "Vec::is_empty")]
    pub participant_type: Vec<CodeableConcept>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<Reference>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EncounterReason {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub value: Vec<CodeableReference>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EncounterLocation {
    pub location: Reference,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EncounterRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub patient_id: String,
    pub practitioner_id: String,
    pub location_id: String,
    pub status: String,
    pub class_code: String,
    pub type_code: String,
    pub type_display: String,
    /// RFC 3339 start of the visit
    pub start: String,
    pub end: String,
    pub reason: String,
}

impl EncounterRecord {
    pub fn with_start(mut self, value: impl DateLike) -> Self {
        self.start = value.to_iso_date_time();
        self
    }

    pub fn with_end(mut self, value: impl DateLike) -> Self {
        self.end = value.to_iso_date_time();
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EncounterFilters {
    /// Free-text search over the encounter type
    pub search: Option<String>,
    pub patient_id: Option<String>,
    pub practitioner_id: Option<String>,
    pub location_id: Option<String>,
    pub status: Option<String>,
    pub class_code: Option<String>,
    /// Date the encounter overlaps (`YYYY-MM-DD`)
    pub date: Option<String>,
}

pub struct EncounterMapper;

impl ResourceMapper for EncounterMapper {
    type Wire = Encounter;
    type Record = EncounterRecord;
    type Filters = EncounterFilters;

    const SORT_FIELDS: &'static [(&'static str, &'static str)] = &[
        ("start", "date"),
        ("end", "end-date"),
        ("classCode", "class"),
        ("typeDisplay", "type"),
        ("patientId", "patient"),
        ("practitionerId", "practitioner"),
        ("locationId", "location"),
    ];

    fn from_wire(wire: &Encounter) -> EncounterRecord {
        let practitioner_id = wire
            .participant
            .iter()
            .filter_map(|p| p.actor.as_ref())
            .find(|actor| {
                let reference = actor.reference.as_deref().unwrap_or("");
                matches!(reference_type(reference), Some("Practitioner") | None)
            })
            .map(|actor| actor.id().to_string())
            .unwrap_or_default();
        let period = wire.actual_period.as_ref();
        let encounter_type = wire.encounter_type.first();

        EncounterRecord {
            id: wire.id.clone(),
            patient_id: wire.subject.as_ref().map(|r| r.id().to_string()).unwrap_or_default(),
            practitioner_id,
            location_id: wire
                .location
                .first()
                .map(|l| l.location.id().to_string())
                .unwrap_or_default(),
            status: wire.status.clone().unwrap_or_default(),
            class_code: wire.class.first().map(|c| c.code().to_string()).unwrap_or_default(),
            type_code: encounter_type.map(|c| c.code().to_string()).unwrap_or_default(),
            type_display: encounter_type.map(|c| c.display().to_string()).unwrap_or_default(),
            start: date::app_date_time(period.and_then(|p| p.start.as_deref())),
            end: date::app_date_time(period.and_then(|p| p.end.as_deref())),
            reason: wire
                .reason
                .first()
                .and_then(|r| r.value.first())
                .and_then(|v| v.concept.as_ref())
                .map(|c| c.display().to_string())
                .unwrap_or_default(),
        }
    }

    fn to_wire(record: &EncounterRecord) -> Encounter {
        let period = Period {
            start: date::format_date_time(&record.start),
            end: date::format_date_time(&record.end),
        };
        let encounter_type = if record.type_code.trim().is_empty()
            && record.type_display.trim().is_empty()
        {
            Vec::new()
        } else {
            vec![CodeableConcept::single(
                systems::SNOMED,
                &record.type_code,
                Some(record.type_display.as_str()),
            )]
        };

        Encounter {
            id: record.id.as_deref().and_then(non_empty),
            status: Some(non_empty(&record.status).unwrap_or_else(|| DEFAULT_STATUS.to_string())),
            class: vec![CLASS.concept_or(&record.class_code, DEFAULT_CLASS)],
            encounter_type,
            subject: non_empty(&record.patient_id).map(|id| Reference::to("Patient", &id)),
            participant: non_empty(&record.practitioner_id)
                .map(|id| EncounterParticipant {
                    participant_type: vec![PARTICIPANT_TYPE.concept("ATND")],
                    actor: Some(Reference::to("Practitioner", &id)),
                })
                .into_iter()
                .collect(),
            actual_period: (period != Period::default()).then_some(period),
            reason: non_empty(&record.reason)
                .map(|text| EncounterReason {
                    value: vec![CodeableReference::concept(CodeableConcept {
                        coding: Vec::new(),
                        text: Some(text),
                    })],
                })
                .into_iter()
                .collect(),
            location: non_empty(&record.location_id)
                .map(|id| EncounterLocation {
                    location: Reference::to("Location", &id),
                })
                .into_iter()
                .collect(),
        }
    }

    fn to_filter_params(filters: &EncounterFilters) -> SearchParams {
        let mut params = SearchParams::new();
        params.push_opt("type:text", filters.search.as_deref());
        params.push_opt("patient", filters.patient_id.as_deref());
        params.push_opt("practitioner", filters.practitioner_id.as_deref());
        params.push_opt("location", filters.location_id.as_deref());
        params.push_opt("status", filters.status.as_deref());
        params.push_opt("class", filters.class_code.as_deref());
        params.push_opt(
            "date",
            filters.date.as_deref().and_then(date::format_search_date).as_deref(),
        );
        params
    }

    fn record_id(record: &EncounterRecord) -> Option<&str> {
        record.id.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_record() -> EncounterRecord {
        EncounterRecord {
            id: Some("e9".to_string()),
            patient_id: "42".to_string(),
            practitioner_id: "7".to_string(),
            location_id: "loc1".to_string(),
            status: "in-progress".to_string(),
            class_code: "AMB".to_string(),
            type_code: "185349003".to_string(),
            type_display: "Encounter for check up".to_string(),
            start: "2024-03-01T09:00:00Z".to_string(),
            end: "2024-03-01T09:30:00Z".to_string(),
            reason: "Blood pressure review".to_string(),
        }
    }

    #[test]
    fn round_trip_preserves_modeled_fields() {
        let record = sample_record();
        assert_eq!(EncounterMapper::from_wire(&EncounterMapper::to_wire(&record)), record);
    }

    #[test]
    fn class_and_status_default() {
        let wire = EncounterMapper::to_wire(&EncounterRecord::default());
        assert_eq!(wire.status.as_deref(), Some("planned"));
        assert_eq!(wire.class[0].code(), "AMB");
        assert_eq!(wire.class[0].display(), "ambulatory");
        assert!(wire.actual_period.is_none());
    }

    #[test]
    fn practitioner_is_picked_from_participants_by_reference_type() {
        let record = EncounterMapper::from_json(json!({
            "resourceType": "Encounter",
            "participant": [
                {"actor": {"reference": "RelatedPerson/r1"}},
                {"actor": {"reference": "Practitioner/7"}}
            ],
            "actualPeriod": {"start": "2024-03-01T17:00:00+08:00"}
        }))
        .unwrap();

        assert_eq!(record.practitioner_id, "7");
        assert_eq!(record.start, "2024-03-01T09:00:00Z");
        assert_eq!(record.end, "");
    }

    #[test]
    fn search_aliases_type_text() {
        let params = EncounterMapper::to_filter_params(&EncounterFilters {
            search: Some("check up".to_string()),
            date: Some("2024-03-01T10:00:00Z".to_string()),
            ..Default::default()
        });
        let pairs: Vec<_> = params.iter().collect();
        assert_eq!(pairs, vec![("type:text", "check up"), ("date", "2024-03-01")]);
    }

    #[test]
    fn partial_period_start_survives_round_trip() {
        let record = EncounterRecord {
            start: "2024-03".to_string(),
            end: "".to_string(),
            ..sample_record()
        };
        assert_eq!(EncounterMapper::from_wire(&EncounterMapper::to_wire(&record)), record);
    }

    #[test]
    fn prefixed_date_filter_is_kept() {
        let params = EncounterMapper::to_filter_params(&EncounterFilters {
            date: Some("ge2024-01-01".to_string()),
            ..Default::default()
        });
        assert_eq!(params.get("date"), Some("ge2024-01-01"));

        let params = EncounterMapper::to_filter_params(&EncounterFilters {
            date: Some("lt2024-06".to_string()),
            ..Default::default()
        });
        assert_eq!(params.get("date"), Some("lt2024-06"));
    }

    #[test]
    fn period_accepts_chrono_values() {
        use chrono::TimeZone;

        let start = chrono::Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let record = EncounterRecord::default()
            .with_start(start)
            .with_end("2024-03-01T09:30:00+00:00");
        assert_eq!(record.start, "2024-03-01T09:00:00Z");
        assert_eq!(record.end, "2024-03-01T09:30:00Z");
    }
}
