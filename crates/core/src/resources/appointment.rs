//! Appointment: scheduled visits
//!
//! Participants are a single list on the wire. The mapper sorts them into
//! patient, practitioner and location by the type prefix of each actor
//! reference.

use serde::{Deserialize, Serialize};

use crate::codes::{CodeTable, systems};
use crate::datatypes::{Annotation, CodeableConcept, CodeableReference, Reference, non_empty};
use crate::date::{self, DateLike};
use crate::mapper::ResourceMapper;
use crate::reference::{parse_reference, reference_type};
use crate::resource::fhir_resource;
use crate::search::SearchParams;

pub const DEFAULT_STATUS: &str = "booked";
pub const DEFAULT_PARTICIPANT_STATUS: &str = "accepted";

pub const STATUS: CodeTable = CodeTable::new(
    "http://hl7.org/fhir/appointmentstatus",
    &[
        ("proposed", "Proposed"),
        ("pending", "Pending"),
        ("booked", "Booked"),
        ("arrived", "Arrived"),
        ("fulfilled", "Fulfilled"),
        ("cancelled", "Cancelled"),
        ("noshow", "No Show"),
        ("entered-in-error", "Entered in error"),
        ("checked-in", "Checked In"),
        ("waitlist", "Waitlisted"),
    ],
);

pub const APPOINTMENT_TYPE: CodeTable = CodeTable::new(
    systems::APPOINTMENT_TYPE,
    &[
        ("CHECKUP", "A routine check-up"),
        ("EMERGENCY", "Emergency appointment"),
        ("FOLLOWUP", "A follow up visit"),
        ("ROUTINE", "Routine appointment"),
        ("WALKIN", "A previously unscheduled walk-in visit"),
    ],
);

/// FHIR Appointment resource
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment_type: Option<CodeableConcept>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reason: Vec<CodeableReference>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub minutes_duration: Option<u32>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub note: Vec<Annotation>,

    #[serde(default)]
    pub participant: Vec<AppointmentParticipant>,
}

fhir_resource!(Appointment, "Appointment");

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppointmentParticipant {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<Reference>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub patient_id: String,
    pub practitioner_id: String,
    pub location_id: String,
    pub status: String,
    /// v2-0276 appointment reason code
    pub appointment_type: String,
    pub description: String,
    pub start: String,
    pub end: String,
    pub minutes_duration: Option<u32>,
    pub reason: String,
    pub note: String,
}

impl AppointmentRecord {
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
pub struct AppointmentFilters {
    /// Free-text search over the appointment reason
    pub search: Option<String>,
    pub patient_id: Option<String>,
    pub practitioner_id: Option<String>,
    pub location_id: Option<String>,
    pub status: Option<String>,
    pub appointment_type: Option<String>,
    pub date: Option<String>,
}

pub struct AppointmentMapper;

impl AppointmentMapper {
    /// Patient, practitioner and location ids from the participants.
    ///
    /// Typed references are matched by resource type first; a bare id then
    /// fills the first slot still empty, in that order.
    fn participant_ids(wire: &Appointment) -> [String; 3] {
        const SLOTS: [&str; 3] = ["Patient", "Practitioner", "Location"];
        let mut ids: [String; 3] = Default::default();

        let references = wire
            .participant
            .iter()
            .filter_map(|p| p.actor.as_ref()?.reference.as_deref())
            .filter(|reference| !reference.trim().is_empty());

        let mut untyped = Vec::new();
        for reference in references {
            match reference_type(reference) {
                Some(kind) => {
                    if let Some(slot) = SLOTS.iter().position(|s| *s == kind) {
                        if ids[slot].is_empty() {
                            ids[slot] = parse_reference(reference).to_string();
                        }
                    }
                }
                None => untyped.push(reference),
            }
        }

        for reference in untyped {
            if let Some(slot) = ids.iter_mut().find(|id| id.is_empty()) {
                *slot = parse_reference(reference).to_string();
            }
        }
        ids
    }

    fn participant(resource_type: &str, id: &str) -> Option<AppointmentParticipant> {
        non_empty(id).map(|id| AppointmentParticipant {
            actor: Some(Reference::to(resource_type, &id)),
            status: Some(DEFAULT_PARTICIPANT_STATUS.to_string()),
        })
    }
}

impl ResourceMapper for AppointmentMapper {
    type Wire = Appointment;
    type Record = AppointmentRecord;
    type Filters = AppointmentFilters;

    const SORT_FIELDS: &'static [(&'static str, &'static str)] = &[
        ("start", "date"),
        ("appointmentType", "appointment-type"),
        ("patientId", "patient"),
        ("practitionerId", "practitioner"),
        ("locationId", "location"),
    ];

    fn from_wire(wire: &Appointment) -> AppointmentRecord {
        let [patient_id, practitioner_id, location_id] = Self::participant_ids(wire);

        AppointmentRecord {
            id: wire.id.clone(),
            patient_id,
            practitioner_id,
            location_id,
            status: wire.status.clone().unwrap_or_default(),
            appointment_type: wire
                .appointment_type
                .as_ref()
                .map(|c| c.code().to_string())
                .unwrap_or_default(),
            description: wire.description.clone().unwrap_or_default(),
            start: date::app_date_time(wire.start.as_deref()),
            end: date::app_date_time(wire.end.as_deref()),
            minutes_duration: wire.minutes_duration,
            reason: wire
                .reason
                .first()
                .and_then(|r| r.concept.as_ref())
                .map(|c| c.display().to_string())
                .unwrap_or_default(),
            note: wire.note.first().map(|n| n.text.clone()).unwrap_or_default(),
        }
    }

    fn to_wire(record: &AppointmentRecord) -> Appointment {
        let participant = [
            Self::participant("Patient", &record.patient_id),
            Self::participant("Practitioner", &record.practitioner_id),
            Self::participant("Location", &record.location_id),
        ]
        .into_iter()
        .flatten()
        .collect();

        Appointment {
            id: record.id.as_deref().and_then(non_empty),
            status: Some(non_empty(&record.status).unwrap_or_else(|| DEFAULT_STATUS.to_string())),
            appointment_type: APPOINTMENT_TYPE.optional_concept(&record.appointment_type),
            reason: non_empty(&record.reason)
                .map(|text| {
                    CodeableReference::concept(CodeableConcept {
                        coding: Vec::new(),
                        text: Some(text),
                    })
                })
                .into_iter()
                .collect(),
            description: non_empty(&record.description),
            start: date::format_date_time(&record.start),
            end: date::format_date_time(&record.end),
            minutes_duration: record.minutes_duration,
            note: non_empty(&record.note)
                .map(|text| Annotation { text })
                .into_iter()
                .collect(),
            participant,
        }
    }

    fn to_filter_params(filters: &AppointmentFilters) -> SearchParams {
        let mut params = SearchParams::new();
        params.push_opt("reason-code:text", filters.search.as_deref());
        params.push_opt("patient", filters.patient_id.as_deref());
        params.push_opt("practitioner", filters.practitioner_id.as_deref());
        params.push_opt("location", filters.location_id.as_deref());
        params.push_opt("status", filters.status.as_deref());
        params.push_opt("appointment-type", filters.appointment_type.as_deref());
        params.push_opt(
            "date",
            filters.date.as_deref().and_then(date::format_search_date).as_deref(),
        );
        params
    }

    fn record_id(record: &AppointmentRecord) -> Option<&str> {
        record.id.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_record() -> AppointmentRecord {
        AppointmentRecord {
            id: Some("a3".to_string()),
            patient_id: "42".to_string(),
            practitioner_id: "7".to_string(),
            location_id: "loc1".to_string(),
            status: "booked".to_string(),
            appointment_type: "FOLLOWUP".to_string(),
            description: "Review lab results".to_string(),
            start: "2024-04-10T01:00:00Z".to_string(),
            end: "2024-04-10T01:20:00Z".to_string(),
            minutes_duration: Some(20),
            reason: "Lab follow-up".to_string(),
            note: "Fasting not required".to_string(),
        }
    }

    #[test]
    fn round_trip_preserves_modeled_fields() {
        let record = sample_record();
        assert_eq!(AppointmentMapper::from_wire(&AppointmentMapper::to_wire(&record)), record);
    }

    #[test]
    fn participants_are_classified_by_reference_type() {
        let record = AppointmentMapper::from_json(json!({
            "resourceType": "Appointment",
            "status": "proposed",
            "participant": [
                {"actor": {"reference": "Location/loc1"}, "status": "accepted"},
                {"actor": {"reference": "Practitioner/7"}, "status": "accepted"},
                {"actor": {"reference": "Patient/42"}, "status": "needs-action"}
            ]
        }))
        .unwrap();

        assert_eq!(record.patient_id, "42");
        assert_eq!(record.practitioner_id, "7");
        assert_eq!(record.location_id, "loc1");
        assert_eq!(record.status, "proposed");
    }

    #[test]
    fn missing_participants_are_blank() {
        let record = AppointmentMapper::from_json(json!({
            "resourceType": "Appointment",
            "participant": [{"actor": {"display": "Walk-in"}}]
        }))
        .unwrap();

        assert_eq!(record.patient_id, "");
        assert_eq!(record.practitioner_id, "");
        assert_eq!(record.minutes_duration, None);
    }

    #[test]
    fn status_defaults_to_booked() {
        let json = AppointmentMapper::to_json(&AppointmentRecord {
            patient_id: "42".to_string(),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(
            json,
            json!({
                "resourceType": "Appointment",
                "status": "booked",
                "participant": [
                    {"actor": {"reference": "Patient/42"}, "status": "accepted"}
                ]
            })
        );
    }

    #[test]
    fn unparsable_start_is_omitted() {
        let wire = AppointmentMapper::to_wire(&AppointmentRecord {
            start: "next tuesday".to_string(),
            ..Default::default()
        });
        assert!(wire.start.is_none());
    }

    #[test]
    fn bare_participant_ids_fill_empty_slots() {
        let record = AppointmentMapper::from_json(json!({
            "resourceType": "Appointment",
            "participant": [{"actor": {"reference": "42"}}]
        }))
        .unwrap();
        assert_eq!(record.patient_id, "42");

        let record = AppointmentMapper::from_json(json!({
            "resourceType": "Appointment",
            "participant": [
                {"actor": {"reference": "7"}},
                {"actor": {"reference": "Patient/42"}}
            ]
        }))
        .unwrap();
        assert_eq!(record.patient_id, "42");
        assert_eq!(record.practitioner_id, "7");
        assert_eq!(record.location_id, "");
    }

    #[test]
    fn date_filter_keeps_prefix() {
        let params = AppointmentMapper::to_filter_params(&AppointmentFilters {
            date: Some("ge2024-04-01".to_string()),
            ..Default::default()
        });
        assert_eq!(params.get("date"), Some("ge2024-04-01"));
    }
}
