//! MedicationRequest: prescriptions

use serde::{Deserialize, Serialize};

use crate::codes::{CodeTable, systems};
use crate::datatypes::{Annotation, CodeableConcept, CodeableReference, Quantity, Reference, non_empty};
use crate::date::{self, DateLike};
use crate::mapper::ResourceMapper;
use crate::resource::fhir_resource;
use crate::search::SearchParams;

pub const DEFAULT_STATUS: &str = "active";
pub const DEFAULT_INTENT: &str = "order";

pub const STATUS: CodeTable = CodeTable::new(
    "http://hl7.org/fhir/CodeSystem/medicationrequest-status",
    &[
        ("active", "Active"),
        ("on-hold", "On Hold"),
        ("ended", "Ended"),
        ("stopped", "Stopped"),
        ("completed", "Completed"),
        ("cancelled", "Cancelled"),
        ("entered-in-error", "Entered in Error"),
        ("draft", "Draft"),
        ("unknown", "Unknown"),
    ],
);

pub const INTENT: CodeTable = CodeTable::new(
    "http://hl7.org/fhir/CodeSystem/medicationrequest-intent",
    &[
        ("proposal", "Proposal"),
        ("plan", "Plan"),
        ("order", "Order"),
        ("original-order", "Original Order"),
        ("reflex-order", "Reflex Order"),
        ("filler-order", "Filler Order"),
        ("instance-order", "Instance Order"),
        ("option", "Option"),
    ],
);

pub const ROUTE: CodeTable = CodeTable::new(
    systems::SNOMED,
    &[
        ("26643006", "Oral route"),
        ("47625008", "Intravenous route"),
        ("78421000", "Intramuscular route"),
        ("34206005", "Subcutaneous route"),
        ("6064005", "Topical route"),
        ("447694001", "Respiratory tract route"),
        ("37161004", "Rectal route"),
    ],
);

/// FHIR MedicationRequest resource
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MedicationRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub medication: Option<CodeableReference>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<Reference>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub encounter: Option<Reference>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub authored_on: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub requester: Option<Reference>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dosage_instruction: Vec<Dosage>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub note: Vec<Annotation>,
}

fhir_resource!(MedicationRequest, "MedicationRequest");

/// How the medication is to be taken
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Dosage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<CodeableConcept>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dose_and_rate: Vec<DoseAndRate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DoseAndRate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dose_quantity: Option<Quantity>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MedicationRequestRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub patient_id: String,
    pub encounter_id: String,
    pub requester_id: String,
    pub status: String,
    pub intent: String,
    /// Referenced Medication id, when prescribed from the formulary
    pub medication_id: String,
    pub medication_code: String,
    pub medication_display: String,
    pub medication_system: String,
    pub authored_on: String,
    pub dosage_text: String,
    pub route: String,
    pub dose_value: Option<f64>,
    pub dose_unit: String,
    pub note: String,
}

impl MedicationRequestRecord {
    pub fn with_authored_on(mut self, value: impl DateLike) -> Self {
        self.authored_on = value.to_iso_date();
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MedicationRequestFilters {
    /// Free-text search over the medication code
    pub search: Option<String>,
    pub patient_id: Option<String>,
    pub encounter_id: Option<String>,
    pub requester_id: Option<String>,
    pub status: Option<String>,
    pub intent: Option<String>,
    pub authored_on: Option<String>,
}

pub struct MedicationRequestMapper;

impl ResourceMapper for MedicationRequestMapper {
    type Wire = MedicationRequest;
    type Record = MedicationRequestRecord;
    type Filters = MedicationRequestFilters;

    const SORT_FIELDS: &'static [(&'static str, &'static str)] = &[
        ("authoredOn", "authoredon"),
        ("patientId", "patient"),
        ("requesterId", "requester"),
        ("medicationDisplay", "code"),
    ];

    fn from_wire(wire: &MedicationRequest) -> MedicationRequestRecord {
        let medication = wire.medication.as_ref();
        let concept = medication.and_then(|m| m.concept.as_ref());
        let dosage = wire.dosage_instruction.first();
        let dose = dosage
            .and_then(|d| d.dose_and_rate.first())
            .and_then(|d| d.dose_quantity.as_ref());
        let ref_id = |r: &Option<Reference>| r.as_ref().map(|r| r.id().to_string()).unwrap_or_default();

        MedicationRequestRecord {
            id: wire.id.clone(),
            patient_id: ref_id(&wire.subject),
            encounter_id: ref_id(&wire.encounter),
            requester_id: ref_id(&wire.requester),
            status: wire.status.clone().unwrap_or_default(),
            intent: wire.intent.clone().unwrap_or_default(),
            medication_id: medication
                .and_then(|m| m.reference.as_ref())
                .map(|r| r.id().to_string())
                .unwrap_or_default(),
            medication_code: concept.map(|c| c.code().to_string()).unwrap_or_default(),
            medication_display: concept.map(|c| c.display().to_string()).unwrap_or_default(),
            medication_system: concept.map(|c| c.system().to_string()).unwrap_or_default(),
            authored_on: date::app_date(wire.authored_on.as_deref()),
            dosage_text: dosage.and_then(|d| d.text.clone()).unwrap_or_default(),
            route: dosage
                .and_then(|d| d.route.as_ref())
                .map(|r| r.code().to_string())
                .unwrap_or_default(),
            dose_value: dose.and_then(|q| q.value),
            dose_unit: dose.and_then(|q| q.unit.clone()).unwrap_or_default(),
            note: wire.note.first().map(|n| n.text.clone()).unwrap_or_default(),
        }
    }

    fn to_wire(record: &MedicationRequestRecord) -> MedicationRequest {
        let concept = if record.medication_code.trim().is_empty()
            && record.medication_display.trim().is_empty()
        {
            None
        } else {
            let system = non_empty(&record.medication_system);
            Some(CodeableConcept::single(
                system.as_deref().unwrap_or(systems::RXNORM),
                &record.medication_code,
                Some(record.medication_display.as_str()),
            ))
        };
        let reference = non_empty(&record.medication_id).map(|id| Reference::to("Medication", &id));
        let medication = (concept.is_some() || reference.is_some())
            .then_some(CodeableReference { concept, reference });

        let dose_unit = non_empty(&record.dose_unit);
        let dose_and_rate = if record.dose_value.is_none() && dose_unit.is_none() {
            Vec::new()
        } else {
            vec![DoseAndRate {
                dose_quantity: Some(Quantity {
                    value: record.dose_value,
                    unit: dose_unit,
                    ..Default::default()
                }),
            }]
        };
        let dosage = Dosage {
            text: non_empty(&record.dosage_text),
            route: ROUTE.optional_concept(&record.route),
            dose_and_rate,
        };

        MedicationRequest {
            id: record.id.as_deref().and_then(non_empty),
            status: Some(non_empty(&record.status).unwrap_or_else(|| DEFAULT_STATUS.to_string())),
            intent: Some(non_empty(&record.intent).unwrap_or_else(|| DEFAULT_INTENT.to_string())),
            medication,
            subject: non_empty(&record.patient_id).map(|id| Reference::to("Patient", &id)),
            encounter: non_empty(&record.encounter_id).map(|id| Reference::to("Encounter", &id)),
            authored_on: date::format_date(&record.authored_on),
            requester: non_empty(&record.requester_id)
                .map(|id| Reference::to("Practitioner", &id)),
            dosage_instruction: if dosage == Dosage::default() {
                Vec::new()
            } else {
                vec![dosage]
            },
            note: non_empty(&record.note)
                .map(|text| Annotation { text })
                .into_iter()
                .collect(),
        }
    }

    fn to_filter_params(filters: &MedicationRequestFilters) -> SearchParams {
        let mut params = SearchParams::new();
        params.push_opt("code:text", filters.search.as_deref());
        params.push_opt("patient", filters.patient_id.as_deref());
        params.push_opt("encounter", filters.encounter_id.as_deref());
        params.push_opt("requester", filters.requester_id.as_deref());
        params.push_opt("status", filters.status.as_deref());
        params.push_opt("intent", filters.intent.as_deref());
        params.push_opt(
            "authoredon",
            filters
                .authored_on
                .as_deref()
                .and_then(date::format_search_date)
                .as_deref(),
        );
        params
    }

    fn record_id(record: &MedicationRequestRecord) -> Option<&str> {
        record.id.as_deref()
    }
}
