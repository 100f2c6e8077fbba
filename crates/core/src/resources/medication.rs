//! Medication: formulary entries

use serde::{Deserialize, Serialize};

use crate::codes::{CodeTable, systems};
use crate::datatypes::{CodeableConcept, non_empty};
use crate::date::{self, DateLike};
use crate::mapper::ResourceMapper;
use crate::resource::fhir_resource;
use crate::search::SearchParams;

pub const DEFAULT_STATUS: &str = "active";

pub const STATUS: CodeTable = CodeTable::new(
    "http://hl7.org/fhir/CodeSystem/medication-status",
    &[
        ("active", "Active"),
        ("inactive", "Inactive"),
        ("entered-in-error", "Entered in Error"),
    ],
);

pub const DOSE_FORM: CodeTable = CodeTable::new(
    systems::SNOMED,
    &[
        ("385055001", "Tablet"),
        ("385049006", "Capsule"),
        ("385023001", "Oral solution"),
        ("385024007", "Oral suspension"),
        ("385219001", "Solution for injection"),
        ("385101003", "Ointment"),
        ("385099005", "Cream"),
        ("421720008", "Spray"),
        ("420699003", "Inhalation powder"),
    ],
);

/// FHIR Medication resource
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<CodeableConcept>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dose_form: Option<CodeableConcept>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch: Option<MedicationBatch>,
}

fhir_resource!(Medication, "Medication");

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MedicationBatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lot_number: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MedicationRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub code: String,
    pub code_display: String,
    pub code_system: String,
    pub status: String,
    /// SNOMED dose form code
    pub dose_form: String,
    pub lot_number: String,
    pub expiration_date: String,
}

impl MedicationRecord {
    pub fn with_expiration_date(mut self, value: impl DateLike) -> Self {
        self.expiration_date = value.to_iso_date();
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MedicationFilters {
    /// Free-text search over the medication code
    pub search: Option<String>,
    pub code: Option<String>,
    pub status: Option<String>,
    pub dose_form: Option<String>,
    pub lot_number: Option<String>,
}

pub struct MedicationMapper;

impl ResourceMapper for MedicationMapper {
    type Wire = Medication;
    type Record = MedicationRecord;
    type Filters = MedicationFilters;

    const SORT_FIELDS: &'static [(&'static str, &'static str)] = &[
        ("codeDisplay", "code"),
        ("doseForm", "form"),
        ("lotNumber", "lot-number"),
        ("expirationDate", "expiration-date"),
    ];

    fn from_wire(wire: &Medication) -> MedicationRecord {
        let code = wire.code.as_ref();
        let batch = wire.batch.as_ref();

        MedicationRecord {
            id: wire.id.clone(),
            code: code.map(|c| c.code().to_string()).unwrap_or_default(),
            code_display: code.map(|c| c.display().to_string()).unwrap_or_default(),
            code_system: code.map(|c| c.system().to_string()).unwrap_or_default(),
            status: wire.status.clone().unwrap_or_default(),
            dose_form: wire
                .dose_form
                .as_ref()
                .map(|c| c.code().to_string())
                .unwrap_or_default(),
            lot_number: batch.and_then(|b| b.lot_number.clone()).unwrap_or_default(),
            expiration_date: date::app_date(batch.and_then(|b| b.expiration_date.as_deref())),
        }
    }

    fn to_wire(record: &MedicationRecord) -> Medication {
        let code = if record.code.trim().is_empty() && record.code_display.trim().is_empty() {
            None
        } else {
            let system = non_empty(&record.code_system);
            Some(CodeableConcept::single(
                system.as_deref().unwrap_or(systems::RXNORM),
                &record.code,
                Some(record.code_display.as_str()),
            ))
        };

        let batch = MedicationBatch {
            lot_number: non_empty(&record.lot_number),
            expiration_date: date::format_date(&record.expiration_date),
        };

        Medication {
            id: record.id.as_deref().and_then(non_empty),
            code,
            status: Some(non_empty(&record.status).unwrap_or_else(|| DEFAULT_STATUS.to_string())),
            dose_form: DOSE_FORM.optional_concept(&record.dose_form),
            batch: (batch != MedicationBatch::default()).then_some(batch),
        }
    }

    fn to_filter_params(filters: &MedicationFilters) -> SearchParams {
        let mut params = SearchParams::new();
        params.push_opt("code:text", filters.search.as_deref());
        params.push_opt("code", filters.code.as_deref());
        params.push_opt("status", filters.status.as_deref());
        params.push_opt("form", filters.dose_form.as_deref());
        params.push_opt("lot-number", filters.lot_number.as_deref());
        params
    }

    fn record_id(record: &MedicationRecord) -> Option<&str> {
        record.id.as_deref()
    }
}
