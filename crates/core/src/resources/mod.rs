//! Per-resource wire types, application records, filters and mappers

pub mod allergy_intolerance;
pub mod appointment;
pub mod condition;
pub mod encounter;
pub mod location;
pub mod medication;
pub mod medication_request;
pub mod patient;
pub mod practitioner;

pub use allergy_intolerance::{
    AllergyIntolerance, AllergyIntoleranceFilters, AllergyIntoleranceMapper,
    AllergyIntoleranceRecord,
};
pub use appointment::{Appointment, AppointmentFilters, AppointmentMapper, AppointmentRecord};
pub use condition::{Condition, ConditionFilters, ConditionMapper, ConditionRecord};
pub use encounter::{Encounter, EncounterFilters, EncounterMapper, EncounterRecord};
pub use location::{Location, LocationFilters, LocationMapper, LocationRecord};
pub use medication::{Medication, MedicationFilters, MedicationMapper, MedicationRecord};
pub use medication_request::{
    MedicationRequest, MedicationRequestFilters, MedicationRequestMapper, MedicationRequestRecord,
};
pub use patient::{Patient, PatientFilters, PatientMapper, PatientRecord};
pub use practitioner::{Practitioner, PractitionerFilters, PractitionerMapper, PractitionerRecord};
