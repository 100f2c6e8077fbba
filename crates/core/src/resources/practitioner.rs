//! Practitioner: clinicians and their specialty

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
use crate::validation::{Checks, is_email, is_phone, is_postal_code};

/// Identifier system for practitioner licence numbers
pub const LICENSE_SYSTEM: &str = "urn:emr:practitioner-license";

/// Specialty display → SNOMED CT code
pub const SPECIALTY: CodeTable = CodeTable::new(
    systems::SNOMED,
    &[
        ("394579002", "Cardiology"),
        ("394582007", "Dermatology"),
        ("394583002", "Endocrinology"),
        ("394584008", "Gastroenterology"),
        ("394814009", "General practice"),
        ("394802001", "General medicine"),
        ("394609007", "General surgery"),
        ("394591006", "Neurology"),
        ("394585009", "Obstetrics and gynecology"),
        ("394592004", "Oncology"),
        ("394594003", "Ophthalmology"),
        ("394801008", "Orthopedics"),
        ("394537008", "Pediatrics"),
        ("394587001", "Psychiatry"),
        ("394914008", "Radiology"),
        ("419192003", "Internal medicine"),
    ],
);

pub const GENDER: CodeTable = super::patient::GENDER;

/// FHIR Practitioner resource
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Practitioner {
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

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub qualification: Vec<Qualification>,
}

fhir_resource!(Practitioner, "Practitioner");

/// Certification or specialty held by a practitioner
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Qualification {
    pub code: CodeableConcept,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<Reference>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PractitionerRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub license_number: String,
    pub prefix: String,
    pub family_name: String,
    pub given_name: String,
    pub gender: String,
    pub birth_date: String,
    /// Specialty display name, e.g. `Cardiology`
    pub specialty: String,
    pub phone: String,
    pub email: String,
    pub address_line: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub active: bool,
}

impl PractitionerRecord {
    pub fn with_birth_date(mut self, value: impl DateLike) -> Self {
        self.birth_date = value.to_iso_date();
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PractitionerFilters {
    /// Free-text name search
    pub search: Option<String>,
    pub name: Option<String>,
    pub license_number: Option<String>,
    pub gender: Option<String>,
    pub email: Option<String>,
    pub active: Option<bool>,
}

pub struct PractitionerMapper;

impl ResourceMapper for PractitionerMapper {
    type Wire = Practitioner;
    type Record = PractitionerRecord;
    type Filters = PractitionerFilters;

    const SORT_FIELDS: &'static [(&'static str, &'static str)] = &[
        ("familyName", "family"),
        ("givenName", "given"),
        ("name", "family"),
        ("licenseNumber", "identifier"),
        ("birthDate", "birthdate"),
        ("lastUpdated", "_lastUpdated"),
    ];

    fn from_wire(wire: &Practitioner) -> PractitionerRecord {
        let name = wire.name.first();
        let address = wire.address.first();
        let specialty = wire
            .qualification
            .first()
            .map(|q| {
                let display = q.code.display();
                if display.is_empty() {
                    SPECIALTY.display(q.code.code()).unwrap_or("").to_string()
                } else {
                    display.to_string()
                }
            })
            .unwrap_or_default();

        PractitionerRecord {
            id: wire.id.clone(),
            license_number: wire
                .identifier
                .iter()
                .find(|i| i.system.as_deref() == Some(LICENSE_SYSTEM))
                .or_else(|| wire.identifier.first())
                .and_then(|i| i.value.clone())
                .unwrap_or_default(),
            prefix: name.map(|n| n.prefix.join(" ")).unwrap_or_default(),
            family_name: name.and_then(|n| n.family.clone()).unwrap_or_default(),
            given_name: name.map(|n| n.given.join(" ")).unwrap_or_default(),
            gender: wire.gender.clone().unwrap_or_default(),
            birth_date: date::app_date(wire.birth_date.as_deref()),
            specialty,
            phone: telecom_value(&wire.telecom, "phone").to_string(),
            email: telecom_value(&wire.telecom, "email").to_string(),
            address_line: address.map(|a| a.line.join(", ")).unwrap_or_default(),
            city: address.and_then(|a| a.city.clone()).unwrap_or_default(),
            state: address.and_then(|a| a.state.clone()).unwrap_or_default(),
            postal_code: address.and_then(|a| a.postal_code.clone()).unwrap_or_default(),
            country: address.and_then(|a| a.country.clone()).unwrap_or_default(),
            active: wire.active.unwrap_or(true),
        }
    }

    fn to_wire(record: &PractitionerRecord) -> Practitioner {
        let family = non_empty(&record.family_name);
        let given: Vec<String> = record
            .given_name
            .split_whitespace()
            .map(str::to_string)
            .collect();
        let prefix: Vec<String> = record
            .prefix
            .split_whitespace()
            .map(str::to_string)
            .collect();
        let name = if family.is_none() && given.is_empty() && prefix.is_empty() {
            Vec::new()
        } else {
            vec![HumanName {
                use_type: Some("official".to_string()),
                family,
                given,
                prefix,
                ..Default::default()
            }]
        };

        let qualification = non_empty(&record.specialty)
            .map(|specialty| {
                let code = match SPECIALTY.code_for(&specialty) {
                    Some(code) => SPECIALTY.concept(code),
                    None => CodeableConcept {
                        coding: Vec::new(),
                        text: Some(specialty),
                    },
                };
                Qualification { code, issuer: None }
            })
            .into_iter()
            .collect();

        Practitioner {
            id: record.id.as_deref().and_then(non_empty),
            identifier: non_empty(&record.license_number)
                .map(|value| Identifier {
                    system: Some(LICENSE_SYSTEM.to_string()),
                    value: Some(value),
                    ..Default::default()
                })
                .into_iter()
                .collect(),
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
            qualification,
        }
    }

    fn to_filter_params(filters: &PractitionerFilters) -> SearchParams {
        let mut params = SearchParams::new();
        params.push_opt("name", filters.search.as_deref());
        params.push_opt("name", filters.name.as_deref());
        params.push_opt("identifier", filters.license_number.as_deref());
        params.push_opt("gender", filters.gender.as_deref());
        params.push_opt("email", filters.email.as_deref());
        if let Some(active) = filters.active {
            params.push("active", active.to_string());
        }
        params
    }

    fn record_id(record: &PractitionerRecord) -> Option<&str> {
        record.id.as_deref()
    }
}

/// Pre-flight checks before creating or updating a practitioner
pub fn validate(record: &PractitionerRecord) -> Vec<String> {
    let mut checks = Checks::default();
    checks
        .required(&record.family_name, "Family name")
        .required(&record.given_name, "Given name")
        .max_len(&record.family_name, 100, "Family name")
        .max_len(&record.given_name, 100, "Given name")
        .one_of(&record.gender, GENDER.codes(), "Gender")
        .format(&record.email, is_email, "Email")
        .format(&record.phone, is_phone, "Phone")
        .format(&record.postal_code, is_postal_code, "Postal code");

    if !record.specialty.trim().is_empty() && SPECIALTY.code_for(&record.specialty).is_none() {
        checks.push(format!("Specialty '{}' is not recognised", record.specialty.trim()));
    }

    if !record.birth_date.trim().is_empty() && date::format_date(&record.birth_date).is_none() {
        checks.push("Birth date is not a valid date".to_string());
    }

    checks.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_record() -> PractitionerRecord {
        PractitionerRecord {
            id: Some("7".to_string()),
            license_number: "M12345".to_string(),
            prefix: "Dr".to_string(),
            family_name: "Lim".to_string(),
            given_name: "Wei Jie".to_string(),
            gender: "male".to_string(),
            birth_date: "1978-11-02".to_string(),
            specialty: "Cardiology".to_string(),
            phone: "+65 6000 1234".to_string(),
            email: "wj.lim@clinic.sg".to_string(),
            address_line: "3 Hospital Drive".to_string(),
            city: "Singapore".to_string(),
            state: "".to_string(),
            postal_code: "169609".to_string(),
            country: "SG".to_string(),
            active: true,
        }
    }

    #[test]
    fn round_trip_preserves_modeled_fields() {
        let record = sample_record();
        assert_eq!(
            PractitionerMapper::from_wire(&PractitionerMapper::to_wire(&record)),
            record
        );
    }

    #[test]
    fn specialty_display_maps_to_snomed_code() {
        let json = PractitionerMapper::to_json(&sample_record()).unwrap();
        let coding = &json["qualification"][0]["code"]["coding"][0];

        assert_eq!(coding["system"], systems::SNOMED);
        assert_eq!(coding["code"], "394579002");
        assert_eq!(coding["display"], "Cardiology");
    }

    #[test]
    fn specialty_falls_back_to_code_table_when_display_missing() {
        let record = PractitionerMapper::from_json(json!({
            "resourceType": "Practitioner",
            "qualification": [{"code": {"coding": [{"system": systems::SNOMED, "code": "394591006"}]}}]
        }))
        .unwrap();

        assert_eq!(record.specialty, "Neurology");
    }

    #[test]
    fn unknown_specialty_is_kept_as_text() {
        let record = PractitionerRecord {
            specialty: "Sports medicine".to_string(),
            ..Default::default()
        };
        let wire = PractitionerMapper::to_wire(&record);

        assert!(wire.qualification[0].code.coding.is_empty());
        assert_eq!(PractitionerMapper::from_wire(&wire).specialty, "Sports medicine");
    }

    #[test]
    fn search_and_name_filters_coexist() {
        let params = PractitionerMapper::to_filter_params(&PractitionerFilters {
            search: Some("Lim".to_string()),
            name: Some("Wei".to_string()),
            ..Default::default()
        });

        let pairs: Vec<_> = params.iter().collect();
        assert_eq!(pairs, vec![("name", "Lim"), ("name", "Wei")]);
    }

    #[test]
    fn validate_accepts_complete_record() {
        assert!(validate(&sample_record()).is_empty());
    }

    #[test]
    fn validate_reports_each_problem() {
        let record = PractitionerRecord {
            given_name: "Ann".to_string(),
            email: "ann-at-clinic".to_string(),
            specialty: "Astrology".to_string(),
            birth_date: "last spring".to_string(),
            ..Default::default()
        };

        assert_eq!(
            validate(&record),
            vec![
                "Family name is required".to_string(),
                "Email is not valid".to_string(),
                "Specialty 'Astrology' is not recognised".to_string(),
                "Birth date is not a valid date".to_string(),
            ]
        );
    }

    #[test]
    fn partial_birth_date_survives_round_trip() {
        let record = PractitionerRecord {
            birth_date: "1978-11".to_string(),
            ..sample_record()
        };
        assert_eq!(
            PractitionerMapper::from_wire(&PractitionerMapper::to_wire(&record)),
            record
        );
        assert!(validate(&record).is_empty());
    }
}
