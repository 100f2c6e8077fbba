//! FHIR R5 general-purpose datatypes, reduced to the elements the
//! application reads or writes.

use serde::{Deserialize, Serialize};

/// A code defined by a terminology system
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Coding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

/// Concept expressed as codings plus optional text
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CodeableConcept {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub coding: Vec<Coding>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl CodeableConcept {
    /// Concept with exactly one coding
    pub fn single(system: &str, code: &str, display: Option<&str>) -> Self {
        Self {
            coding: vec![Coding {
                system: non_empty(system),
                code: non_empty(code),
                display: display.and_then(non_empty),
            }],
            text: None,
        }
    }

    /// The first coding; only this one is carried into application records
    pub fn first(&self) -> Option<&Coding> {
        self.coding.first()
    }

    /// Code of the first coding, or `""`
    pub fn code(&self) -> &str {
        self.first().and_then(|c| c.code.as_deref()).unwrap_or("")
    }

    /// Display of the first coding, falling back to the concept text, or `""`
    pub fn display(&self) -> &str {
        self.first()
            .and_then(|c| c.display.as_deref())
            .or(self.text.as_deref())
            .unwrap_or("")
    }

    /// System of the first coding, or `""`
    pub fn system(&self) -> &str {
        self.first().and_then(|c| c.system.as_deref()).unwrap_or("")
    }
}

/// Reference to another resource (`"Patient/123"`)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Reference {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl Reference {
    pub fn to(resource_type: &str, id: &str) -> Self {
        Self {
            reference: Some(crate::reference::make_reference(resource_type, id)),
            display: None,
        }
    }

    /// Referenced id, or `""` if the reference is absent
    pub fn id(&self) -> &str {
        crate::reference::parse_reference(self.reference.as_deref().unwrap_or(""))
    }
}

/// Either a concept or a reference (R5 `CodeableReference`)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CodeableReference {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concept: Option<CodeableConcept>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<Reference>,
}

impl CodeableReference {
    pub fn concept(concept: CodeableConcept) -> Self {
        Self {
            concept: Some(concept),
            reference: None,
        }
    }
}

/// Business identifier (MRN, licence number)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Identifier {
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_type: Option<String>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub id_type: Option<CodeableConcept>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Name of a human
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HumanName {
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub given: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prefix: Vec<String>,
}

/// Phone, email and similar contact details
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ContactPoint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_type: Option<String>,
}

/// Postal address
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_type: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub line: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// Time range
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Period {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

/// Free-text note
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Annotation {
    pub text: String,
}

/// Measured amount
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Quantity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Contact details with purpose (R5 `ExtendedContactDetail`)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExtendedContactDetail {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub telecom: Vec<ContactPoint>,
}

/// `Some(s)` unless `s` is empty after trimming
pub(crate) fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Value of the first contact point with the given system, or `""`
pub(crate) fn telecom_value<'a>(telecom: &'a [ContactPoint], system: &str) -> &'a str {
    telecom
        .iter()
        .find(|t| t.system.as_deref() == Some(system))
        .and_then(|t| t.value.as_deref())
        .unwrap_or("")
}

/// Phone and email contact points, skipping empty values
pub(crate) fn build_telecom(phone: &str, email: &str) -> Vec<ContactPoint> {
    [("phone", phone), ("email", email)]
        .into_iter()
        .filter_map(|(system, value)| {
            non_empty(value).map(|value| ContactPoint {
                system: Some(system.to_string()),
                value: Some(value),
                use_type: None,
            })
        })
        .collect()
}

/// Single address from flattened fields, or `None` when all are empty
pub(crate) fn build_address(
    line: &str,
    city: &str,
    state: &str,
    postal_code: &str,
    country: &str,
) -> Option<Address> {
    let address = Address {
        use_type: None,
        line: non_empty(line).into_iter().collect(),
        city: non_empty(city),
        state: non_empty(state),
        postal_code: non_empty(postal_code),
        country: non_empty(country),
    };

    if address == Address::default() {
        None
    } else {
        Some(address)
    }
}
