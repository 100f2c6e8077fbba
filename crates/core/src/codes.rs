//! Fixed code → display tables for coded values.
//!
//! Each resource module declares its own tables as constants; mappers
//! take displays from them rather than computing them.

use crate::datatypes::{CodeableConcept, Coding};

/// Terminology system URLs shared by several resources
pub mod systems {
    pub const SNOMED: &str = "http://snomed.info/sct";
    pub const RXNORM: &str = "http://www.nlm.nih.gov/research/umls/rxnorm";
    pub const ACT_CODE: &str = "http://terminology.hl7.org/CodeSystem/v3-ActCode";
    pub const ROLE_CODE: &str = "http://terminology.hl7.org/CodeSystem/v3-RoleCode";
    pub const MARITAL_STATUS: &str = "http://terminology.hl7.org/CodeSystem/v3-MaritalStatus";
    pub const IDENTIFIER_TYPE: &str = "http://terminology.hl7.org/CodeSystem/v2-0203";
    pub const APPOINTMENT_TYPE: &str = "http://terminology.hl7.org/CodeSystem/v2-0276";
    pub const ROUTE: &str = "http://standardterms.edqm.eu";
}

/// Code system plus its code → display entries
#[derive(Debug, Clone, Copy)]
pub struct CodeTable {
    pub system: &'static str,
    pub entries: &'static [(&'static str, &'static str)],
}

impl CodeTable {
    pub const fn new(system: &'static str, entries: &'static [(&'static str, &'static str)]) -> Self {
        Self { system, entries }
    }

    /// Display for a code
    pub fn display(&self, code: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, display)| *display)
    }

    /// Code for a display (case-insensitive)
    pub fn code_for(&self, display: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(_, d)| d.eq_ignore_ascii_case(display.trim()))
            .map(|(code, _)| *code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.display(code).is_some()
    }

    /// All codes in table order
    pub fn codes(&self) -> impl Iterator<Item = &'static str> {
        self.entries.iter().map(|(code, _)| *code)
    }

    /// Coding for `code` with this table's system and display
    pub fn coding(&self, code: &str) -> Coding {
        Coding {
            system: Some(self.system.to_string()),
            code: Some(code.to_string()),
            display: self.display(code).map(str::to_string),
        }
    }

    /// Single-coding concept for `code`
    pub fn concept(&self, code: &str) -> CodeableConcept {
        CodeableConcept {
            coding: vec![self.coding(code)],
            text: None,
        }
    }

    /// Concept for `code`, or for `default` when `code` is empty
    pub fn concept_or(&self, code: &str, default: &str) -> CodeableConcept {
        let code = code.trim();
        self.concept(if code.is_empty() { default } else { code })
    }

    /// Concept for `code`, or `None` when `code` is empty
    pub fn optional_concept(&self, code: &str) -> Option<CodeableConcept> {
        let code = code.trim();
        (!code.is_empty()).then(|| self.concept(code))
    }
}
