use serde::{Deserialize, Serialize};

/// Severity of the issue
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Fatal,
    Error,
    Warning,
    Information,
    #[serde(other)]
    Unknown,
}

/// FHIR OperationOutcome as returned by servers in error responses
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OperationOutcome {
    pub resource_type: String,

    #[serde(default)]
    pub issue: Vec<OperationOutcomeIssue>,
}

/// A single issue within an OperationOutcome
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OperationOutcomeIssue {
    pub severity: IssueSeverity,

    /// Issue type code (e.g. `not-found`, `invalid`); kept as a string so
    /// codes from newer FHIR versions still decode
    pub code: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<OutcomeDetails>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutcomeDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl OperationOutcome {
    /// Parse an OperationOutcome from a response body, if the body is one
    pub fn from_body(body: &[u8]) -> Option<Self> {
        let outcome: Self = serde_json::from_slice(body).ok()?;
        (outcome.resource_type == "OperationOutcome").then_some(outcome)
    }

    /// Human-readable summary of all error-level issues.
    ///
    /// Falls back to every issue when none is error-level, and to `None`
    /// when no issue carries text.
    pub fn summary(&self) -> Option<String> {
        let text = |issue: &OperationOutcomeIssue| {
            issue
                .diagnostics
                .clone()
                .or_else(|| issue.details.as_ref().and_then(|d| d.text.clone()))
        };

        let errors: Vec<String> = self
            .issue
            .iter()
            .filter(|i| matches!(i.severity, IssueSeverity::Fatal | IssueSeverity::Error))
            .filter_map(text)
            .collect();

        let messages = if errors.is_empty() {
            self.issue.iter().filter_map(text).collect()
        } else {
            errors
        };

        if messages.is_empty() {
            None
        } else {
            Some(messages.join("; "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_prefers_error_issues() {
        let body = br#"{
            "resourceType": "OperationOutcome",
            "issue": [
                {"severity": "warning", "code": "informational", "diagnostics": "slow query"},
                {"severity": "error", "code": "not-found", "diagnostics": "Patient/9 not found"}
            ]
        }"#;

        let outcome = OperationOutcome::from_body(body).unwrap();
        assert_eq!(outcome.summary().as_deref(), Some("Patient/9 not found"));
    }

    #[test]
    fn non_outcome_body_is_ignored() {
        assert!(OperationOutcome::from_body(br#"{"resourceType":"Patient"}"#).is_none());
        assert!(OperationOutcome::from_body(b"<html>502</html>").is_none());
    }
}
