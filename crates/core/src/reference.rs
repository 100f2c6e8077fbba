//! Reference string helpers (`"Patient/123"`)

/// Extract the id from a reference string.
///
/// `"Patient/42"` yields `"42"`; a bare id passes through unchanged.
/// Absolute and versioned references (`http://host/fhir/Patient/42`,
/// `Patient/42/_history/3`) also yield `"42"`.
pub fn parse_reference(reference: &str) -> &str {
    let reference = reference.trim();
    let path = match reference.find("/_history/") {
        Some(idx) => &reference[..idx],
        None => reference,
    };

    match path.rsplit_once('/') {
        Some((_, id)) => id,
        None => path,
    }
}

/// Resource type of a reference string, if it has one.
///
/// `"Practitioner/7"` yields `Some("Practitioner")`; `"7"` yields `None`.
pub fn reference_type(reference: &str) -> Option<&str> {
    let reference = reference.trim();
    let path = match reference.find("/_history/") {
        Some(idx) => &reference[..idx],
        None => reference,
    };

    let (head, _) = path.rsplit_once('/')?;
    let resource_type = head.rsplit('/').next().unwrap_or(head);
    let is_type = resource_type
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_uppercase());

    is_type.then_some(resource_type)
}

/// Build a relative reference string from a type and an id.
///
/// An id that is already a reference is returned unchanged.
pub fn make_reference(resource_type: &str, id: &str) -> String {
    let id = id.trim();
    if id.contains('/') {
        id.to_string()
    } else {
        format!("{}/{}", resource_type, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_typed_and_bare_references() {
        assert_eq!(parse_reference("Patient/42"), "42");
        assert_eq!(parse_reference("42"), "42");
        assert_eq!(parse_reference(""), "");
    }

    #[test]
    fn parses_absolute_and_versioned_references() {
        assert_eq!(parse_reference("https://fhir.example.org/r5/Patient/42"), "42");
        assert_eq!(parse_reference("Patient/42/_history/3"), "42");
    }

    #[test]
    fn extracts_reference_type() {
        assert_eq!(reference_type("Practitioner/7"), Some("Practitioner"));
        assert_eq!(reference_type("http://x/fhir/Location/1"), Some("Location"));
        assert_eq!(reference_type("7"), None);
        assert_eq!(reference_type(""), None);
    }

    #[test]
    fn make_reference_keeps_existing_references() {
        assert_eq!(make_reference("Patient", "42"), "Patient/42");
        assert_eq!(make_reference("Patient", "Patient/42"), "Patient/42");
    }
}
