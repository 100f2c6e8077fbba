//! Pre-flight field checks shared by record validators.
//!
//! Validators return human-readable messages; an empty list means the
//! record may be submitted. Nothing here is enforced by the client.

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

static PHONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9][0-9 ()\-]{5,19}$").expect("valid phone regex"));

static POSTAL_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9 \-]{1,9}$").expect("valid postal code regex"));

pub(crate) fn is_email(value: &str) -> bool {
    EMAIL.is_match(value.trim())
}

pub(crate) fn is_phone(value: &str) -> bool {
    PHONE.is_match(value.trim())
}

pub(crate) fn is_postal_code(value: &str) -> bool {
    POSTAL_CODE.is_match(value.trim())
}

/// Collects validation messages for one record
#[derive(Debug, Default)]
pub(crate) struct Checks(Vec<String>);

impl Checks {
    pub fn required(&mut self, value: &str, label: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.0.push(format!("{label} is required"));
        }
        self
    }

    pub fn max_len(&mut self, value: &str, max: usize, label: &str) -> &mut Self {
        if value.trim().chars().count() > max {
            self.0.push(format!("{label} must be at most {max} characters"));
        }
        self
    }

    /// Optional field that must match `check` when present
    pub fn format(&mut self, value: &str, check: fn(&str) -> bool, label: &str) -> &mut Self {
        if !value.trim().is_empty() && !check(value) {
            self.0.push(format!("{label} is not valid"));
        }
        self
    }

    /// Optional field whose value must be one of `allowed`
    pub fn one_of<'a>(
        &mut self,
        value: &str,
        allowed: impl IntoIterator<Item = &'a str>,
        label: &str,
    ) -> &mut Self {
        let value = value.trim();
        if !value.is_empty() && !allowed.into_iter().any(|a| a.eq_ignore_ascii_case(value)) {
            self.0.push(format!("{label} '{value}' is not recognised"));
        }
        self
    }

    pub fn push(&mut self, message: String) -> &mut Self {
        self.0.push(message);
        self
    }

    pub fn finish(&mut self) -> Vec<String> {
        std::mem::take(&mut self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_and_phone_formats() {
        assert!(is_email("a.lee@clinic.sg"));
        assert!(!is_email("a.lee@clinic"));
        assert!(!is_email("a lee@clinic.sg"));

        assert!(is_phone("+65 6123 4567"));
        assert!(is_phone("(555) 010-9999"));
        assert!(!is_phone("call me"));
        assert!(!is_phone("12"));
    }

    #[test]
    fn checks_collect_messages_in_order() {
        let messages = Checks::default()
            .required("", "Name")
            .format("nope", is_email, "Email")
            .one_of("teleport", ["active", "inactive"], "Status")
            .format("", is_phone, "Phone")
            .finish();

        assert_eq!(
            messages,
            vec![
                "Name is required".to_string(),
                "Email is not valid".to_string(),
                "Status 'teleport' is not recognised".to_string(),
            ]
        );
    }
}
