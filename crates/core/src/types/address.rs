//! Mailing address type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A US mailing address as collected at checkout or returned by the
/// address standardization service.
///
/// Fields are free-form strings; structural validation (non-empty, ZIP
/// shape) happens at the checkout form layer, and authoritative correction
/// comes from the standardization service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailingAddress {
    /// Street number and name (e.g., "1600 Pennsylvania Ave NW").
    pub street: String,
    /// Apartment, suite, or unit, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// City name.
    pub city: String,
    /// State or province code (e.g., "CA").
    pub state: String,
    /// ZIP or ZIP+4.
    pub postal_code: String,
    /// ISO country code; checkout currently ships domestically only.
    pub country: String,
}

impl MailingAddress {
    /// Whether `other` is the same address up to letter case and
    /// surrounding whitespace in every field.
    ///
    /// This is the auto-accept test for standardization results: when the
    /// service returns an address loosely equal to what the user typed,
    /// there is nothing to confirm.
    #[must_use]
    pub fn eq_ignoring_case(&self, other: &Self) -> bool {
        normalized(&self.street) == normalized(&other.street)
            && normalized_opt(self.unit.as_deref()) == normalized_opt(other.unit.as_deref())
            && normalized(&self.city) == normalized(&other.city)
            && normalized(&self.state) == normalized(&other.state)
            && normalized(&self.postal_code) == normalized(&other.postal_code)
            && normalized(&self.country) == normalized(&other.country)
    }
}

impl fmt::Display for MailingAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.street)?;
        if let Some(unit) = &self.unit {
            write!(f, " {unit}")?;
        }
        write!(
            f,
            ", {}, {} {}",
            self.city, self.state, self.postal_code
        )
    }
}

fn normalized(s: &str) -> String {
    s.trim().to_lowercase()
}

/// An absent unit and a blank unit are the same thing.
fn normalized_opt(s: Option<&str>) -> Option<String> {
    match s {
        None => None,
        Some(value) => {
            let n = normalized(value);
            if n.is_empty() { None } else { Some(n) }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MailingAddress {
        MailingAddress {
            street: "123 Harbor Ln".to_string(),
            unit: Some("Apt 4".to_string()),
            city: "Portsmouth".to_string(),
            state: "NH".to_string(),
            postal_code: "03801".to_string(),
            country: "US".to_string(),
        }
    }

    #[test]
    fn test_eq_ignoring_case_exact() {
        assert!(sample().eq_ignoring_case(&sample()));
    }

    #[test]
    fn test_eq_ignoring_case_and_whitespace() {
        let mut other = sample();
        other.street = "  123 HARBOR LN ".to_string();
        other.city = "portsmouth".to_string();
        assert!(sample().eq_ignoring_case(&other));
    }

    #[test]
    fn test_blank_unit_equals_missing_unit() {
        let mut a = sample();
        a.unit = None;
        let mut b = sample();
        b.unit = Some("   ".to_string());
        assert!(a.eq_ignoring_case(&b));
    }

    #[test]
    fn test_different_street_not_equal() {
        let mut other = sample();
        other.street = "123 Harbor Lane".to_string();
        assert!(!sample().eq_ignoring_case(&other));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            sample().to_string(),
            "123 Harbor Ln Apt 4, Portsmouth, NH 03801"
        );
    }
}
