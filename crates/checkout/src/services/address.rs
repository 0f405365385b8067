//! Address standardization client.
//!
//! Wraps the postal standardization vendor. The vendor either matches an
//! address to its canonical deliverable form or declares it unmatchable;
//! this module turns that answer into the tri-state outcome the flow
//! works with.

use async_trait::async_trait;
use driftwood_core::MailingAddress;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;

use crate::config::UpstreamConfig;

/// Errors that can occur when calling the standardization vendor.
#[derive(Debug, Error)]
pub enum AddressServiceError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// What a verification attempt concluded about an address.
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationOutcome {
    /// Deliverable, and the canonical form matches what was entered.
    Verified { standardized: MailingAddress },
    /// Deliverable, but the canonical form differs enough that the
    /// shopper should confirm it.
    CorrectionsAvailable {
        standardized: MailingAddress,
        corrections: Vec<String>,
    },
    /// The vendor could not match the address.
    Failed { reason: String },
}

/// Verifies shipping addresses against a postal standardization service.
#[async_trait]
pub trait AddressVerifier: Send + Sync {
    /// Checks one address.
    ///
    /// # Errors
    ///
    /// Returns an error only when the vendor could not be reached or
    /// answered unintelligibly. "The address is bad" is a successful
    /// answer, reported as [`VerificationOutcome::Failed`].
    async fn verify(
        &self,
        address: &MailingAddress,
    ) -> Result<VerificationOutcome, AddressServiceError>;
}

/// HTTP client for the standardization vendor.
#[derive(Clone)]
pub struct StandardizeClient {
    client: reqwest::Client,
    base_url: String,
}

impl StandardizeClient {
    /// Create a new standardization client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &UpstreamConfig) -> Result<Self, AddressServiceError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.api_key.expose_secret());
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&auth_value)
                .map_err(|e| AddressServiceError::Parse(format!("Invalid API key format: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl AddressVerifier for StandardizeClient {
    async fn verify(
        &self,
        address: &MailingAddress,
    ) -> Result<VerificationOutcome, AddressServiceError> {
        let url = format!(
            "{}/v1/standardize?street={}&unit={}&city={}&state={}&zip={}&country={}",
            self.base_url,
            urlencoding::encode(&address.street),
            urlencoding::encode(address.unit.as_deref().unwrap_or_default()),
            urlencoding::encode(&address.city),
            urlencoding::encode(&address.state),
            urlencoding::encode(&address.postal_code),
            urlencoding::encode(&address.country),
        );

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AddressServiceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: StandardizeResponse = response
            .json()
            .await
            .map_err(|e| AddressServiceError::Parse(e.to_string()))?;

        Ok(classify(address, body))
    }
}

/// Turns the vendor's answer into a [`VerificationOutcome`].
///
/// The auto-accept rule lives here: a deliverable match whose canonical
/// form equals the entered address (ignoring case and surrounding
/// whitespace) is verified outright, anything else goes back to the
/// shopper with the differences spelled out.
fn classify(entered: &MailingAddress, body: StandardizeResponse) -> VerificationOutcome {
    if !body.deliverable {
        return VerificationOutcome::Failed {
            reason: body
                .reason
                .unwrap_or_else(|| "Address could not be matched".to_string()),
        };
    }

    let Some(candidate) = body.address else {
        return VerificationOutcome::Failed {
            reason: "Vendor returned no standardized address".to_string(),
        };
    };

    let standardized = candidate.into_mailing_address(entered);
    if standardized.eq_ignoring_case(entered) {
        return VerificationOutcome::Verified { standardized };
    }

    let mut corrections = body.notes;
    if corrections.is_empty() {
        corrections = field_corrections(entered, &standardized);
    }

    VerificationOutcome::CorrectionsAvailable {
        standardized,
        corrections,
    }
}

/// Per-field difference notes, for when the vendor sends none of its own.
fn field_corrections(entered: &MailingAddress, suggested: &MailingAddress) -> Vec<String> {
    let mut notes = Vec::new();
    let mut note = |label: &str, from: &str, to: &str| {
        if !from.trim().eq_ignore_ascii_case(to.trim()) {
            notes.push(format!("{label} updated to \"{}\"", to.trim()));
        }
    };

    note("Street", &entered.street, &suggested.street);
    note(
        "Unit",
        entered.unit.as_deref().unwrap_or_default(),
        suggested.unit.as_deref().unwrap_or_default(),
    );
    note("City", &entered.city, &suggested.city);
    note("State", &entered.state, &suggested.state);
    note("ZIP Code", &entered.postal_code, &suggested.postal_code);
    note("Country", &entered.country, &suggested.country);

    notes
}

/// Wire response from `GET /v1/standardize`.
#[derive(Debug, Deserialize)]
struct StandardizeResponse {
    deliverable: bool,
    #[serde(default)]
    address: Option<CandidateAddress>,
    /// Vendor's own correction notes, e.g. "Street suffix standardized".
    #[serde(default)]
    notes: Vec<String>,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateAddress {
    street: String,
    #[serde(default)]
    unit: Option<String>,
    city: String,
    state: String,
    zip: String,
    #[serde(default)]
    country: Option<String>,
}

impl CandidateAddress {
    /// The vendor omits the country for domestic matches; fall back to
    /// what the shopper entered.
    fn into_mailing_address(self, entered: &MailingAddress) -> MailingAddress {
        MailingAddress {
            street: self.street,
            unit: self.unit.filter(|unit| !unit.trim().is_empty()),
            city: self.city,
            state: self.state,
            postal_code: self.zip,
            country: self.country.unwrap_or_else(|| entered.country.clone()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn entered() -> MailingAddress {
        MailingAddress {
            street: "123 harbor lane".to_string(),
            unit: None,
            city: "portsmouth".to_string(),
            state: "nh".to_string(),
            postal_code: "03801".to_string(),
            country: "US".to_string(),
        }
    }

    fn candidate(street: &str, city: &str, state: &str, zip: &str) -> CandidateAddress {
        CandidateAddress {
            street: street.to_string(),
            unit: None,
            city: city.to_string(),
            state: state.to_string(),
            zip: zip.to_string(),
            country: None,
        }
    }

    #[test]
    fn test_classify_auto_accepts_case_only_differences() {
        let body = StandardizeResponse {
            deliverable: true,
            address: Some(candidate("123 HARBOR LANE", "PORTSMOUTH", "NH", "03801")),
            notes: vec![],
            reason: None,
        };

        match classify(&entered(), body) {
            VerificationOutcome::Verified { standardized } => {
                assert_eq!(standardized.street, "123 HARBOR LANE");
            }
            other => panic!("expected Verified, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_reports_material_differences() {
        let body = StandardizeResponse {
            deliverable: true,
            address: Some(candidate("123 HARBOR LN", "PORTSMOUTH", "NH", "03801-4521")),
            notes: vec![],
            reason: None,
        };

        match classify(&entered(), body) {
            VerificationOutcome::CorrectionsAvailable {
                standardized,
                corrections,
            } => {
                assert_eq!(standardized.street, "123 HARBOR LN");
                assert_eq!(corrections.len(), 2);
                assert!(corrections[0].contains("Street"));
                assert!(corrections[1].contains("ZIP"));
            }
            other => panic!("expected CorrectionsAvailable, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_prefers_vendor_notes() {
        let body = StandardizeResponse {
            deliverable: true,
            address: Some(candidate("123 HARBOR LN", "PORTSMOUTH", "NH", "03801")),
            notes: vec!["Street suffix standardized".to_string()],
            reason: None,
        };

        match classify(&entered(), body) {
            VerificationOutcome::CorrectionsAvailable { corrections, .. } => {
                assert_eq!(corrections, vec!["Street suffix standardized".to_string()]);
            }
            other => panic!("expected CorrectionsAvailable, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_undeliverable_fails_with_reason() {
        let body = StandardizeResponse {
            deliverable: false,
            address: None,
            notes: vec![],
            reason: Some("No such street in ZIP".to_string()),
        };

        assert_eq!(
            classify(&entered(), body),
            VerificationOutcome::Failed {
                reason: "No such street in ZIP".to_string(),
            }
        );
    }

    #[test]
    fn test_classify_blank_suggested_unit_matches_missing_unit() {
        let mut body_address = candidate("123 HARBOR LANE", "PORTSMOUTH", "NH", "03801");
        body_address.unit = Some("  ".to_string());
        let body = StandardizeResponse {
            deliverable: true,
            address: Some(body_address),
            notes: vec![],
            reason: None,
        };

        assert!(matches!(
            classify(&entered(), body),
            VerificationOutcome::Verified { .. }
        ));
    }
}
