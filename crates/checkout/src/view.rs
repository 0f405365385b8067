//! JSON projection of a checkout flow.
//!
//! The view is what API clients see. It is a plain snapshot: derived
//! flags and priced totals included, internal bookkeeping such as
//! session fingerprints and generation counters kept out.

use chrono::{DateTime, Utc};
use driftwood_core::{CheckoutId, CheckoutStatus, MailingAddress, Money, MoneyError, OrderStatus};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::flow::{
    AddressReview, CheckoutFlow, CheckoutForm, OrderSummary, SessionStatus, ShippingStatus, Step,
    StepErrors,
};

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutView {
    pub id: CheckoutId,
    pub status: CheckoutStatus,
    pub step: Step,
    pub step_position: u8,
    pub steps: Vec<StepView>,
    pub form: CheckoutForm,
    pub errors: StepErrors,
    pub address: AddressView,
    pub shipping: ShippingView,
    pub session: SessionView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_error: Option<String>,
    pub pending: PendingView,
    pub summary: OrderSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<OrderView>,
    pub updated_at: DateTime<Utc>,
}

impl CheckoutView {
    /// Builds the client-facing snapshot of a flow.
    ///
    /// # Errors
    ///
    /// Propagates [`MoneyError`] if the cart's figures do not share one
    /// currency.
    pub fn project(flow: &CheckoutFlow, tax_rate: Decimal) -> Result<Self, MoneyError> {
        Ok(Self {
            id: flow.id,
            status: flow.status,
            step: flow.step,
            step_position: flow.step.position(),
            steps: Step::ALL.iter().map(|step| StepView::of(*step)).collect(),
            form: flow.form.clone(),
            errors: flow.errors.clone(),
            address: AddressView::of(&flow.address),
            shipping: ShippingView::of(&flow.shipping),
            session: SessionView::of(&flow.session),
            payment_error: flow.payment_error.clone(),
            pending: PendingView {
                verification: flow.in_flight.verification,
                quote: flow.in_flight.quote,
                session: flow.in_flight.session,
                payment: flow.in_flight.payment,
            },
            summary: flow.summary(tax_rate)?,
            order: flow.order.as_ref().map(|order| OrderView {
                order_id: order.order_id.to_string(),
                status: order.status,
            }),
            updated_at: flow.updated_at,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepView {
    pub step: Step,
    pub position: u8,
    pub label: &'static str,
}

impl StepView {
    fn of(step: Step) -> Self {
        Self {
            step,
            position: step.position(),
            label: step.label(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AddressView {
    Unverified,
    Verified {
        standardized: MailingAddress,
    },
    SuggestionPending {
        entered: MailingAddress,
        suggested: MailingAddress,
        corrections: Vec<String>,
    },
    Unverifiable {
        reason: String,
    },
    CheckFailed {
        message: String,
    },
    Overridden,
}

impl AddressView {
    fn of(review: &AddressReview) -> Self {
        match review {
            AddressReview::Unverified => Self::Unverified,
            AddressReview::Verified { standardized } => Self::Verified {
                standardized: standardized.clone(),
            },
            AddressReview::SuggestionPending {
                entered,
                suggested,
                corrections,
            } => Self::SuggestionPending {
                entered: entered.clone(),
                suggested: suggested.clone(),
                corrections: corrections.clone(),
            },
            AddressReview::Unverifiable { reason } => Self::Unverifiable {
                reason: reason.clone(),
            },
            AddressReview::CheckFailed { message } => Self::CheckFailed {
                message: message.clone(),
            },
            AddressReview::Overridden => Self::Overridden,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ShippingView {
    NotQuoted,
    Quoted {
        amount: Money,
        #[serde(skip_serializing_if = "Option::is_none")]
        destination: Option<String>,
    },
    Failed {
        message: String,
    },
}

impl ShippingView {
    fn of(status: &ShippingStatus) -> Self {
        match status {
            ShippingStatus::NotQuoted => Self::NotQuoted,
            ShippingStatus::Quoted(quote) => Self::Quoted {
                amount: quote.amount,
                destination: quote
                    .destination
                    .as_ref()
                    .map(|zip| zip.as_str().to_string()),
            },
            ShippingStatus::Failed { message } => Self::Failed {
                message: message.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionView {
    NotCreated,
    Active {
        order_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        payment_token: Option<String>,
    },
    Failed {
        message: String,
    },
}

impl SessionView {
    fn of(status: &SessionStatus) -> Self {
        match status {
            SessionStatus::NotCreated => Self::NotCreated,
            SessionStatus::Active(session) => Self::Active {
                order_id: session.order_id.to_string(),
                payment_token: session.payment_token.clone(),
            },
            SessionStatus::Failed { message } => Self::Failed {
                message: message.clone(),
            },
        }
    }
}

/// Which kinds of external calls are outstanding right now.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PendingView {
    pub verification: bool,
    pub quote: bool,
    pub session: bool,
    pub payment: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    pub order_id: String,
    pub status: OrderStatus,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cart::CartSnapshot;
    use driftwood_core::{CartId, CurrencyCode};

    fn flow() -> CheckoutFlow {
        CheckoutFlow::new(
            CheckoutId::new(),
            CartSnapshot {
                id: CartId::from("cart_1"),
                version: 1,
                currency: CurrencyCode::USD,
                lines: vec![],
                discount: Money::zero(CurrencyCode::USD),
            },
        )
    }

    #[test]
    fn test_view_serializes_states_as_tagged_objects() {
        let mut flow = flow();
        flow.shipping = ShippingStatus::Failed {
            message: "rates down".to_string(),
        };

        let view = CheckoutView::project(&flow, Decimal::ZERO).unwrap();
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["step"], "contact");
        assert_eq!(json["step_position"], 1);
        assert_eq!(json["address"]["state"], "unverified");
        assert_eq!(json["shipping"]["state"], "failed");
        assert_eq!(json["shipping"]["message"], "rates down");
        assert_eq!(json["session"]["state"], "not_created");
        assert!(json.get("payment_error").is_none());
    }

    #[test]
    fn test_view_never_exposes_session_fingerprint() {
        let mut flow = flow();
        flow.session = SessionStatus::Active(crate::flow::CheckoutSession {
            order_id: driftwood_core::OrderId::from("ord_1"),
            payment_token: Some("tok_1".to_string()),
            fingerprint: "deadbeef".to_string(),
        });

        let view = CheckoutView::project(&flow, Decimal::ZERO).unwrap();
        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("deadbeef"));
        assert!(json.contains("tok_1"));
    }
}
