//! The checkout form: one draft shared by every step of the wizard.
//!
//! Fields hold raw shopper input. Validation parses them with the strict
//! types from `driftwood_core` but never rewrites what the shopper typed;
//! the only code that overwrites form fields wholesale is the suggested-
//! address acceptance path.

use driftwood_core::{DeliveryMethod, MailingAddress};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::step::Step;

/// Every editable field of the checkout form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    FirstName,
    LastName,
    Email,
    Phone,
    DeliveryMethod,
    DeliveryNotes,
    Street,
    Unit,
    City,
    State,
    PostalCode,
    Country,
    MarketingOptIn,
}

impl Field {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::DeliveryMethod => "delivery_method",
            Self::DeliveryNotes => "delivery_notes",
            Self::Street => "street",
            Self::Unit => "unit",
            Self::City => "city",
            Self::State => "state",
            Self::PostalCode => "postal_code",
            Self::Country => "country",
            Self::MarketingOptIn => "marketing_opt_in",
        }
    }

    /// The wizard step that owns this field.
    #[must_use]
    pub const fn step(self) -> Step {
        match self {
            Self::FirstName | Self::LastName | Self::Email | Self::Phone | Self::MarketingOptIn => {
                Step::Contact
            }
            Self::DeliveryMethod | Self::DeliveryNotes => Step::Delivery,
            Self::Street | Self::Unit | Self::City | Self::State | Self::PostalCode | Self::Country => {
                Step::Address
            }
        }
    }

    /// True for fields that feed address verification and shipping quotes.
    #[must_use]
    pub const fn affects_address(self) -> bool {
        matches!(
            self,
            Self::Street | Self::Unit | Self::City | Self::State | Self::PostalCode | Self::Country
        )
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Draft state of the whole wizard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub marketing_opt_in: bool,
    /// `None` until the shopper picks one; the delivery step requires a pick.
    pub delivery_method: Option<DeliveryMethod>,
    pub delivery_notes: String,
    pub street: String,
    pub unit: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl CheckoutForm {
    #[must_use]
    pub fn new() -> Self {
        Self {
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            phone: String::new(),
            marketing_opt_in: false,
            delivery_method: None,
            delivery_notes: String::new(),
            street: String::new(),
            unit: String::new(),
            city: String::new(),
            state: String::new(),
            postal_code: String::new(),
            country: "US".to_string(),
        }
    }

    /// True when the picked delivery method needs a shipping address.
    /// Treats "nothing picked yet" as needing one.
    #[must_use]
    pub fn needs_shipping_address(&self) -> bool {
        self.delivery_method
            .is_none_or(|method| method.requires_shipping_address())
    }

    /// Assembles the address fields into a [`MailingAddress`], trimmed.
    #[must_use]
    pub fn shipping_address(&self) -> MailingAddress {
        let unit = self.unit.trim();
        MailingAddress {
            street: self.street.trim().to_string(),
            unit: (!unit.is_empty()).then(|| unit.to_string()),
            city: self.city.trim().to_string(),
            state: self.state.trim().to_string(),
            postal_code: self.postal_code.trim().to_string(),
            country: self.country.trim().to_string(),
        }
    }

    /// Overwrites the address fields from a standardized address.
    pub fn put_address(&mut self, address: &MailingAddress) {
        self.street = address.street.clone();
        self.unit = address.unit.clone().unwrap_or_default();
        self.city = address.city.clone();
        self.state = address.state.clone();
        self.postal_code = address.postal_code.clone();
        self.country = address.country.clone();
    }

    /// Applies a patch and reports which fields actually changed value.
    ///
    /// Setting a field to the value it already holds is not a change; the
    /// caller uses the change set to decide which derived state to throw
    /// away, and a no-op write must not invalidate anything.
    pub fn apply(&mut self, patch: &FormPatch) -> PatchOutcome {
        let mut changed = Vec::new();

        let mut set_text = |slot: &mut String, value: &Option<String>, field: Field| {
            if let Some(value) = value
                && slot != value
            {
                *slot = value.clone();
                changed.push(field);
            }
        };

        set_text(&mut self.first_name, &patch.first_name, Field::FirstName);
        set_text(&mut self.last_name, &patch.last_name, Field::LastName);
        set_text(&mut self.email, &patch.email, Field::Email);
        set_text(&mut self.phone, &patch.phone, Field::Phone);
        set_text(&mut self.delivery_notes, &patch.delivery_notes, Field::DeliveryNotes);
        set_text(&mut self.street, &patch.street, Field::Street);
        set_text(&mut self.unit, &patch.unit, Field::Unit);
        set_text(&mut self.city, &patch.city, Field::City);
        set_text(&mut self.state, &patch.state, Field::State);
        set_text(&mut self.postal_code, &patch.postal_code, Field::PostalCode);
        set_text(&mut self.country, &patch.country, Field::Country);

        if let Some(opt_in) = patch.marketing_opt_in
            && self.marketing_opt_in != opt_in
        {
            self.marketing_opt_in = opt_in;
            changed.push(Field::MarketingOptIn);
        }
        if let Some(method) = patch.delivery_method
            && self.delivery_method != Some(method)
        {
            self.delivery_method = Some(method);
            changed.push(Field::DeliveryMethod);
        }

        PatchOutcome { changed }
    }

    /// Wipes everything the shopper typed. Runs after order completion.
    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

impl Default for CheckoutForm {
    fn default() -> Self {
        Self::new()
    }
}

/// Partial update to the form. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marketing_opt_in: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_method: Option<DeliveryMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl FormPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// What a patch actually did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchOutcome {
    /// Fields whose value changed, in patch order.
    pub changed: Vec<Field>,
}

impl PatchOutcome {
    #[must_use]
    pub fn any(&self) -> bool {
        !self.changed.is_empty()
    }

    #[must_use]
    pub fn address_changed(&self) -> bool {
        self.changed.iter().any(|field| field.affects_address())
    }

    #[must_use]
    pub fn delivery_method_changed(&self) -> bool {
        self.changed.contains(&Field::DeliveryMethod)
    }

    /// Steps owning at least one changed field, deduplicated.
    #[must_use]
    pub fn touched_steps(&self) -> Vec<Step> {
        let mut steps: Vec<Step> = self.changed.iter().map(|field| field.step()).collect();
        steps.sort_unstable();
        steps.dedup();
        steps
    }
}
