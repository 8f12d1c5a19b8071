//! Value objects for the offer domain.

use common::CustomerId;
use serde::{Deserialize, Serialize};

/// Money amount represented in cents to avoid floating point issues.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money {
    cents: i64,
}

impl Money {
    /// Creates a new Money amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns true if the amount is positive.
    pub fn is_positive(&self) -> bool {
        self.cents > 0
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.cents < 0 { "-" } else { "" };
        let abs = self.cents.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents - rhs.cents,
        }
    }
}

/// The buyer behind an offer.
///
/// Registered customers come from the authenticated account; guests supply
/// their own contact details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Customer {
    Registered {
        customer_id: CustomerId,
        email: String,
        name: Option<String>,
    },
    Guest {
        email: String,
        name: Option<String>,
    },
}

impl Customer {
    /// Creates a registered customer.
    pub fn registered(
        customer_id: CustomerId,
        email: impl Into<String>,
        name: Option<String>,
    ) -> Self {
        Customer::Registered {
            customer_id,
            email: email.into(),
            name,
        }
    }

    /// Creates a guest customer.
    pub fn guest(email: impl Into<String>, name: Option<String>) -> Self {
        Customer::Guest {
            email: email.into(),
            name,
        }
    }

    pub fn email(&self) -> &str {
        match self {
            Customer::Registered { email, .. } | Customer::Guest { email, .. } => email,
        }
    }

    /// Returns the name to greet the customer with.
    pub fn display_name(&self) -> &str {
        match self {
            Customer::Registered { name, .. } | Customer::Guest { name, .. } => {
                name.as_deref().unwrap_or("Customer")
            }
        }
    }

    /// Returns the account ID for registered customers.
    pub fn customer_id(&self) -> Option<CustomerId> {
        match self {
            Customer::Registered { customer_id, .. } => Some(*customer_id),
            Customer::Guest { .. } => None,
        }
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, Customer::Guest { .. })
    }
}
