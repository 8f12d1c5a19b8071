//! Coupon code generation.
//!
//! Codes look like `OFFER-<ref>-<suffix>`. The generator is pure and never
//! checks uniqueness; the coupon registry rejects codes that are already
//! held and the caller asks for another one with the next attempt number.

use common::ProductId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Customer;

const PREFIX: &str = "OFFER";
const GUEST_MARKER: char = 'G';
const REFERENCE_FALLBACK_LEN: usize = 6;
const CUSTOMER_FRAGMENT_LEN: usize = 6;
const GUEST_FRAGMENT_LEN: usize = 8;

/// A single-use coupon code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CouponCode(String);

impl CouponCode {
    /// Wraps an existing code, e.g. one typed in by a buyer.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the customer fragment after the last `-`.
    pub fn suffix(&self) -> &str {
        self.0.rsplit_once('-').map_or(self.0.as_str(), |(_, s)| s)
    }

    /// Returns true if the code was issued to a guest.
    pub fn is_guest(&self) -> bool {
        self.suffix().starts_with(GUEST_MARKER)
    }
}

impl std::fmt::Display for CouponCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CouponCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Per-attempt inputs to the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CouponContext {
    /// Zero for the first attempt, incremented after each collision.
    pub attempt: u32,

    /// Random source for guest suffixes.
    pub nonce: Uuid,
}

impl CouponContext {
    /// Context for the first attempt.
    pub fn first() -> Self {
        Self {
            attempt: 0,
            nonce: Uuid::new_v4(),
        }
    }

    /// Context for the attempt after a collision.
    pub fn retry(&self) -> Self {
        Self {
            attempt: self.attempt + 1,
            nonce: Uuid::new_v4(),
        }
    }
}

/// Builds a coupon code for an offer.
///
/// `<ref>` is the product reference, or the last characters of the product
/// id when the product has none. Registered customers get a fragment of
/// their account id (deterministic, with a numeric tail on retries); guests
/// get `G` followed by random hex.
pub fn generate(
    product_id: &ProductId,
    reference: Option<&str>,
    customer: &Customer,
    context: &CouponContext,
) -> CouponCode {
    let reference = reference
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| tail(product_id.as_str(), REFERENCE_FALLBACK_LEN).to_uppercase());

    let suffix = match customer {
        Customer::Registered { customer_id, .. } => {
            let hex = customer_id.as_uuid().simple().to_string();
            let fragment = tail(&hex, CUSTOMER_FRAGMENT_LEN).to_uppercase();
            if context.attempt == 0 {
                fragment
            } else {
                format!("{fragment}R{}", context.attempt)
            }
        }
        Customer::Guest { .. } => {
            let hex = context.nonce.simple().to_string();
            format!(
                "{GUEST_MARKER}{}",
                tail(&hex, GUEST_FRAGMENT_LEN).to_uppercase()
            )
        }
    };

    CouponCode(format!("{PREFIX}-{reference}-{suffix}"))
}

fn tail(value: &str, len: usize) -> &str {
    let start = value
        .char_indices()
        .rev()
        .nth(len.saturating_sub(1))
        .map_or(0, |(index, _)| index);
    &value[start..]
}
