//! Offer domain events.

use chrono::{DateTime, Utc};
use common::{AdminId, AggregateId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

use super::{CouponCode, Customer, Money, Product};

/// Events that can occur on an offer aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OfferEvent {
    /// Offer was within the margin and a coupon was issued.
    OfferAutoAccepted(OfferSubmittedData),

    /// Offer was outside the margin and awaits review.
    OfferQueued(OfferSubmittedData),

    /// An administrator accepted a pending offer and a coupon was issued.
    OfferAcceptedManually(OfferAcceptedData),

    /// An administrator rejected a pending offer.
    OfferRejected(OfferRejectedData),

    /// The offer's coupon was used.
    CouponRedeemed(CouponRedeemedData),
}

impl DomainEvent for OfferEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OfferEvent::OfferAutoAccepted(_) => "OfferAutoAccepted",
            OfferEvent::OfferQueued(_) => "OfferQueued",
            OfferEvent::OfferAcceptedManually(_) => "OfferAcceptedManually",
            OfferEvent::OfferRejected(_) => "OfferRejected",
            OfferEvent::CouponRedeemed(_) => "CouponRedeemed",
        }
    }
}

/// Data for OfferAutoAccepted and OfferQueued events.
///
/// The discount percentage is not recorded; readers derive it from
/// `product.price` and `offered_price`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferSubmittedData {
    pub offer_id: AggregateId,

    /// Product snapshot, including the list price the offer was judged against.
    pub product: Product,

    pub customer: Customer,

    pub phone: String,

    pub offered_price: Money,

    pub comments: Option<String>,

    /// Margin in force when the verdict was taken.
    pub max_discount_allowed: Decimal,

    pub within_margin: bool,

    /// Present exactly when `within_margin` is true.
    pub coupon_code: Option<CouponCode>,

    pub created_at: DateTime<Utc>,
}

/// Who reviewed a pending offer, when, and what they noted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub reviewed_by: AdminId,
    pub reviewed_at: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Data for OfferAcceptedManually event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferAcceptedData {
    pub coupon_code: CouponCode,
    pub review: Review,
}

/// Data for OfferRejected event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferRejectedData {
    pub review: Review,
}

/// Data for CouponRedeemed event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouponRedeemedData {
    pub coupon_code: CouponCode,
    pub redeemed_at: DateTime<Utc>,
}

// Convenience constructors for events
impl OfferEvent {
    /// Creates the event recording a new offer; which variant depends on the verdict.
    pub fn offer_submitted(data: OfferSubmittedData) -> Self {
        if data.within_margin {
            OfferEvent::OfferAutoAccepted(data)
        } else {
            OfferEvent::OfferQueued(data)
        }
    }

    /// Creates an OfferAcceptedManually event.
    pub fn offer_accepted_manually(
        coupon_code: CouponCode,
        reviewed_by: AdminId,
        notes: Option<String>,
    ) -> Self {
        OfferEvent::OfferAcceptedManually(OfferAcceptedData {
            coupon_code,
            review: Review {
                reviewed_by,
                reviewed_at: Utc::now(),
                notes,
            },
        })
    }

    /// Creates an OfferRejected event.
    pub fn offer_rejected(reviewed_by: AdminId, notes: Option<String>) -> Self {
        OfferEvent::OfferRejected(OfferRejectedData {
            review: Review {
                reviewed_by,
                reviewed_at: Utc::now(),
                notes,
            },
        })
    }

    /// Creates a CouponRedeemed event.
    pub fn coupon_redeemed(coupon_code: CouponCode) -> Self {
        OfferEvent::CouponRedeemed(CouponRedeemedData {
            coupon_code,
            redeemed_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submitted(within_margin: bool) -> OfferSubmittedData {
        OfferSubmittedData {
            offer_id: AggregateId::new(),
            product: Product::new("p-1", "Roadster", Money::from_cents(10000), None),
            customer: Customer::guest("guest@example.com", None),
            phone: "600000000".to_string(),
            offered_price: Money::from_cents(8000),
            comments: None,
            max_discount_allowed: Decimal::from(20),
            within_margin,
            coupon_code: within_margin.then(|| CouponCode::new("OFFER-P-1-G12345678")),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn submitted_variant_follows_verdict() {
        assert_eq!(
            OfferEvent::offer_submitted(submitted(true)).event_type(),
            "OfferAutoAccepted"
        );
        assert_eq!(
            OfferEvent::offer_submitted(submitted(false)).event_type(),
            "OfferQueued"
        );
    }

    #[test]
    fn event_types() {
        let admin = AdminId::new();
        assert_eq!(
            OfferEvent::offer_accepted_manually(CouponCode::new("C"), admin, None).event_type(),
            "OfferAcceptedManually"
        );
        assert_eq!(
            OfferEvent::offer_rejected(admin, None).event_type(),
            "OfferRejected"
        );
        assert_eq!(
            OfferEvent::coupon_redeemed(CouponCode::new("C")).event_type(),
            "CouponRedeemed"
        );
    }

    #[test]
    fn rejected_event_serialization() {
        let admin = AdminId::new();
        let event = OfferEvent::offer_rejected(admin, Some("Too low for this model".to_string()));

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"OfferRejected\""));

        let deserialized: OfferEvent = serde_json::from_str(&json).unwrap();
        if let OfferEvent::OfferRejected(data) = deserialized {
            assert_eq!(data.review.reviewed_by, admin);
            assert_eq!(data.review.notes.as_deref(), Some("Too low for this model"));
        } else {
            panic!("Expected OfferRejected event");
        }
    }

    #[test]
    fn submitted_event_serialization_keeps_customer_variant() {
        let event = OfferEvent::offer_submitted(submitted(true));
        let json = serde_json::to_string(&event).unwrap();
        let deserialized: OfferEvent = serde_json::from_str(&json).unwrap();

        if let OfferEvent::OfferAutoAccepted(data) = deserialized {
            assert!(data.customer.is_guest());
            assert_eq!(data.max_discount_allowed, Decimal::from(20));
            assert!(data.coupon_code.is_some());
        } else {
            panic!("Expected OfferAutoAccepted event");
        }
    }
}
