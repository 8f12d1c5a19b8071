//! Offer aggregate implementation.

use chrono::{DateTime, Utc};
use common::{AdminId, AggregateId, ProductId};
use event_store::Version;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;

use super::{
    CouponCode, CreateOffer, Customer, MarginVerdict, Money, OfferAction, OfferError, OfferEvent,
    OfferStatus, Product, Review,
    events::{OfferAcceptedData, OfferSubmittedData},
    margin,
};

/// Offer aggregate root.
///
/// A buyer's proposed price for one product, from submission through review
/// to coupon redemption.
#[derive(Debug, Clone, Default)]
pub struct Offer {
    id: Option<AggregateId>,

    /// Current version for optimistic concurrency.
    version: Version,

    product: Option<Product>,

    customer: Option<Customer>,

    phone: String,

    /// List price at submission time.
    product_price: Money,

    offered_price: Money,

    comments: Option<String>,

    status: OfferStatus,

    within_margin: bool,

    /// Margin snapshot the verdict was taken against.
    max_discount_allowed: Decimal,

    coupon_code: Option<CouponCode>,

    coupon_used: bool,

    coupon_used_at: Option<DateTime<Utc>>,

    review: Option<Review>,

    created_at: Option<DateTime<Utc>>,
}

/// What a buyer sees when checking a coupon before using it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponView {
    pub valid: bool,
    pub coupon_code: CouponCode,
    pub discount_percentage: Decimal,
    pub product_id: ProductId,
    pub product_title: String,
    pub offered_price: Money,
}

impl Aggregate for Offer {
    type Event = OfferEvent;
    type Error = OfferError;

    fn aggregate_type() -> &'static str {
        "Offer"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            OfferEvent::OfferAutoAccepted(data) | OfferEvent::OfferQueued(data) => {
                self.apply_offer_submitted(data)
            }
            OfferEvent::OfferAcceptedManually(data) => self.apply_offer_accepted(data),
            OfferEvent::OfferRejected(data) => {
                self.status = OfferStatus::Rejected;
                self.review = Some(data.review);
            }
            OfferEvent::CouponRedeemed(data) => {
                self.status = OfferStatus::Expired;
                self.coupon_used = true;
                self.coupon_used_at = Some(data.redeemed_at);
            }
        }
    }
}

// Query methods
impl Offer {
    pub fn product(&self) -> Option<&Product> {
        self.product.as_ref()
    }

    pub fn customer(&self) -> Option<&Customer> {
        self.customer.as_ref()
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn product_price(&self) -> Money {
        self.product_price
    }

    pub fn offered_price(&self) -> Money {
        self.offered_price
    }

    /// Returns the discount the offered price represents, or `None` before
    /// the offer has been created.
    pub fn discount_percentage(&self) -> Option<Decimal> {
        margin::discount_percentage(self.product_price, self.offered_price).ok()
    }

    pub fn comments(&self) -> Option<&str> {
        self.comments.as_deref()
    }

    /// Returns the current status.
    pub fn status(&self) -> OfferStatus {
        self.status
    }

    pub fn within_margin(&self) -> bool {
        self.within_margin
    }

    pub fn max_discount_allowed(&self) -> Decimal {
        self.max_discount_allowed
    }

    pub fn coupon_code(&self) -> Option<&CouponCode> {
        self.coupon_code.as_ref()
    }

    pub fn coupon_used(&self) -> bool {
        self.coupon_used
    }

    pub fn coupon_used_at(&self) -> Option<DateTime<Utc>> {
        self.coupon_used_at
    }

    /// Returns the manual review, if an administrator decided this offer.
    pub fn review(&self) -> Option<&Review> {
        self.review.as_ref()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    /// Returns true if the offer is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Describes the coupon for a buyer, failing the same way redemption would.
    pub fn coupon_view(&self) -> Result<CouponView, OfferError> {
        let coupon_code = self.redeemable_coupon()?.clone();
        let product = self.product.as_ref();
        Ok(CouponView {
            valid: true,
            coupon_code,
            discount_percentage: margin::discount_percentage(
                self.product_price,
                self.offered_price,
            )?,
            product_id: product.map(|p| p.id.clone()).unwrap_or_else(|| ProductId::new("")),
            product_title: product.map(|p| p.title.clone()).unwrap_or_default(),
            offered_price: self.offered_price,
        })
    }

    /// Checks the coupon can be redeemed. A used coupon is reported as used
    /// before its status is looked at.
    fn redeemable_coupon(&self) -> Result<&CouponCode, OfferError> {
        let Some(code) = &self.coupon_code else {
            return Err(OfferError::IllegalTransition {
                current_state: self.status,
                action: OfferAction::RedeemCoupon.as_str(),
            });
        };

        if self.coupon_used {
            return Err(OfferError::CouponAlreadyUsed {
                code: code.to_string(),
            });
        }

        self.status
            .transition(OfferAction::RedeemCoupon)
            .map_err(|_| OfferError::CouponInvalidState {
                code: code.to_string(),
                status: self.status,
            })?;

        Ok(code)
    }
}

// Command methods (return events)
impl Offer {
    /// Validates a request against the product and takes the margin verdict.
    ///
    /// Callers use this to learn whether `create` will need a coupon code.
    pub fn assess(
        request: &CreateOffer,
        product: &Product,
        max_discount: Decimal,
    ) -> Result<MarginVerdict, OfferError> {
        request.validate()?;
        margin::evaluate(product.price, request.offered_price, max_discount)
    }

    /// Records a new offer.
    ///
    /// Within the margin the offer is accepted and `coupon_code` must be
    /// provided; outside it the offer is queued and `coupon_code` must be
    /// None.
    pub fn create(
        &self,
        request: &CreateOffer,
        product: &Product,
        max_discount: Decimal,
        coupon_code: Option<CouponCode>,
    ) -> Result<Vec<OfferEvent>, OfferError> {
        if self.id.is_some() {
            return Err(OfferError::AlreadyCreated);
        }

        let verdict = Self::assess(request, product, max_discount)?;
        if verdict.within_margin != coupon_code.is_some() {
            return Err(OfferError::CouponCodeMismatch {
                within_margin: verdict.within_margin,
            });
        }

        Ok(vec![OfferEvent::offer_submitted(OfferSubmittedData {
            offer_id: request.offer_id,
            product: product.clone(),
            customer: request.customer.clone(),
            phone: request.phone.trim().to_string(),
            offered_price: request.offered_price,
            comments: request.comments.clone(),
            max_discount_allowed: verdict.max_discount,
            within_margin: verdict.within_margin,
            coupon_code,
            created_at: Utc::now(),
        })])
    }

    /// Accepts a pending offer on an administrator's behalf.
    pub fn accept_manually(
        &self,
        admin_id: AdminId,
        notes: Option<String>,
        coupon_code: CouponCode,
    ) -> Result<Vec<OfferEvent>, OfferError> {
        self.status.transition(OfferAction::AcceptManually)?;
        Ok(vec![OfferEvent::offer_accepted_manually(
            coupon_code,
            admin_id,
            notes,
        )])
    }

    /// Rejects a pending offer on an administrator's behalf.
    pub fn reject(
        &self,
        admin_id: AdminId,
        notes: Option<String>,
    ) -> Result<Vec<OfferEvent>, OfferError> {
        self.status.transition(OfferAction::Reject)?;
        Ok(vec![OfferEvent::offer_rejected(admin_id, notes)])
    }

    /// Uses the offer's coupon.
    pub fn redeem_coupon(&self) -> Result<Vec<OfferEvent>, OfferError> {
        let code = self.redeemable_coupon()?;
        Ok(vec![OfferEvent::coupon_redeemed(code.clone())])
    }
}

// Apply event helpers
impl Offer {
    fn apply_offer_submitted(&mut self, data: OfferSubmittedData) {
        self.id = Some(data.offer_id);
        self.product_price = data.product.price;
        self.product = Some(data.product);
        self.customer = Some(data.customer);
        self.phone = data.phone;
        self.offered_price = data.offered_price;
        self.comments = data.comments;
        self.max_discount_allowed = data.max_discount_allowed;
        self.within_margin = data.within_margin;
        self.status = OfferStatus::initial(data.within_margin);
        self.coupon_code = data.coupon_code;
        self.created_at = Some(data.created_at);
    }

    fn apply_offer_accepted(&mut self, data: OfferAcceptedData) {
        self.status = OfferStatus::Accepted;
        self.coupon_code = Some(data.coupon_code);
        self.review = Some(data.review);
    }
}
