//! Offer commands.

use common::{AdminId, AggregateId, ProductId};

use crate::command::Command;

use super::{Customer, Money, Offer, OfferError};

/// Longest comment a buyer may attach to an offer.
pub const MAX_COMMENT_LEN: usize = 500;

/// Command to propose a price for a catalog product.
#[derive(Debug, Clone)]
pub struct CreateOffer {
    /// The offer ID to create.
    pub offer_id: AggregateId,

    pub product_id: ProductId,

    pub offered_price: Money,

    pub customer: Customer,

    /// Contact phone, required for every customer.
    pub phone: String,

    pub comments: Option<String>,
}

impl CreateOffer {
    /// Creates a new CreateOffer command with a generated offer ID.
    pub fn new(
        product_id: impl Into<ProductId>,
        offered_price: Money,
        customer: Customer,
        phone: impl Into<String>,
    ) -> Self {
        Self {
            offer_id: AggregateId::new(),
            product_id: product_id.into(),
            offered_price,
            customer,
            phone: phone.into(),
            comments: None,
        }
    }

    /// Attaches a buyer comment.
    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }

    /// Checks the request fields that don't depend on the catalog.
    pub fn validate(&self) -> Result<(), OfferError> {
        if self.phone.trim().is_empty() {
            return Err(OfferError::MissingContactInfo { field: "phone" });
        }

        if let Customer::Guest { email, .. } = &self.customer
            && email.trim().is_empty()
        {
            return Err(OfferError::MissingContactInfo { field: "email" });
        }

        if let Some(comments) = &self.comments {
            let length = comments.chars().count();
            if length > MAX_COMMENT_LEN {
                return Err(OfferError::InvalidComments { length });
            }
        }

        if !self.offered_price.is_positive() {
            return Err(OfferError::InvalidPrice {
                product_price: Money::zero(),
                offered_price: self.offered_price,
            });
        }

        Ok(())
    }
}

impl Command for CreateOffer {
    type Aggregate = Offer;

    fn aggregate_id(&self) -> AggregateId {
        self.offer_id
    }
}

/// Command for an administrator to accept a pending offer.
#[derive(Debug, Clone)]
pub struct AcceptOffer {
    pub offer_id: AggregateId,
    pub admin_id: AdminId,
    pub notes: Option<String>,
}

impl AcceptOffer {
    /// Creates a new AcceptOffer command.
    pub fn new(offer_id: AggregateId, admin_id: AdminId, notes: Option<String>) -> Self {
        Self {
            offer_id,
            admin_id,
            notes,
        }
    }
}

impl Command for AcceptOffer {
    type Aggregate = Offer;

    fn aggregate_id(&self) -> AggregateId {
        self.offer_id
    }
}

/// Command for an administrator to reject a pending offer.
#[derive(Debug, Clone)]
pub struct RejectOffer {
    pub offer_id: AggregateId,
    pub admin_id: AdminId,
    pub notes: Option<String>,
}

impl RejectOffer {
    /// Creates a new RejectOffer command.
    pub fn new(offer_id: AggregateId, admin_id: AdminId, notes: Option<String>) -> Self {
        Self {
            offer_id,
            admin_id,
            notes,
        }
    }
}

impl Command for RejectOffer {
    type Aggregate = Offer;

    fn aggregate_id(&self) -> AggregateId {
        self.offer_id
    }
}
