//! Coupon registry: the unique index from coupon code to offer.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::AggregateId;
use tokio::sync::RwLock;

use crate::error::DomainError;

use super::{CouponCode, OfferError};

/// Unique index of issued coupon codes.
///
/// `claim` is the uniqueness constraint: at most one offer may hold a code.
/// Implementations backed by a database map it onto a unique index.
#[async_trait]
pub trait CouponRegistry: Send + Sync {
    /// Records `code` as belonging to `offer_id`.
    ///
    /// Claiming a code the same offer already holds succeeds. Claiming a code
    /// held by another offer fails with `CouponCollision`.
    async fn claim(&self, code: &CouponCode, offer_id: AggregateId) -> Result<(), DomainError>;

    /// Drops a claim that was never committed to the offer.
    ///
    /// Does nothing if the code is held by a different offer.
    async fn release(&self, code: &CouponCode, offer_id: AggregateId) -> Result<(), DomainError>;

    /// Returns the offer holding `code`.
    async fn find_by_code(&self, code: &str) -> Result<Option<AggregateId>, DomainError>;
}

/// In-memory coupon registry.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCouponRegistry {
    codes: Arc<RwLock<HashMap<CouponCode, AggregateId>>>,
}

impl InMemoryCouponRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of claimed codes.
    pub async fn claimed_count(&self) -> usize {
        self.codes.read().await.len()
    }
}

#[async_trait]
impl CouponRegistry for InMemoryCouponRegistry {
    async fn claim(&self, code: &CouponCode, offer_id: AggregateId) -> Result<(), DomainError> {
        let mut codes = self.codes.write().await;
        match codes.get(code) {
            Some(holder) if *holder == offer_id => Ok(()),
            Some(_) => Err(OfferError::CouponCollision {
                code: code.to_string(),
            }
            .into()),
            None => {
                codes.insert(code.clone(), offer_id);
                Ok(())
            }
        }
    }

    async fn release(&self, code: &CouponCode, offer_id: AggregateId) -> Result<(), DomainError> {
        let mut codes = self.codes.write().await;
        if codes.get(code) == Some(&offer_id) {
            codes.remove(code);
        }
        Ok(())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<AggregateId>, DomainError> {
        Ok(self
            .codes
            .read()
            .await
            .get(&CouponCode::new(code))
            .copied())
    }
}
