//! Offer service: the operations callers use, wrapping the command handler,
//! the coupon registry, the catalog and the notification queue.

use common::AggregateId;
use event_store::EventStore;
use futures_util::TryStreamExt;
use rust_decimal::Decimal;

use crate::aggregate::Aggregate;
use crate::command::{CommandHandler, CommandResult};
use crate::error::DomainError;

use super::{
    AcceptOffer, CouponCode, CouponContext, CouponRegistry, CouponView, CreateOffer, Customer,
    NotificationQueue, Offer, OfferAction, OfferError, OfferNotification, OfferStats,
    Product, ProductCatalog, RejectOffer, coupon,
};

/// Attempts per command when another writer commits to the same offer first.
pub const DEFAULT_COMMAND_ATTEMPTS: u32 = 3;

/// Guest generation attempts before a coupon collision is returned to the
/// caller. Registered codes walk the `R<n>` sequence until a claim succeeds.
const MAX_COUPON_ATTEMPTS: u32 = 5;

/// Service for managing offers.
///
/// Every transition is committed through the command handler, so two
/// callers racing on one offer cannot both succeed. Notifications are
/// published only after a commit.
pub struct OfferService<S, R, C>
where
    S: EventStore,
    R: CouponRegistry,
    C: ProductCatalog,
{
    handler: CommandHandler<S, Offer>,
    registry: R,
    catalog: C,
    notifications: NotificationQueue,
    max_attempts: u32,
}

impl<S, R, C> OfferService<S, R, C>
where
    S: EventStore,
    R: CouponRegistry,
    C: ProductCatalog,
{
    /// Creates a new offer service.
    pub fn new(store: S, registry: R, catalog: C, notifications: NotificationQueue) -> Self {
        Self {
            handler: CommandHandler::new(store),
            registry,
            catalog,
            notifications,
            max_attempts: DEFAULT_COMMAND_ATTEMPTS,
        }
    }

    /// Sets how many times a conflicting command is retried. At least one
    /// attempt is always made.
    pub fn with_command_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Returns a reference to the underlying command handler.
    pub fn handler(&self) -> &CommandHandler<S, Offer> {
        &self.handler
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Submits an offer and decides it against `max_discount`.
    ///
    /// Within the margin the offer is accepted with a fresh coupon; otherwise
    /// it waits for review.
    #[tracing::instrument(
        skip(self, cmd),
        fields(offer_id = %cmd.offer_id, product_id = %cmd.product_id)
    )]
    pub async fn create_offer(
        &self,
        cmd: CreateOffer,
        max_discount: Decimal,
    ) -> Result<CommandResult<Offer>, DomainError> {
        cmd.validate()?;

        let product = self
            .catalog
            .get_product(&cmd.product_id)
            .await?
            .ok_or_else(|| OfferError::ProductNotFound {
                product_id: cmd.product_id.to_string(),
            })?;

        let verdict = Offer::assess(&cmd, &product, max_discount)?;
        let offer_id = cmd.offer_id;

        let coupon_code = if verdict.within_margin {
            Some(self.claim_coupon(offer_id, &product, &cmd.customer).await?)
        } else {
            None
        };

        let result = self
            .handler
            .execute(offer_id, |offer| {
                offer.create(&cmd, &product, max_discount, coupon_code.clone())
            })
            .await;

        let result = match result {
            Ok(result) => result,
            Err(error) => {
                if let Some(code) = &coupon_code {
                    self.release_unless_committed(offer_id, code).await;
                }
                return Err(error);
            }
        };

        let outcome = if verdict.within_margin {
            "auto_accepted"
        } else {
            "queued"
        };
        metrics::counter!("offers_created_total", "outcome" => outcome).increment(1);
        tracing::info!(
            discount = %verdict.discount_percentage,
            within_margin = verdict.within_margin,
            coupon_code = coupon_code.as_ref().map(|c| c.as_str()),
            "offer created"
        );

        self.publish(&result);
        Ok(result)
    }

    /// Accepts a pending offer and issues its coupon.
    #[tracing::instrument(skip(self, cmd), fields(offer_id = %cmd.offer_id, admin_id = %cmd.admin_id))]
    pub async fn accept_manually(
        &self,
        cmd: AcceptOffer,
    ) -> Result<CommandResult<Offer>, DomainError> {
        let offer_id = cmd.offer_id;
        let offer = self.require_offer(offer_id).await?;

        // Fail before claiming a code the offer could never hold.
        offer.status().transition(OfferAction::AcceptManually)?;

        let (Some(product), Some(customer)) = (offer.product(), offer.customer()) else {
            return Err(not_found(offer_id));
        };
        let code = self.claim_coupon(offer_id, product, customer).await?;

        let result = self
            .handler
            .execute_with_retry(offer_id, self.max_attempts, |offer| {
                offer.accept_manually(cmd.admin_id, cmd.notes.clone(), code.clone())
            })
            .await;

        let result = match result {
            Ok(result) => result,
            Err(error) => {
                self.release_unless_committed(offer_id, &code).await;
                return Err(error);
            }
        };

        metrics::counter!("offer_transitions_total", "transition" => "accept").increment(1);
        tracing::info!(coupon_code = %code, "offer accepted manually");

        self.publish(&result);
        Ok(result)
    }

    /// Rejects a pending offer.
    #[tracing::instrument(skip(self, cmd), fields(offer_id = %cmd.offer_id, admin_id = %cmd.admin_id))]
    pub async fn reject(&self, cmd: RejectOffer) -> Result<CommandResult<Offer>, DomainError> {
        self.require_offer(cmd.offer_id).await?;

        let result = self
            .handler
            .execute_with_retry(cmd.offer_id, self.max_attempts, |offer| {
                offer.reject(cmd.admin_id, cmd.notes.clone())
            })
            .await?;

        metrics::counter!("offer_transitions_total", "transition" => "reject").increment(1);
        tracing::info!("offer rejected");

        self.publish(&result);
        Ok(result)
    }

    /// Checks a coupon without using it.
    ///
    /// Fails exactly as `redeem_coupon` would.
    #[tracing::instrument(skip(self))]
    pub async fn validate_coupon(&self, code: &str) -> Result<CouponView, DomainError> {
        let offer = self
            .find_by_code(code)
            .await?
            .ok_or_else(|| coupon_not_found(code))?;
        Ok(offer.coupon_view()?)
    }

    /// Uses a coupon. At most one call per code succeeds.
    #[tracing::instrument(skip(self))]
    pub async fn redeem_coupon(&self, code: &str) -> Result<CommandResult<Offer>, DomainError> {
        let result = self.try_redeem(code).await;

        let label = match &result {
            Ok(_) => "redeemed",
            Err(error) => match error.as_offer_error() {
                Some(OfferError::CouponNotFound { .. }) => "not_found",
                Some(OfferError::CouponAlreadyUsed { .. }) => "already_used",
                Some(OfferError::CouponInvalidState { .. }) => "invalid_state",
                _ => "error",
            },
        };
        metrics::counter!("coupon_redemptions_total", "result" => label).increment(1);

        let result = result?;
        tracing::info!(offer_id = ?result.aggregate.id(), "coupon redeemed");
        metrics::counter!("offer_transitions_total", "transition" => "redeem").increment(1);

        self.publish(&result);
        Ok(result)
    }

    async fn try_redeem(&self, code: &str) -> Result<CommandResult<Offer>, DomainError> {
        let offer_id = self
            .registry
            .find_by_code(code)
            .await?
            .ok_or_else(|| coupon_not_found(code))?;

        self.handler
            .execute_with_retry(offer_id, self.max_attempts, |offer| {
                if offer.coupon_code().map(CouponCode::as_str) != Some(code) {
                    return Err(OfferError::CouponNotFound {
                        code: code.to_string(),
                    });
                }
                offer.redeem_coupon()
            })
            .await
    }

    /// Gets the offer holding a coupon code.
    ///
    /// A code that is claimed but not yet committed to its offer is not found.
    pub async fn find_by_code(&self, code: &str) -> Result<Option<Offer>, DomainError> {
        let Some(offer_id) = self.registry.find_by_code(code).await? else {
            return Ok(None);
        };
        let offer = self.handler.load_existing(offer_id).await?;
        Ok(offer.filter(|o| o.coupon_code().map(CouponCode::as_str) == Some(code)))
    }

    /// Gets an offer by ID.
    pub async fn get_offer(&self, offer_id: AggregateId) -> Result<Option<Offer>, DomainError> {
        self.handler.load_existing(offer_id).await
    }

    /// Computes statistics over every offer in the store.
    #[tracing::instrument(skip(self))]
    pub async fn stats(&self) -> Result<OfferStats, DomainError> {
        let envelopes: Vec<_> = self
            .handler
            .store()
            .stream_all_events()
            .await?
            .try_collect()
            .await?;
        OfferStats::from_envelopes(&envelopes)
    }

    async fn require_offer(&self, offer_id: AggregateId) -> Result<Offer, DomainError> {
        self.handler
            .load_existing(offer_id)
            .await?
            .ok_or_else(|| not_found(offer_id))
    }

    /// Generates a code and claims it, regenerating on collision.
    ///
    /// Registered codes retry until a free `R<n>` suffix is found. Guest
    /// retries are capped at `MAX_COUPON_ATTEMPTS`.
    async fn claim_coupon(
        &self,
        offer_id: AggregateId,
        product: &Product,
        customer: &Customer,
    ) -> Result<CouponCode, DomainError> {
        let mut context = CouponContext::first();
        loop {
            let code = coupon::generate(
                &product.id,
                product.reference.as_deref(),
                customer,
                &context,
            );
            match self.registry.claim(&code, offer_id).await {
                Ok(()) => return Ok(code),
                Err(DomainError::Offer(OfferError::CouponCollision { .. }))
                    if !customer.is_guest() || context.attempt + 1 < MAX_COUPON_ATTEMPTS =>
                {
                    tracing::warn!(%offer_id, %code, attempt = context.attempt, "coupon code collision, regenerating");
                    context = context.retry();
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// Drops a claim after a failed append, unless the offer holds the code
    /// anyway (a concurrent command committed the same code).
    async fn release_unless_committed(&self, offer_id: AggregateId, code: &CouponCode) {
        match self.handler.load(offer_id).await {
            Ok(offer) if offer.coupon_code() == Some(code) => {}
            Ok(_) => {
                if let Err(error) = self.registry.release(code, offer_id).await {
                    tracing::warn!(%offer_id, %code, %error, "failed to release coupon claim");
                }
            }
            Err(error) => {
                tracing::warn!(%offer_id, %code, %error, "could not reload offer, keeping coupon claim");
            }
        }
    }

    fn publish(&self, result: &CommandResult<Offer>) {
        for event in &result.events {
            if let Some(notification) =
                OfferNotification::from_committed(&result.aggregate, event.clone())
            {
                self.notifications.publish(notification);
            }
        }
    }
}

fn not_found(offer_id: AggregateId) -> DomainError {
    DomainError::AggregateNotFound {
        aggregate_type: Offer::aggregate_type(),
        aggregate_id: offer_id.to_string(),
    }
}

fn coupon_not_found(code: &str) -> DomainError {
    OfferError::CouponNotFound {
        code: code.to_string(),
    }
    .into()
}
