//! Runtime wiring for the offer engine.
//!
//! [`Engine::start`] assembles the in-memory event store, coupon registry and
//! product catalog into an [`OfferService`] and spawns the notification
//! worker. Callers that need telemetry install it first with
//! [`telemetry::init_tracing`] and [`telemetry::init_metrics`].

pub mod config;
pub mod telemetry;

use domain::{
    CommandResult, CreateOffer, DomainError, InMemoryCouponRegistry, InMemoryProductCatalog,
    LoggingDispatcher, Offer, OfferService, notification_channel,
};
use event_store::InMemoryEventStore;
use tokio::task::JoinHandle;

pub use config::{ConfigError, EngineConfig, LogFormat};

/// Offer service over the in-memory stores.
pub type InMemoryOfferService =
    OfferService<InMemoryEventStore, InMemoryCouponRegistry, InMemoryProductCatalog>;

/// A running engine: the service, its catalog and the notification worker.
pub struct Engine {
    service: InMemoryOfferService,
    catalog: InMemoryProductCatalog,
    config: EngineConfig,
    worker: JoinHandle<usize>,
}

impl Engine {
    /// Builds the service and spawns the notification worker.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: EngineConfig) -> Self {
        let catalog = InMemoryProductCatalog::new();
        let (queue, worker) = notification_channel();
        let worker = tokio::spawn(worker.run(LoggingDispatcher::new(config.admin_email.clone())));

        let service = OfferService::new(
            InMemoryEventStore::new(),
            InMemoryCouponRegistry::new(),
            catalog.clone(),
            queue,
        )
        .with_command_attempts(config.command_attempts);

        tracing::info!(
            max_discount = %config.max_discount,
            command_attempts = config.command_attempts,
            "offer engine started"
        );

        Self {
            service,
            catalog,
            config,
            worker,
        }
    }

    pub fn service(&self) -> &InMemoryOfferService {
        &self.service
    }

    /// Returns the catalog the service reads products from.
    pub fn catalog(&self) -> &InMemoryProductCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Submits an offer against the configured margin.
    pub async fn submit_offer(&self, cmd: CreateOffer) -> Result<CommandResult<Offer>, DomainError> {
        self.service.create_offer(cmd, self.config.max_discount).await
    }

    /// Stops accepting work and waits for queued notifications to be
    /// delivered. Returns how many notifications the worker processed.
    pub async fn shutdown(self) -> usize {
        drop(self.service);
        match self.worker.await {
            Ok(processed) => processed,
            Err(error) => {
                tracing::warn!(%error, "notification worker did not finish cleanly");
                0
            }
        }
    }
}
