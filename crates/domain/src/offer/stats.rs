//! Offer statistics folded from the event log.

use std::collections::HashMap;

use common::AggregateId;
use event_store::EventEnvelope;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::aggregate::Aggregate;
use crate::error::DomainError;

use super::{Offer, OfferEvent, OfferStatus, margin};

/// Count and mean discount of the offers in one status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StatusStats {
    pub count: usize,

    /// Mean discount percentage, rounded to two decimals. Zero when empty.
    pub avg_discount: Decimal,
}

/// Totals over every offer ever made.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct OfferStats {
    pub total: usize,
    pub within_margin: usize,
    pub outside_margin: usize,

    /// One entry per status, including empty ones.
    pub by_status: HashMap<OfferStatus, StatusStats>,
}

#[derive(Debug, Clone, Copy)]
struct Tally {
    status: OfferStatus,
    discount: Decimal,
    within_margin: bool,
}

impl OfferStats {
    /// Builds the statistics from envelopes in commit order.
    ///
    /// Envelopes of other aggregate types are ignored.
    pub fn from_envelopes<'a>(
        envelopes: impl IntoIterator<Item = &'a EventEnvelope>,
    ) -> Result<Self, DomainError> {
        let mut offers: HashMap<AggregateId, Tally> = HashMap::new();

        for envelope in envelopes {
            if envelope.aggregate_type != Offer::aggregate_type() {
                continue;
            }
            let event: OfferEvent = serde_json::from_value(envelope.payload.clone())?;
            let offer_id = envelope.aggregate_id;

            match event {
                OfferEvent::OfferAutoAccepted(data) | OfferEvent::OfferQueued(data) => {
                    let discount =
                        margin::discount_percentage(data.product.price, data.offered_price)
                            .unwrap_or(Decimal::ZERO);
                    offers.insert(
                        offer_id,
                        Tally {
                            status: OfferStatus::initial(data.within_margin),
                            discount,
                            within_margin: data.within_margin,
                        },
                    );
                }
                OfferEvent::OfferAcceptedManually(_) => {
                    set_status(&mut offers, offer_id, OfferStatus::Accepted)
                }
                OfferEvent::OfferRejected(_) => {
                    set_status(&mut offers, offer_id, OfferStatus::Rejected)
                }
                OfferEvent::CouponRedeemed(_) => {
                    set_status(&mut offers, offer_id, OfferStatus::Expired)
                }
            }
        }

        Ok(Self::from_tallies(offers.values()))
    }

    fn from_tallies<'a>(tallies: impl Iterator<Item = &'a Tally>) -> Self {
        let mut sums: HashMap<OfferStatus, (usize, Decimal)> =
            OfferStatus::ALL.iter().map(|s| (*s, (0, Decimal::ZERO))).collect();
        let mut stats = OfferStats::default();

        for tally in tallies {
            stats.total += 1;
            if tally.within_margin {
                stats.within_margin += 1;
            } else {
                stats.outside_margin += 1;
            }
            let entry = sums.entry(tally.status).or_default();
            entry.0 += 1;
            entry.1 += tally.discount;
        }

        stats.by_status = sums
            .into_iter()
            .map(|(status, (count, sum))| {
                let avg_discount = if count == 0 {
                    Decimal::ZERO
                } else {
                    (sum / Decimal::from(count)).round_dp(2)
                };
                (status, StatusStats { count, avg_discount })
            })
            .collect();

        stats
    }

    /// Returns the entry for `status`.
    pub fn status(&self, status: OfferStatus) -> StatusStats {
        self.by_status.get(&status).copied().unwrap_or_default()
    }
}

fn set_status(
    offers: &mut HashMap<AggregateId, Tally>,
    offer_id: AggregateId,
    status: OfferStatus,
) {
    if let Some(tally) = offers.get_mut(&offer_id) {
        tally.status = status;
    }
}
