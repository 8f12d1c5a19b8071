//! Offer state machine.

use serde::{Deserialize, Serialize};

use super::OfferError;

/// The status of an offer in its lifecycle.
///
/// State transitions:
/// ```text
/// (new) ──within margin──► Accepted ──redeem coupon──► Expired
///   │                         ▲
///   └──outside margin──► Pending ──admin reject──► Rejected
///                             │
///                             └──admin accept──► Accepted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OfferStatus {
    /// Outside the margin, waiting for an administrator.
    #[default]
    Pending,

    /// Coupon issued, not yet redeemed.
    Accepted,

    /// Turned down by an administrator (terminal state).
    Rejected,

    /// Coupon redeemed (terminal state).
    Expired,
}

/// Actions that move an existing offer between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OfferAction {
    AcceptManually,
    Reject,
    RedeemCoupon,
}

impl OfferAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            OfferAction::AcceptManually => "accept",
            OfferAction::Reject => "reject",
            OfferAction::RedeemCoupon => "redeem coupon",
        }
    }
}

impl OfferStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [OfferStatus; 4] = [
        OfferStatus::Pending,
        OfferStatus::Accepted,
        OfferStatus::Rejected,
        OfferStatus::Expired,
    ];

    /// Status a new offer starts in.
    pub fn initial(within_margin: bool) -> Self {
        if within_margin {
            OfferStatus::Accepted
        } else {
            OfferStatus::Pending
        }
    }

    /// Returns the status `action` leads to, or `IllegalTransition`.
    ///
    /// This is the only place the transition table lives.
    pub fn transition(self, action: OfferAction) -> Result<OfferStatus, OfferError> {
        match (self, action) {
            (OfferStatus::Pending, OfferAction::AcceptManually) => Ok(OfferStatus::Accepted),
            (OfferStatus::Pending, OfferAction::Reject) => Ok(OfferStatus::Rejected),
            (OfferStatus::Accepted, OfferAction::RedeemCoupon) => Ok(OfferStatus::Expired),
            (current_state, action) => Err(OfferError::IllegalTransition {
                current_state,
                action: action.as_str(),
            }),
        }
    }

    /// Returns true if `action` is allowed from this status.
    pub fn allows(self, action: OfferAction) -> bool {
        self.transition(action).is_ok()
    }

    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, OfferStatus::Rejected | OfferStatus::Expired)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OfferStatus::Pending => "pending",
            OfferStatus::Accepted => "accepted",
            OfferStatus::Rejected => "rejected",
            OfferStatus::Expired => "expired",
        }
    }
}

impl std::fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_status_follows_verdict() {
        assert_eq!(OfferStatus::initial(true), OfferStatus::Accepted);
        assert_eq!(OfferStatus::initial(false), OfferStatus::Pending);
    }

    #[test]
    fn only_pending_can_be_reviewed() {
        for status in OfferStatus::ALL {
            let expected = status == OfferStatus::Pending;
            assert_eq!(status.allows(OfferAction::AcceptManually), expected, "{status}");
            assert_eq!(status.allows(OfferAction::Reject), expected, "{status}");
        }
    }

    #[test]
    fn only_accepted_can_redeem() {
        for status in OfferStatus::ALL {
            assert_eq!(
                status.allows(OfferAction::RedeemCoupon),
                status == OfferStatus::Accepted,
                "{status}"
            );
        }
    }

    #[test]
    fn transition_targets() {
        assert_eq!(
            OfferStatus::Pending.transition(OfferAction::AcceptManually).unwrap(),
            OfferStatus::Accepted
        );
        assert_eq!(
            OfferStatus::Pending.transition(OfferAction::Reject).unwrap(),
            OfferStatus::Rejected
        );
        assert_eq!(
            OfferStatus::Accepted.transition(OfferAction::RedeemCoupon).unwrap(),
            OfferStatus::Expired
        );
    }

    #[test]
    fn illegal_transition_names_state_and_action() {
        let err = OfferStatus::Rejected
            .transition(OfferAction::AcceptManually)
            .unwrap_err();
        assert!(matches!(
            err,
            OfferError::IllegalTransition {
                current_state: OfferStatus::Rejected,
                action: "accept"
            }
        ));
    }

    #[test]
    fn terminal_states() {
        assert!(!OfferStatus::Pending.is_terminal());
        assert!(!OfferStatus::Accepted.is_terminal());
        assert!(OfferStatus::Rejected.is_terminal());
        assert!(OfferStatus::Expired.is_terminal());
        for status in OfferStatus::ALL.into_iter().filter(OfferStatus::is_terminal) {
            assert!(!status.allows(OfferAction::AcceptManually));
            assert!(!status.allows(OfferAction::Reject));
            assert!(!status.allows(OfferAction::RedeemCoupon));
        }
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&OfferStatus::Accepted).unwrap(),
            "\"accepted\""
        );
        let back: OfferStatus = serde_json::from_str("\"expired\"").unwrap();
        assert_eq!(back, OfferStatus::Expired);
    }
}
