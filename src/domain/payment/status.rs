//! Payment status state machine.
//!
//! One payment record is one attempt. `Processing` is the only state an
//! attempt starts in; `Completed`, `Failed` and `Refunded` end it, although a
//! completed payment can still be refunded.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// The gateway deferred settlement; a later webhook decides the outcome.
    Pending,

    /// Persisted before the gateway call; the attempt is in flight.
    Processing,

    /// Money captured. Only a refund can follow.
    Completed,

    /// The attempt is dead. Retrying creates a new payment.
    Failed,

    /// Money returned to the customer.
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Processing => "processing",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "pending" => Some(PaymentStatus::Pending),
            "processing" => Some(PaymentStatus::Processing),
            "completed" => Some(PaymentStatus::Completed),
            "failed" => Some(PaymentStatus::Failed),
            "refunded" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }

    /// Returns true while the gateway outcome is still unknown.
    pub fn is_unsettled(&self) -> bool {
        matches!(self, PaymentStatus::Pending | PaymentStatus::Processing)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StateMachine for PaymentStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, target),
            (Pending, Processing)
                | (Pending, Completed)
                | (Pending, Failed)
                | (Processing, Completed)
                | (Processing, Failed)
                | (Processing, Pending)
                | (Completed, Refunded)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use PaymentStatus::*;
        match self {
            Pending => vec![Processing, Completed, Failed],
            Processing => vec![Completed, Failed, Pending],
            Completed => vec![Refunded],
            Failed => vec![],
            Refunded => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PaymentStatus::*;

    const ALL: [PaymentStatus; 5] = [Pending, Processing, Completed, Failed, Refunded];

    #[test]
    fn processing_can_settle_or_defer() {
        assert!(Processing.can_transition_to(&Completed));
        assert!(Processing.can_transition_to(&Failed));
        assert!(Processing.can_transition_to(&Pending));
        assert!(!Processing.can_transition_to(&Refunded));
    }

    #[test]
    fn pending_settles_later() {
        assert!(Pending.can_transition_to(&Completed));
        assert!(Pending.can_transition_to(&Failed));
    }

    #[test]
    fn completed_only_moves_to_refunded() {
        assert_eq!(Completed.valid_transitions(), vec![Refunded]);
        assert!(!Completed.can_transition_to(&Failed));
        assert!(!Completed.can_transition_to(&Completed));
    }

    #[test]
    fn failed_and_refunded_are_terminal() {
        assert!(Failed.is_terminal());
        assert!(Refunded.is_terminal());
        for target in ALL {
            assert!(!Failed.can_transition_to(&target));
        }
    }

    #[test]
    fn valid_transitions_agree_with_can_transition_to() {
        for from in ALL {
            for to in ALL {
                assert_eq!(
                    from.valid_transitions().contains(&to),
                    from.can_transition_to(&to),
                    "{:?} -> {:?}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn serializes_as_snake_case() {
        assert_eq!(serde_json::to_string(&Completed).unwrap(), "\"completed\"");
        assert_eq!(PaymentStatus::parse("PROCESSING"), Some(Processing));
    }
}
