//! Order status state machine.
//!
//! The order module owns these rules. Payments only ever request the
//! `Paid` and `Refunded` edges and must tolerate a rejection.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fulfilment status of a customer order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Paid,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    /// Returns true if a payment attempt may be started for the order.
    pub fn is_payable(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Confirmed)
    }

    /// Stable lowercase name used in storage and responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Paid => "paid",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }

    /// Parses the stored representation.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "pending" => Some(OrderStatus::Pending),
            "confirmed" => Some(OrderStatus::Confirmed),
            "paid" => Some(OrderStatus::Paid),
            "processing" => Some(OrderStatus::Processing),
            "shipped" => Some(OrderStatus::Shipped),
            "delivered" => Some(OrderStatus::Delivered),
            "cancelled" => Some(OrderStatus::Cancelled),
            "refunded" => Some(OrderStatus::Refunded),
            _ => None,
        }
    }

    /// Statuses from which `target` can be reached.
    pub fn sources_of(target: OrderStatus) -> Vec<OrderStatus> {
        ALL.iter()
            .copied()
            .filter(|s| s.can_transition_to(&target))
            .collect()
    }
}

const ALL: [OrderStatus; 8] = [
    OrderStatus::Pending,
    OrderStatus::Confirmed,
    OrderStatus::Paid,
    OrderStatus::Processing,
    OrderStatus::Shipped,
    OrderStatus::Delivered,
    OrderStatus::Cancelled,
    OrderStatus::Refunded,
];

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StateMachine for OrderStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use OrderStatus::*;
        matches!(
            (self, target),
            (Pending, Confirmed)
                | (Pending, Paid)
                | (Pending, Cancelled)
                | (Confirmed, Paid)
                | (Confirmed, Cancelled)
                | (Paid, Processing)
                | (Paid, Cancelled)
                | (Paid, Refunded)
                | (Processing, Shipped)
                | (Processing, Refunded)
                | (Shipped, Delivered)
                | (Shipped, Refunded)
                | (Delivered, Refunded)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use OrderStatus::*;
        match self {
            Pending => vec![Confirmed, Paid, Cancelled],
            Confirmed => vec![Paid, Cancelled],
            Paid => vec![Processing, Cancelled, Refunded],
            Processing => vec![Shipped, Refunded],
            Shipped => vec![Delivered, Refunded],
            Delivered => vec![Refunded],
            Cancelled => vec![],
            Refunded => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pending_and_confirmed_are_payable() {
        let payable: Vec<_> = ALL.iter().filter(|s| s.is_payable()).collect();
        assert_eq!(payable, vec![&OrderStatus::Pending, &OrderStatus::Confirmed]);
    }

    #[test]
    fn paid_is_reachable_from_pending_and_confirmed_only() {
        assert_eq!(
            OrderStatus::sources_of(OrderStatus::Paid),
            vec![OrderStatus::Pending, OrderStatus::Confirmed]
        );
    }

    #[test]
    fn cancelled_order_cannot_be_paid_or_refunded() {
        assert!(!OrderStatus::Cancelled.can_transition_to(&OrderStatus::Paid));
        assert!(!OrderStatus::Cancelled.can_transition_to(&OrderStatus::Refunded));
        assert!(OrderStatus::Cancelled.is_terminal());
    }

    #[test]
    fn any_fulfilment_stage_after_payment_can_be_refunded() {
        for status in [
            OrderStatus::Paid,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        ] {
            assert!(status.can_transition_to(&OrderStatus::Refunded), "{:?}", status);
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
    fn parse_round_trips_every_status() {
        for status in ALL {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::parse("lost"), None);
    }
}
