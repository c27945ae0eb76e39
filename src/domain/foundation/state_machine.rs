//! State machine trait for status enums.
//!
//! Payments and orders both move through a fixed lifecycle. Implementors list
//! their legal edges once and every caller validates against the same table.

use super::ValidationError;

/// Trait for status enums that represent state machines.
///
/// # Example
///
/// ```ignore
/// impl StateMachine for PaymentStatus {
///     fn can_transition_to(&self, target: &Self) -> bool {
///         matches!((self, target), (Processing, Completed) | (Completed, Refunded))
///     }
///
///     fn valid_transitions(&self) -> Vec<Self> {
///         match self {
///             Processing => vec![Completed],
///             Completed => vec![Refunded],
///             Refunded => vec![],
///         }
///     }
/// }
///
/// let next = PaymentStatus::Processing.transition_to(PaymentStatus::Completed)?;
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs transition with validation, returning error if invalid.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_format(
                "status",
                format!("Cannot transition from {:?} to {:?}", self, target),
            ))
        }
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}
