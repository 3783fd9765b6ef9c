//! Order and payment status state machines.

use serde::{Deserialize, Serialize};

/// The lifecycle status of an order.
///
/// Status transitions:
/// ```text
/// Placed ──► Processing ──► Shipped ──► Completed ──► ReturnRequested ──► Returned
///    │            │
///    └────────────┴──► Canceled
/// ```
///
/// `Canceled` and `Returned` are terminal. `Completed` is terminal for the
/// cancel path; its only exit is the customer-initiated return flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Order created from a cart, awaiting payment and fulfillment.
    #[default]
    Placed,

    /// Order accepted and being prepared.
    Processing,

    /// Order handed to the carrier.
    Shipped,

    /// Order delivered; eligible for the return flow.
    Completed,

    /// Order canceled before completion (terminal).
    Canceled,

    /// Customer requested a return, awaiting operator confirmation.
    ReturnRequested,

    /// Return confirmed, stock and wallet reconciled (terminal).
    Returned,
}

impl OrderStatus {
    /// Returns true if the status permits a transition to `next`.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Placed, Processing)
                | (Placed, Canceled)
                | (Processing, Shipped)
                | (Processing, Canceled)
                | (Shipped, Completed)
                | (Completed, ReturnRequested)
                | (ReturnRequested, Returned)
        )
    }

    /// Returns true if the order can still be canceled by the customer.
    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderStatus::Placed | OrderStatus::Processing)
    }

    /// Returns true if the customer can request a return in this status.
    pub fn can_request_return(&self) -> bool {
        matches!(self, OrderStatus::Completed)
    }

    /// Returns true if no further customer-facing action applies.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::Canceled | OrderStatus::Returned
        )
    }

    /// Returns the status name as stored and reported.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Placed => "PLACED",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Canceled => "CANCELED",
            OrderStatus::ReturnRequested => "RETURN_REQUESTED",
            OrderStatus::Returned => "RETURNED",
        }
    }

    /// Parses a stored status name.
    pub fn parse(s: &str) -> Option<OrderStatus> {
        match s {
            "PLACED" => Some(OrderStatus::Placed),
            "PROCESSING" => Some(OrderStatus::Processing),
            "SHIPPED" => Some(OrderStatus::Shipped),
            "COMPLETED" => Some(OrderStatus::Completed),
            "CANCELED" => Some(OrderStatus::Canceled),
            "RETURN_REQUESTED" => Some(OrderStatus::ReturnRequested),
            "RETURNED" => Some(OrderStatus::Returned),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether payment has been captured for an order.
///
/// Transitions `NotPaid → Paid` exactly once; there is no way back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentStatus {
    /// No successful capture recorded.
    #[default]
    NotPaid,

    /// Payment captured by the gateway.
    Paid,
}

impl PaymentStatus {
    /// Returns true if payment has been captured.
    pub fn is_paid(&self) -> bool {
        matches!(self, PaymentStatus::Paid)
    }

    /// Returns the status name as stored and reported.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::NotPaid => "NOT PAID",
            PaymentStatus::Paid => "PAID",
        }
    }

    /// Parses a stored status name.
    pub fn parse(s: &str) -> Option<PaymentStatus> {
        match s {
            "NOT PAID" => Some(PaymentStatus::NotPaid),
            "PAID" => Some(PaymentStatus::Paid),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_placed() {
        assert_eq!(OrderStatus::default(), OrderStatus::Placed);
    }

    #[test]
    fn test_forward_transitions() {
        assert!(OrderStatus::Placed.can_transition_to(OrderStatus::Processing));
        assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Shipped));
        assert!(OrderStatus::Shipped.can_transition_to(OrderStatus::Completed));
        assert!(OrderStatus::Completed.can_transition_to(OrderStatus::ReturnRequested));
        assert!(OrderStatus::ReturnRequested.can_transition_to(OrderStatus::Returned));
    }

    #[test]
    fn test_cancel_only_from_placed_or_processing() {
        assert!(OrderStatus::Placed.can_cancel());
        assert!(OrderStatus::Processing.can_cancel());
        assert!(!OrderStatus::Shipped.can_cancel());
        assert!(!OrderStatus::Completed.can_cancel());
        assert!(!OrderStatus::Canceled.can_cancel());
        assert!(!OrderStatus::ReturnRequested.can_cancel());
        assert!(!OrderStatus::Returned.can_cancel());
    }

    #[test]
    fn test_no_transition_out_of_terminal_states() {
        for next in [
            OrderStatus::Placed,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Completed,
            OrderStatus::Canceled,
            OrderStatus::ReturnRequested,
            OrderStatus::Returned,
        ] {
            assert!(!OrderStatus::Canceled.can_transition_to(next));
            assert!(!OrderStatus::Returned.can_transition_to(next));
        }
    }

    #[test]
    fn test_completed_exits_only_into_return_flow() {
        assert!(OrderStatus::Completed.is_terminal());
        assert!(OrderStatus::Completed.can_request_return());
        assert!(!OrderStatus::Completed.can_transition_to(OrderStatus::Canceled));
        assert!(!OrderStatus::Completed.can_transition_to(OrderStatus::Shipped));
    }

    #[test]
    fn test_no_skipping_states() {
        assert!(!OrderStatus::Placed.can_transition_to(OrderStatus::Shipped));
        assert!(!OrderStatus::Placed.can_transition_to(OrderStatus::Completed));
        assert!(!OrderStatus::Processing.can_transition_to(OrderStatus::Completed));
    }

    #[test]
    fn test_status_string_roundtrip() {
        for status in [
            OrderStatus::Placed,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Completed,
            OrderStatus::Canceled,
            OrderStatus::ReturnRequested,
            OrderStatus::Returned,
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::parse("PENDING"), None);
    }

    #[test]
    fn test_payment_status_strings() {
        assert_eq!(PaymentStatus::Paid.as_str(), "PAID");
        assert_eq!(PaymentStatus::NotPaid.as_str(), "NOT PAID");
        assert_eq!(PaymentStatus::parse("PAID"), Some(PaymentStatus::Paid));
        assert_eq!(PaymentStatus::parse("NOT PAID"), Some(PaymentStatus::NotPaid));
        assert!(!PaymentStatus::default().is_paid());
    }
}
