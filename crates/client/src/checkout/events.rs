//! Messages a checkout emits while it runs.

use clubhouse_core::{FeeBreakdown, OrderTotals};

use super::CheckoutState;
use crate::error::Notice;

/// Emitted on the checkout's event channel, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutEvent {
    /// The state machine moved.
    StateChanged {
        from: CheckoutState,
        to: CheckoutState,
    },
    /// Totals were computed for a submission.
    Priced {
        totals: OrderTotals,
        fees: Option<FeeBreakdown>,
    },
    /// A user-facing notification.
    Notice(Notice),
}
