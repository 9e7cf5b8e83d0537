//! Payment collection in the terminal.
//!
//! Prints the gateway order the browser popup would be opened with and reads
//! the signed callback back from stdin.

use clubhouse_client::payment::{GatewayOrder, PaymentGateway, PaymentOutcome, SignedPayment};
use clubhouse_core::Money;
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};

/// The fields Razorpay hands to the checkout success handler.
#[derive(Deserialize)]
struct RazorpayCallback {
    razorpay_payment_id: String,
    razorpay_order_id: String,
    razorpay_signature: String,
}

/// Collects payments by prompting on the terminal.
pub struct TerminalGateway;

impl PaymentGateway for TerminalGateway {
    async fn collect(&self, order: &GatewayOrder) -> PaymentOutcome {
        let amount = Decimal::new(
            i64::try_from(order.amount_minor).unwrap_or(i64::MAX),
            2,
        );

        #[allow(clippy::print_stdout)]
        {
            println!();
            println!("Pay {} for {}", Money::new(amount, order.currency), order.description);
            println!("  Gateway order  {}", order.gateway_order_id);
            println!("  Key            {}", order.key_id.as_deref().unwrap_or("(not configured)"));
            println!("  Prefill        {} <{}> {}", order.prefill.name, order.prefill.email, order.prefill.contact);
            println!();
            println!("Paste the success callback JSON, `fail <reason>`, or press Enter to cancel:");
        }

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        match lines.next_line().await {
            Ok(Some(line)) => parse_response(&line, order),
            Ok(None) => PaymentOutcome::Cancelled,
            Err(e) => PaymentOutcome::Failed {
                reason: format!("could not read payment response: {e}"),
            },
        }
    }
}

/// Interpret one line typed at the payment prompt.
fn parse_response(line: &str, order: &GatewayOrder) -> PaymentOutcome {
    let line = line.trim();
    if line.is_empty() || line.eq_ignore_ascii_case("cancel") {
        return PaymentOutcome::Cancelled;
    }
    if let Some(reason) = line.strip_prefix("fail") {
        let reason = reason.trim();
        return PaymentOutcome::Failed {
            reason: if reason.is_empty() {
                "payment declined".to_string()
            } else {
                reason.to_string()
            },
        };
    }

    match serde_json::from_str::<RazorpayCallback>(line) {
        Ok(callback) if callback.razorpay_order_id == order.gateway_order_id => {
            PaymentOutcome::Succeeded(SignedPayment {
                gateway_order_id: callback.razorpay_order_id,
                payment_id: callback.razorpay_payment_id,
                signature: callback.razorpay_signature,
            })
        }
        Ok(_) => PaymentOutcome::Failed {
            reason: "callback is for a different order".to_string(),
        },
        Err(e) => PaymentOutcome::Failed {
            reason: format!("unreadable callback: {e}"),
        },
    }
}
