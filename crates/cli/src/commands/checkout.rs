//! Event registration checkout.

use clap::Args;
use clubhouse_client::checkout::{Checkout, CheckoutEvent, CheckoutForm, CheckoutKind};
use clubhouse_client::{ApiClient, NoticeKind};
use clubhouse_core::{Buyer, EventId};
use tokio::sync::mpsc;

use super::{connect, money};
use crate::error::CliError;
use crate::gateway::TerminalGateway;

#[derive(Args)]
pub struct EventCheckoutArgs {
    /// Event ID
    pub event: String,

    /// Number of attendees
    #[arg(short, long, default_value_t = 1)]
    pub attendees: u32,

    /// Buyer name
    #[arg(long)]
    pub name: String,

    /// Buyer email
    #[arg(long)]
    pub email: String,

    /// Buyer phone number
    #[arg(long)]
    pub phone: String,

    /// Coupon code to apply
    #[arg(long)]
    pub coupon: Option<String>,

    /// Loyalty points to redeem
    #[arg(long)]
    pub points: Option<u64>,
}

/// Register for an event, collecting payment in the terminal.
pub async fn event(args: EventCheckoutArgs) -> Result<(), CliError> {
    let ctx = connect().await?;
    let event = ctx.api.get_event(&EventId::new(args.event.as_str())).await?;
    if !event.registration_open {
        return Err(CliError::Input(format!(
            "Registration for {} is closed.",
            event.title
        )));
    }

    let buyer = buyer_for(&ctx.api, &event.club_id).await?;
    let (checkout, events) = Checkout::new(
        CheckoutKind::EventTickets {
            event,
            attendees: args.attendees,
            buyer,
        },
        ctx.config.fees,
    );
    let mut checkout = checkout.with_gateway_key(ctx.config.payment.razorpay_key_id.clone());
    checkout.form = CheckoutForm {
        name: args.name,
        email: args.email,
        phone: args.phone,
        address: None,
        shipping_required: false,
    };

    let printer = tokio::spawn(print_events(events));
    let result = run_checkout(&mut checkout, &ctx.api, args.coupon.as_deref(), args.points).await;

    if result.is_err() {
        checkout.close(&ctx.api).await;
    } else {
        drop(checkout);
    }
    // The printer ends once the checkout (and its sender) is gone
    let _ = printer.await;

    result
}

async fn run_checkout(
    checkout: &mut Checkout,
    api: &ApiClient,
    coupon: Option<&str>,
    points: Option<u64>,
) -> Result<(), CliError> {
    if let Some(code) = coupon {
        checkout.apply_coupon(api, code).await?;
    }
    if let Some(points) = points {
        checkout.redeem_points(api, points).await?;
    }

    let receipt = checkout.submit(api, &TerminalGateway).await?;

    #[allow(clippy::print_stdout)]
    {
        println!("Order {}", receipt.order_id);
        println!("  Paid  {}", money(receipt.amount, receipt.currency));
        if let Some(payment_id) = receipt.payment_id {
            println!("  Payment {payment_id}");
        }
    }
    Ok(())
}

/// Active members get member pricing; guests and signed-out users do not.
async fn buyer_for(api: &ApiClient, club: &clubhouse_core::ClubId) -> Result<Buyer, CliError> {
    if api.auth().current().await.is_none() {
        return Ok(Buyer::guest());
    }
    let active = api
        .my_membership(club)
        .await?
        .is_some_and(|m| m.status.is_active());
    Ok(if active { Buyer::member() } else { Buyer::guest() })
}

async fn print_events(mut events: mpsc::UnboundedReceiver<CheckoutEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            CheckoutEvent::StateChanged { from, to } => {
                tracing::debug!(from = from.name(), to = to.name(), "Checkout state");
            }
            CheckoutEvent::Priced { totals, fees } => {
                tracing::info!(
                    subtotal = %totals.subtotal,
                    payable = %fees.map_or_else(Default::default, |f| f.final_amount),
                    "Checkout priced"
                );
            }
            CheckoutEvent::Notice(notice) => {
                #[allow(clippy::print_stdout)]
                {
                    match notice.kind {
                        NoticeKind::Error(_) => println!("! {notice}"),
                        NoticeKind::Success | NoticeKind::Info => println!("{notice}"),
                    }
                }
            }
        }
    }
}
