//! Offline ticket quote.

use std::fmt::Write as _;

use chrono::{Duration, Utc};
use clap::Args;
use clubhouse_client::config::fees_from_env;
use clubhouse_core::{
    Buyer, CurrencyCode, DiscountKind, DiscountValue, EarlyBirdRule, FeeSchedule,
    GroupDiscountRule, MemberDiscountRule, OrderTotals, Payable, TicketPricing, TicketQuote,
};
use rust_decimal::Decimal;

use super::money;
use crate::error::CliError;

#[derive(Args)]
pub struct QuoteArgs {
    /// Ticket price
    #[arg(short, long)]
    pub price: Decimal,

    /// Number of attendees
    #[arg(short, long, default_value_t = 1)]
    pub attendees: u32,

    /// Price for an active club member
    #[arg(long)]
    pub member: bool,

    /// Early-bird discount, e.g. `10%` or `150`; treated as currently open
    #[arg(long, value_parser = parse_discount)]
    pub early_bird: Option<DiscountValue>,

    /// Restrict the early-bird discount to members
    #[arg(long)]
    pub early_bird_members_only: bool,

    /// Member discount, e.g. `10%` or `150`
    #[arg(long, value_parser = parse_discount)]
    pub member_discount: Option<DiscountValue>,

    /// Group discount, e.g. `10%` or `150`
    #[arg(long, value_parser = parse_discount)]
    pub group_discount: Option<DiscountValue>,

    /// Attendees needed for the group discount
    #[arg(long, default_value_t = 5)]
    pub group_min: u32,

    /// Coupon discount granted by the backend
    #[arg(long, default_value_t = Decimal::ZERO)]
    pub coupon: Decimal,

    /// Points discount granted by the backend
    #[arg(long, default_value_t = Decimal::ZERO)]
    pub points: Decimal,
}

/// Parse `10%` as a percentage and `150` as a fixed amount.
pub fn parse_discount(raw: &str) -> Result<DiscountValue, String> {
    let raw = raw.trim();
    let (number, percent) = raw
        .strip_suffix('%')
        .map_or((raw, false), |n| (n.trim_end(), true));
    let value: Decimal = number
        .parse()
        .map_err(|_| format!("`{raw}` is not an amount or a percentage"))?;

    if value.is_sign_negative() {
        return Err("discounts cannot be negative".to_string());
    }
    if percent {
        Ok(DiscountValue::Percentage(value))
    } else {
        Ok(DiscountValue::Fixed(value))
    }
}

/// Print the quote.
pub fn run(args: &QuoteArgs) -> Result<(), CliError> {
    let now = Utc::now();
    let pricing = TicketPricing {
        ticket_price: args.price,
        currency: CurrencyCode::INR,
        early_bird: args.early_bird.map(|value| EarlyBirdRule {
            value,
            starts_at: now - Duration::days(1),
            ends_at: now + Duration::days(1),
            members_only: args.early_bird_members_only,
        }),
        member_discount: args.member_discount.map(|value| MemberDiscountRule { value }),
        group_discount: args.group_discount.map(|value| GroupDiscountRule {
            value,
            min_attendees: args.group_min,
        }),
    };
    let buyer = if args.member {
        Buyer::member()
    } else {
        Buyer::guest()
    };

    let quote = pricing.quote(buyer, args.attendees, now)?;
    let totals = OrderTotals::new(quote.subtotal)
        .with_coupon(args.coupon)
        .with_points(args.points);
    let fees = fees_from_env()?;

    #[allow(clippy::print_stdout)]
    {
        print!("{}", render(&quote, &totals, &fees));
    }
    Ok(())
}

fn render(quote: &TicketQuote, totals: &OrderTotals, fees: &FeeSchedule) -> String {
    let currency = quote.currency;
    let mut out = String::new();

    let _ = writeln!(out, "{:<24}{}", "Ticket price", money(quote.ticket_price, currency));
    for step in &quote.steps {
        let label = match step.kind {
            DiscountKind::EarlyBird => "Early bird",
            DiscountKind::Member => "Member",
            DiscountKind::Group => "Group",
        };
        let _ = writeln!(
            out,
            "  {label:<22}-{} -> {}",
            money(step.amount_off, currency),
            money(step.price_after, currency)
        );
    }
    let _ = writeln!(out, "{:<24}{}", "Per ticket", money(quote.per_ticket, currency));
    let _ = writeln!(out, "{:<24}{}", "Attendees", quote.attendees);
    let _ = writeln!(out, "{:<24}{}", "Subtotal", money(quote.subtotal, currency));
    if totals.coupon_discount > Decimal::ZERO {
        let _ = writeln!(out, "{:<24}-{}", "Coupon", money(totals.coupon_discount, currency));
    }
    if totals.points_discount > Decimal::ZERO {
        let _ = writeln!(out, "{:<24}-{}", "Points", money(totals.points_discount, currency));
    }

    match totals.settle(fees) {
        Payable::Free => {
            let _ = writeln!(out, "{:<24}{}", "Total", money(Decimal::ZERO, currency));
            let _ = writeln!(out, "Nothing to pay; registration is free.");
        }
        Payable::Paid(breakdown) => {
            let _ = writeln!(out, "{:<24}{}", "Net payable", money(breakdown.net, currency));
            let rows = [
                (format!("Platform fee ({}%)", fees.platform_rate), breakdown.platform_fee),
                (format!("  GST ({}%)", fees.platform_gst_rate), breakdown.platform_fee_gst),
                (format!("Gateway fee ({}%)", fees.gateway_rate), breakdown.gateway_fee),
                (format!("  GST ({}%)", fees.gateway_gst_rate), breakdown.gateway_fee_gst),
            ];
            for (label, amount) in rows {
                let _ = writeln!(out, "{label:<24}{}", money(amount, currency));
            }
            let _ = writeln!(out, "{:<24}{}", "Total", money(breakdown.final_amount, currency));
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_discount() {
        assert_eq!(
            parse_discount("10%").unwrap(),
            DiscountValue::Percentage(dec!(10))
        );
        assert_eq!(parse_discount(" 150 ").unwrap(), DiscountValue::Fixed(dec!(150)));
        assert!(parse_discount("ten").is_err());
        assert!(parse_discount("-5%").is_err());
    }

    #[test]
    fn test_render_lists_steps_and_fees() {
        let now = Utc::now();
        let pricing = TicketPricing {
            ticket_price: dec!(1000),
            currency: CurrencyCode::INR,
            early_bird: Some(EarlyBirdRule {
                value: DiscountValue::Percentage(dec!(10)),
                starts_at: now - Duration::days(1),
                ends_at: now + Duration::days(1),
                members_only: false,
            }),
            member_discount: Some(MemberDiscountRule {
                value: DiscountValue::Fixed(dec!(50)),
            }),
            group_discount: None,
        };
        let quote = pricing.quote(Buyer::member(), 3, now).unwrap();
        let totals = OrderTotals::new(quote.subtotal).with_coupon(dec!(300));

        let text = render(&quote, &totals, &FeeSchedule::default());
        assert!(text.contains("Early bird"));
        assert!(text.contains("Subtotal"));
        assert!(text.contains("2550.00"));
        assert!(text.contains("2435.85"));
    }

    #[test]
    fn test_render_free_registration() {
        let now = Utc::now();
        let pricing = TicketPricing {
            ticket_price: dec!(200),
            currency: CurrencyCode::INR,
            early_bird: None,
            member_discount: None,
            group_discount: None,
        };
        let quote = pricing.quote(Buyer::guest(), 1, now).unwrap();
        let totals = OrderTotals::new(quote.subtotal).with_points(dec!(250));

        let text = render(&quote, &totals, &FeeSchedule::default());
        assert!(text.contains("registration is free"));
    }
}
