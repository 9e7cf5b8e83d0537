//! Club, membership plan, coupon and points commands.

use clubhouse_client::coupon::CouponSlot;
use clubhouse_core::ClubId;
use rust_decimal::Decimal;

use super::{connect, money};
use crate::error::CliError;

/// Print all clubs.
pub async fn list() -> Result<(), CliError> {
    let ctx = connect().await?;
    let clubs = ctx.api.list_clubs().await?;

    #[allow(clippy::print_stdout)]
    {
        for club in clubs {
            println!(
                "{:<24} {:<32} {:<16} {} members",
                club.id,
                club.name,
                club.city.as_deref().unwrap_or("-"),
                club.member_count
            );
        }
    }
    Ok(())
}

/// Print a club's membership plans and the caller's membership, if any.
pub async fn plans(club: &str) -> Result<(), CliError> {
    let ctx = connect().await?;
    let club = ClubId::new(club);
    let plans = ctx.api.list_membership_plans(&club).await?;
    let membership = if ctx.api.auth().current().await.is_some() {
        ctx.api.my_membership(&club).await?
    } else {
        None
    };

    #[allow(clippy::print_stdout)]
    {
        for plan in plans {
            let current = membership
                .as_ref()
                .is_some_and(|m| m.plan_id == plan.id && m.status.is_active());
            println!(
                "{} {:<20} {:<28} {:>12} / {} days",
                if current { "*" } else { " " },
                plan.id,
                plan.name,
                money(plan.price, plan.currency),
                plan.duration_days
            );
        }
    }
    Ok(())
}

/// Check a coupon code against an amount.
pub async fn coupon(code: &str, club: &str, amount: Decimal) -> Result<(), CliError> {
    let ctx = connect().await?;
    let mut slot = CouponSlot::new();
    let coupon = slot.apply(&ctx.api, code, &ClubId::new(club), amount).await?;

    #[allow(clippy::print_stdout)]
    {
        println!("{} ({})", coupon.code, coupon.name);
        println!("  Discount     {}", money(coupon.discount, Default::default()));
        println!("  Final price  {}", money(coupon.final_price, Default::default()));
    }
    Ok(())
}

/// Print the caller's points balance in a club.
pub async fn points_balance(club: &str) -> Result<(), CliError> {
    let ctx = connect().await?;
    ctx.api.auth().require_role(&[clubhouse_core::UserType::Member]).await?;
    let balance = ctx.api.points_balance(&ClubId::new(club)).await?;

    #[allow(clippy::print_stdout)]
    {
        match balance.point_value {
            Some(value) => println!(
                "{} points (worth {})",
                balance.available,
                money(value * Decimal::from(balance.available), Default::default())
            ),
            None => println!("{} points", balance.available),
        }
    }
    Ok(())
}
