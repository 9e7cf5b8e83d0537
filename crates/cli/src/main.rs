//! Clubhouse CLI - quotes, sessions and checkout from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Price three tickets with a 10% member discount, offline
//! ch-cli quote --price 1000 --member-discount 10% --member --attendees 3
//!
//! # Sign in and list your devices
//! ch-cli login -e fan@example.in -t member
//! ch-cli sessions list
//!
//! # Check delivery to a PIN code
//! ch-cli shipping 560001 --items 2 --value 1998
//!
//! # Buy event tickets
//! ch-cli checkout event evt_123 --attendees 2 --name "Asha Rao" \
//!     --email asha@example.in --phone 9876543210 --coupon MATCHDAY
//! ```
//!
//! # Commands
//!
//! - `quote` - Offline ticket quote with fee breakdown
//! - `login` / `logout` / `sessions` - Session and device management
//! - `clubs` / `plans` - Browse clubs and membership plans
//! - `coupon` / `points` - Check a coupon or a points balance
//! - `shipping` - Cheapest courier for a PIN code
//! - `checkout event` - Register for an event, paying in the terminal

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod error;
mod gateway;

use commands::quote::QuoteArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "ch-cli")]
#[command(author, version, about = "Clubhouse command-line client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Price an event registration offline
    Quote(QuoteArgs),
    /// Sign in and persist the session
    Login {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Account type (`member`, `admin`, `system_owner`)
        #[arg(short = 't', long, default_value = "member")]
        user_type: String,

        /// Name this device appears under in `sessions list`
        #[arg(short, long, default_value = "ch-cli")]
        device: String,
    },
    /// Sign out and forget the session
    Logout,
    /// Manage signed-in devices
    Sessions {
        #[command(subcommand)]
        action: SessionAction,
    },
    /// Browse clubs
    Clubs {
        #[command(subcommand)]
        action: ClubAction,
    },
    /// List a club's membership plans
    Plans {
        /// Club ID
        club: String,
    },
    /// Validate a coupon code
    Coupon {
        code: String,

        /// Club ID
        #[arg(short, long)]
        club: String,

        /// Order amount the coupon applies to
        #[arg(short, long)]
        amount: Decimal,
    },
    /// Loyalty points
    Points {
        #[command(subcommand)]
        action: PointsAction,
    },
    /// Quote delivery to a PIN code
    Shipping {
        /// Delivery PIN code
        postcode: String,

        /// Number of items in the parcel
        #[arg(short, long, default_value_t = 1)]
        items: u32,

        /// Declared value of the parcel
        #[arg(short, long, default_value_t = Decimal::ZERO)]
        value: Decimal,

        /// Cash on delivery
        #[arg(long)]
        cod: bool,
    },
    /// Buy something
    Checkout {
        #[command(subcommand)]
        target: CheckoutTarget,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// List devices signed in to this account
    List,
    /// Sign a device out
    Revoke {
        /// Session ID from `sessions list`
        id: String,
    },
}

#[derive(Subcommand)]
enum ClubAction {
    /// List clubs
    List,
}

#[derive(Subcommand)]
enum PointsAction {
    /// Show your points balance in a club
    Balance {
        /// Club ID
        #[arg(short, long)]
        club: String,
    },
}

#[derive(Subcommand)]
enum CheckoutTarget {
    /// Register for an event
    Event(commands::checkout::EventCheckoutArgs),
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry() -> Option<sentry::ClientInitGuard> {
    let dsn = std::env::var("SENTRY_DSN").ok().filter(|d| !d.is_empty())?;

    let guard = sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Warnings and errors become Sentry events; info and debug become breadcrumbs.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    // Load .env before reading SENTRY_DSN
    let _ = dotenvy::dotenv();
    let _sentry_guard = init_sentry();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "clubhouse_cli=info,clubhouse_client=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::debug!(error = %e, "Command failed");
        #[allow(clippy::print_stderr)]
        {
            eprintln!("Error: {}", e.user_message());
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Quote(args) => commands::quote::run(&args)?,
        Commands::Login {
            email,
            user_type,
            device,
        } => commands::account::login(&email, &user_type, &device).await?,
        Commands::Logout => commands::account::logout().await?,
        Commands::Sessions { action } => match action {
            SessionAction::List => commands::account::list_sessions().await?,
            SessionAction::Revoke { id } => commands::account::revoke_session(&id).await?,
        },
        Commands::Clubs { action } => match action {
            ClubAction::List => commands::clubs::list().await?,
        },
        Commands::Plans { club } => commands::clubs::plans(&club).await?,
        Commands::Coupon { code, club, amount } => {
            commands::clubs::coupon(&code, &club, amount).await?;
        }
        Commands::Points { action } => match action {
            PointsAction::Balance { club } => commands::clubs::points_balance(&club).await?,
        },
        Commands::Shipping {
            postcode,
            items,
            value,
            cod,
        } => commands::shipping::quote(&postcode, items, value, cod).await?,
        Commands::Checkout { target } => match target {
            CheckoutTarget::Event(args) => commands::checkout::event(args).await?,
        },
    }
    Ok(())
}
