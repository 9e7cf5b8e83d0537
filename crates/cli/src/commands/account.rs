//! Sign-in and device session commands.
//!
//! # Environment Variables
//!
//! - `CLUBHOUSE_PASSWORD` - Password for `login`; prompted for when unset

use clubhouse_core::{SessionId, UserType};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::connect;
use crate::error::CliError;

/// Sign in and persist the session.
pub async fn login(email: &str, user_type: &str, device: &str) -> Result<(), CliError> {
    let user_type: UserType = user_type.parse().map_err(|_| {
        CliError::Input(format!(
            "Unknown account type `{user_type}`. Use member, admin or system_owner."
        ))
    })?;

    let ctx = connect().await?;
    let password = match std::env::var("CLUBHOUSE_PASSWORD") {
        Ok(password) if !password.is_empty() => password,
        _ => prompt_password().await?,
    };

    let account = ctx.api.login(email, &password, user_type, device).await?;

    #[allow(clippy::print_stdout)]
    {
        println!("Signed in as {} ({})", account.name, account.user_type);
    }
    Ok(())
}

async fn prompt_password() -> Result<String, CliError> {
    #[allow(clippy::print_stdout)]
    {
        println!("Password:");
    }
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    lines
        .next_line()
        .await?
        .map(|line| line.trim_end().to_string())
        .filter(|line| !line.is_empty())
        .ok_or_else(|| CliError::Input("A password is required.".to_string()))
}

/// Sign out and remove the persisted session.
pub async fn logout() -> Result<(), CliError> {
    let ctx = connect().await?;
    if ctx.api.auth().current().await.is_none() {
        #[allow(clippy::print_stdout)]
        {
            println!("Not signed in.");
        }
        return Ok(());
    }

    ctx.api.logout().await?;
    #[allow(clippy::print_stdout)]
    {
        println!("Signed out.");
    }
    Ok(())
}

/// Print the devices signed in to this account.
pub async fn list_sessions() -> Result<(), CliError> {
    let ctx = connect().await?;
    ctx.api
        .auth()
        .require_role(&[UserType::Member, UserType::Admin, UserType::SystemOwner])
        .await?;

    let sessions = ctx.api.list_sessions().await?;

    #[allow(clippy::print_stdout)]
    {
        if sessions.is_empty() {
            println!("No active sessions.");
        }
        for session in sessions {
            let marker = if session.current { "*" } else { " " };
            println!(
                "{marker} {:<38} {:<20} {:<16} {}",
                session.id,
                session.device_name,
                session.ip_address.as_deref().unwrap_or("-"),
                session.last_active_at.format("%Y-%m-%d %H:%M UTC"),
            );
        }
    }
    Ok(())
}

/// Sign a device out remotely.
pub async fn revoke_session(id: &str) -> Result<(), CliError> {
    let ctx = connect().await?;
    ctx.api
        .auth()
        .require_role(&[UserType::Member, UserType::Admin, UserType::SystemOwner])
        .await?;

    ctx.api.revoke_session(&SessionId::new(id)).await?;

    #[allow(clippy::print_stdout)]
    {
        println!("Session {id} revoked.");
    }
    Ok(())
}
