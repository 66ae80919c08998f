//! Auth command handlers.

use anyhow::{Result, bail};
use stylecrate_core::config::{Config, paths};
use stylecrate_core::gateway::Signup;
use stylecrate_core::storage::mask_token;

use super::{Session, read_password};

pub async fn login(config: &Config, email: &str, password: Option<String>) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => read_password()?,
    };

    let session = Session::new(config)?;
    let Some(credentials) = session.gateway.login(email, &password).await? else {
        bail!("Login failed: the server returned no token");
    };

    let state = session.store.snapshot();
    let who = state
        .details
        .as_ref()
        .and_then(|d| d.name.clone().or_else(|| d.email.clone()))
        .unwrap_or_else(|| email.to_string());

    println!(
        "✓ Logged in as {who} (token: {})",
        mask_token(credentials.token())
    );
    println!(
        "  Credentials saved to: {}",
        paths::storage_path().display()
    );
    Ok(())
}

pub fn logout(config: &Config) -> Result<()> {
    let session = Session::new(config)?;
    let had_creds = session.gateway.logout()?;

    if had_creds {
        println!("✓ Logged out");
        println!(
            "  Credentials removed from: {}",
            paths::storage_path().display()
        );
    } else {
        println!("Not logged in (no credentials found).");
    }
    Ok(())
}

pub async fn register(
    config: &Config,
    name: String,
    email: String,
    password: Option<String>,
) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => read_password()?,
    };

    let session = Session::new(config)?;
    let user = session
        .gateway
        .register(&Signup {
            name,
            email,
            password,
        })
        .await?;

    println!(
        "✓ Registered {} <{}> (id {})",
        user.name.as_deref().unwrap_or("-"),
        user.email.as_deref().unwrap_or("-"),
        user.id
    );
    println!("  Log in with: stylecrate login --email <EMAIL>");
    Ok(())
}
