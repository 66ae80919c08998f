//! Profile command handlers.

use anyhow::Result;
use stylecrate_core::config::Config;
use stylecrate_core::session::Style;
use stylecrate_core::storage::mask_token;

use super::Session;

pub fn whoami(config: &Config) -> Result<()> {
    let session = Session::open(config)?;
    let Some(credentials) = &session.credentials else {
        println!("Not logged in.");
        return Ok(());
    };

    let details = session.store.snapshot().details.unwrap_or_default();
    let field = |value: Option<&str>| value.unwrap_or("-").to_string();
    println!("Name:            {}", field(details.name.as_deref()));
    println!("Email:           {}", field(details.email.as_deref()));
    println!("Role:            {}", field(details.role.as_deref()));
    let reference = details.style_survey.as_ref().map(ToString::to_string);
    println!("Style reference: {}", field(reference.as_deref()));
    println!("Token:           {}", mask_token(credentials.token()));
    Ok(())
}

pub async fn style(config: &Config) -> Result<()> {
    let session = Session::open(config)?;
    let (credentials, details) = session.require_login()?;

    let Some(reference) = details.style_survey.clone() else {
        println!("No style reference yet. Take the survey: stylecrate survey");
        return Ok(());
    };

    match session
        .gateway
        .fetch_style(&details, Some(credentials))
        .await?
    {
        Some(style) => print_style(&style),
        None => println!("No style found for reference {reference}."),
    }
    Ok(())
}

pub async fn genders(config: &Config) -> Result<()> {
    let session = Session::open(config)?;
    let genders = session
        .gateway
        .fetch_genders(session.credentials.as_ref())
        .await?;

    if genders.is_empty() {
        println!("No genders found.");
    }
    for gender in genders {
        println!("{}\t{}", gender.id, gender.name);
    }
    Ok(())
}

pub(super) fn print_style(style: &Style) {
    println!(
        "Style {}: {}",
        style.id,
        style.description.as_deref().unwrap_or("(no description)")
    );
    if let Some(image_url) = &style.image_url {
        println!("  Image: {image_url}");
    }
}
