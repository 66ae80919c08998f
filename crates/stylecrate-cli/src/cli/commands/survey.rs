//! Style survey command handler.

use anyhow::{Context, Result, bail};
use stylecrate_core::config::Config;
use stylecrate_core::survey::{Survey, SurveySelections};

use super::Session;
use super::profile::print_style;

pub async fn run(config: &Config, answers: &[String]) -> Result<()> {
    let survey = Survey::bundled()?;

    if answers.is_empty() {
        print_questions(&survey);
        return Ok(());
    }

    let mut selections = SurveySelections::new();
    for answer in answers {
        selections.apply_answer(&survey, answer)?;
    }
    if !selections.is_complete(&survey) {
        bail!(
            "Answer every question ({} of {} answered)",
            selections.len(),
            survey.questions.len()
        );
    }
    let score = selections
        .style_score()
        .context("No style reference could be derived")?;

    let session = Session::open(config)?;
    let (credentials, details) = session.require_login()?;

    match session
        .gateway
        .update_user(&details, score.clone(), Some(credentials))
        .await
    {
        Ok(updated) => {
            session
                .gateway
                .save_user(&updated)
                .context("save updated profile")?;
            println!("✓ Style reference set to {score}");
        }
        Err(e) => {
            eprintln!("Warning: style reference not saved on the server: {e}");
            println!("Style reference {score} kept locally for this run only.");
        }
    }

    // The store already holds the optimistic profile.
    let details = session.store.snapshot().details.unwrap_or_default();
    if let Some(style) = session
        .gateway
        .fetch_style(&details, Some(credentials))
        .await?
    {
        print_style(&style);
    }
    Ok(())
}

fn print_questions(survey: &Survey) {
    for question in &survey.questions {
        println!("q{}. {}", question.id, question.title);
        for choice in &question.choices {
            println!("    {}) {}", choice.value, choice.label);
        }
    }
    println!();
    println!("Answer with: stylecrate survey --answer q1=<VALUE> --answer q2=<VALUE> ...");
}
