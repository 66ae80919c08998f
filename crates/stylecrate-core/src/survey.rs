//! Style survey: multiple-choice questions and the score derived from them.
//!
//! Each answer is stored under `q<question id>`. The style score is the
//! choice value picked most often; ties go to the smallest value.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::session::StyleRef;

/// Questionnaire shipped with the crate.
const BUNDLED_SURVEY: &str = include_str!("survey.toml");

/// One selectable answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub value: u32,
    pub label: String,
    #[serde(default)]
    pub image: Option<String>,
}

/// A multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: u32,
    pub title: String,
    pub choices: Vec<Choice>,
}

impl Question {
    /// Key under which this question's answer is stored.
    pub fn selection_key(&self) -> String {
        selection_key(self.id)
    }

    pub fn choice(&self, value: u32) -> Option<&Choice> {
        self.choices.iter().find(|c| c.value == value)
    }
}

fn selection_key(question_id: u32) -> String {
    format!("q{question_id}")
}

/// An ordered list of questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Survey {
    pub questions: Vec<Question>,
}

impl Survey {
    /// The questionnaire embedded at compile time.
    pub fn bundled() -> Result<Self> {
        Self::from_toml(BUNDLED_SURVEY).context("Failed to load bundled survey")
    }

    /// Loads a questionnaire from a TOML file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read survey from {}", path.display()))?;
        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse survey from {}", path.display()))
    }

    /// Parses and validates a questionnaire.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let survey: Survey = toml::from_str(contents)?;
        survey.validate()?;
        Ok(survey)
    }

    pub fn question(&self, id: u32) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    fn validate(&self) -> Result<()> {
        if self.questions.is_empty() {
            bail!("Survey has no questions");
        }

        let mut ids = HashSet::new();
        for question in &self.questions {
            if !ids.insert(question.id) {
                bail!("Duplicate question id {}", question.id);
            }
            if question.choices.is_empty() {
                bail!("Question {} has no choices", question.id);
            }
            let mut values = HashSet::new();
            for choice in &question.choices {
                if !values.insert(choice.value) {
                    bail!(
                        "Question {} has duplicate choice value {}",
                        question.id,
                        choice.value
                    );
                }
            }
        }

        Ok(())
    }
}

/// Answers given so far, keyed by `q<question id>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveySelections {
    answers: BTreeMap<String, u32>,
}

impl SurveySelections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `choice` for `question`, replacing any previous answer.
    ///
    /// Fails when `choice` is not one of the question's values.
    pub fn save_selection(&mut self, question: &Question, choice: u32) -> Result<()> {
        if question.choice(choice).is_none() {
            bail!(
                "Choice {choice} is not an option for question {} ({})",
                question.id,
                question.title
            );
        }
        self.answers.insert(question.selection_key(), choice);
        Ok(())
    }

    /// Applies an answer written as `q<ID>=<VALUE>` (the `q` is optional).
    pub fn apply_answer(&mut self, survey: &Survey, answer: &str) -> Result<()> {
        let (question_id, choice) = parse_answer(answer)?;
        let question = survey
            .question(question_id)
            .with_context(|| format!("Unknown question {question_id} in answer '{answer}'"))?;
        self.save_selection(question, choice)
    }

    pub fn answer(&self, question_id: u32) -> Option<u32> {
        self.answers.get(&selection_key(question_id)).copied()
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    /// True when every question of `survey` has an answer.
    pub fn is_complete(&self, survey: &Survey) -> bool {
        survey
            .questions
            .iter()
            .all(|q| self.answers.contains_key(&q.selection_key()))
    }

    /// Style reference derived from the answers.
    ///
    /// The most frequently chosen value wins; ties go to the smallest value.
    /// Always an integer reference.
    pub fn style_score(&self) -> Option<StyleRef> {
        let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
        for value in self.answers.values() {
            *counts.entry(*value).or_default() += 1;
        }

        let mut best: Option<(u32, usize)> = None;
        for (value, count) in counts {
            if best.is_none_or(|(_, best_count)| count > best_count) {
                best = Some((value, count));
            }
        }
        best.map(|(value, _)| StyleRef::from(value))
    }
}

/// Parses `q<ID>=<VALUE>` into `(question id, choice value)`.
fn parse_answer(answer: &str) -> Result<(u32, u32)> {
    let Some((question, choice)) = answer.split_once('=') else {
        bail!("Invalid answer '{answer}'. Expected q<ID>=<VALUE>");
    };
    let question = question.trim();
    let question = question.strip_prefix('q').unwrap_or(question);

    let question_id = question
        .parse::<u32>()
        .with_context(|| format!("Invalid question id in answer '{answer}'"))?;
    let choice = choice
        .trim()
        .parse::<u32>()
        .with_context(|| format!("Invalid choice value in answer '{answer}'"))?;
    Ok((question_id, choice))
}
