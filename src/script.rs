use std::io;
use std::path::Path;

use log::*;
use serde::Deserialize;

use crate::errors::ScriptError;

/// Separates option labels inside the `options` column of a script table.
pub const OPTION_SEPARATOR: char = '|';

/// One node of a conversation script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Bot line shown when the step becomes current. May contain `{key}`
    /// placeholders on the confirmation step.
    pub prompt: Option<String>,
    /// Second bot line shown a moment after `prompt`.
    pub follow_up: Option<String>,
    /// When present, the step expects one of these labels instead of free text.
    pub options: Option<Vec<String>>,
    /// Where the answer to this step is stored. Only the confirmation step
    /// goes without one.
    pub key: Option<String>,
    /// Whether the user may skip this step without answering.
    pub optional: bool,
    pub confirmation: bool,
}

impl Step {
    /// A step that waits for free text.
    pub fn text(key: &str, prompt: &str) -> Self {
        Self {
            prompt: Some(prompt.to_string()),
            follow_up: None,
            options: None,
            key: Some(key.to_string()),
            optional: false,
            confirmation: false,
        }
    }

    /// A step that waits for one of a fixed set of labels.
    pub fn choice(key: &str, prompt: &str, options: &[&str]) -> Self {
        Self {
            options: Some(options.iter().map(|option| option.to_string()).collect()),
            ..Self::text(key, prompt)
        }
    }

    /// The terminal step. `prompt` is a template filled from the answers.
    pub fn confirmation(prompt: &str) -> Self {
        Self {
            prompt: Some(prompt.to_string()),
            follow_up: None,
            options: None,
            key: None,
            optional: false,
            confirmation: true,
        }
    }

    pub fn with_follow_up(mut self, follow_up: &str) -> Self {
        self.follow_up = Some(follow_up.to_string());
        self
    }

    pub fn skippable(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn expects_choice(&self) -> bool {
        self.options.is_some()
    }

    pub fn offers(&self, choice: &str) -> bool {
        self.options
            .as_ref()
            .map_or(false, |options| options.iter().any(|option| option == choice))
    }
}

/// A row of a script table, as read from CSV.
///
/// On the confirmation row, `options` holds the informational notes shown
/// after the confirmation line and `follow_up` holds the closing message.
#[derive(Debug, Deserialize)]
pub struct StepRecord {
    pub key: Option<String>,
    pub prompt: Option<String>,
    pub follow_up: Option<String>,
    pub options: Option<String>,
    pub optional: Option<bool>,
    pub confirmation: Option<bool>,
}

/// An immutable, validated conversation script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    steps: Vec<Step>,
    notes: Vec<String>,
    closing: String,
}

impl Script {
    /// Builds a script, checking that it ends in exactly one confirmation
    /// step and that every other step has a key.
    pub fn new(steps: Vec<Step>, notes: Vec<String>, closing: String) -> Result<Self, ScriptError> {
        validate(&steps)?;

        Ok(Self {
            steps,
            notes,
            closing,
        })
    }

    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self, ScriptError> {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)?;
        Self::from_records(reader)
    }

    pub fn from_csv_reader<R: io::Read>(reader: R) -> Result<Self, ScriptError> {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        Self::from_records(reader)
    }

    fn from_records<R: io::Read>(mut reader: csv::Reader<R>) -> Result<Self, ScriptError> {
        let mut steps = Vec::new();
        let mut notes = Vec::new();
        let mut closing = String::new();

        for record in reader.deserialize() {
            let record: StepRecord = record?;

            let options = record.options.as_deref().map(split_options);

            if record.confirmation.unwrap_or(false) {
                notes = options.unwrap_or_default();
                closing = record.follow_up.unwrap_or_default();
                steps.push(Step {
                    prompt: record.prompt,
                    follow_up: None,
                    options: None,
                    key: record.key,
                    optional: false,
                    confirmation: true,
                });
            } else {
                steps.push(Step {
                    prompt: record.prompt,
                    follow_up: record.follow_up,
                    options,
                    key: record.key,
                    optional: record.optional.unwrap_or(false),
                    confirmation: false,
                });
            }
        }

        debug!("Loaded script with {} steps", steps.len());

        Self::new(steps, notes, closing)
    }

    /// The lead-collection flow for the land registration landing page.
    pub fn land_registration() -> Self {
        let steps = vec![
            Step::text(
                "name",
                "Hello! I'm your Land Registration Assistant. I'll help you connect with a verified agent near your area to solve any issue related to land registration.",
            )
            .with_follow_up("May I know your full name to get started?"),
            Step::text(
                "phone",
                "Can you share your phone number so our team can call you for assistance?",
            ),
            Step::text(
                "email",
                "Would you like to provide your email ID for updates and status tracking? (optional)",
            )
            .skippable(),
            Step::text(
                "location",
                "To find an agent near you, please provide your location details.",
            ),
            Step::choice(
                "service",
                "Please tell me what kind of support you need.",
                &[
                    "Land Registration Assistance",
                    "Patta / Chitta Help",
                    "EC & Document Verification",
                    "Buying / Selling Land Support",
                    "Survey / Subdivision Help",
                    "Other Issue",
                ],
            ),
            Step::text("problem", "Could you briefly explain what problem you're facing?"),
            Step::choice(
                "callTime",
                "When would you prefer our team to call you for further discussion?",
                &[
                    "Morning (9 AM – 12 PM)",
                    "Afternoon (12 PM – 4 PM)",
                    "Evening (4 PM – 8 PM)",
                ],
            ),
            Step::confirmation("Thank you, {name}! Here's what we'll do next:"),
        ];

        let notes = vec![
            "Our team will review your request.".to_string(),
            "You'll receive a call soon from our representative.".to_string(),
            "A verified agent from your area will be assigned to solve your issue.".to_string(),
        ];

        let closing = "You'll also get updates on WhatsApp or email. Thank you for contacting us — we'll make your land registration easy and stress-free!".to_string();

        Self {
            steps,
            notes,
            closing,
        }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn step(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always false for a validated script.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Fixed lines shown after the confirmation line.
    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    /// The last bot line, shown when the conversation completes.
    pub fn closing(&self) -> &str {
        &self.closing
    }
}

fn split_options(options: &str) -> Vec<String> {
    options
        .split(OPTION_SEPARATOR)
        .map(str::trim)
        .filter(|option| !option.is_empty())
        .map(String::from)
        .collect()
}

fn validate(steps: &[Step]) -> Result<(), ScriptError> {
    let last = match steps.len() {
        0 => return Err(ScriptError::Empty),
        len => len - 1,
    };

    for (i, step) in steps.iter().enumerate() {
        if step.confirmation {
            if i != last {
                return Err(ScriptError::MisplacedConfirmation(i));
            }
            if step.prompt.is_none() {
                return Err("confirmation step has no prompt".into());
            }
            continue;
        }

        if step.key.as_deref().map_or(true, str::is_empty) {
            return Err(ScriptError::MissingKey(i));
        }

        if let Some(options) = &step.options {
            if options.is_empty() {
                return Err(ScriptError::EmptyOptions(i));
            }
        }
    }

    if !steps[last].confirmation {
        return Err(ScriptError::MissingConfirmation);
    }

    Ok(())
}
