use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use log::*;

pub use crate::{
    errors::ScriptError,
    script::{Script, Step, StepRecord, OPTION_SEPARATOR},
    template::fill_placeholders,
    transcript::Transcript,
};

mod errors;
mod script;
mod template;
mod transcript;

// Shared by every conversation, so a timer never matches another instance.
static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

fn next_generation() -> u64 {
    NEXT_GENERATION.fetch_add(1, Ordering::Relaxed)
}

/// Something the presentation layer should draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    ShowBotMessage(String),
    ShowUserMessage(String),
    /// A set of buttons. Exactly one label comes back via `select_option`.
    ShowOptions(Vec<String>),
    /// The last option set is stale and should be removed.
    ClearOptions,
    /// The current step may be skipped; offer a way to call `skip`.
    OfferSkip,
    DisableInput,
    PlayCompletionEffect(u32),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TimerKind {
    /// Show the follow-up line of the given step.
    FollowUp(usize),
    /// Finish the conversation after the confirmation lines.
    Completion,
}

/// A delayed callback handed to the presenter. Pass it back to
/// `Conversation::fire` once the delay has elapsed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Timer {
    generation: u64,
    kind: TimerKind,
}

impl Timer {
    pub fn kind(&self) -> TimerKind {
        self.kind
    }
}

/// The output side of a conversation: draws instructions and runs timers.
pub trait Presenter {
    fn present(&mut self, instruction: Instruction);

    fn schedule(&mut self, delay: Duration, timer: Timer);
}

impl<P: Presenter + ?Sized> Presenter for &mut P {
    fn present(&mut self, instruction: Instruction) {
        (**self).present(instruction)
    }

    fn schedule(&mut self, delay: Duration, timer: Timer) {
        (**self).schedule(delay, timer)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConversationPhase {
    Idle,
    AwaitingAnswer(usize),
    Confirming,
    Completed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationState {
    pub cursor: usize,
    pub answers: HashMap<String, String>,
    pub completed: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Pause between a step's prompt and its follow-up line.
    pub follow_up_delay: Duration,
    /// Pause between the confirmation lines and completion.
    pub completion_delay: Duration,
    pub particle_count: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            follow_up_delay: Duration::from_millis(1000),
            completion_delay: Duration::from_millis(3000),
            particle_count: 100,
        }
    }
}

/// Walks a user through a `Script`, one step at a time.
pub struct Conversation<P: Presenter> {
    script: Script,
    config: EngineConfig,

    state: ConversationState,
    phase: ConversationPhase,
    // Renewed on every start and close, so timers from an earlier run are dropped.
    generation: u64,

    presenter: P,
}

impl<P: Presenter> Conversation<P> {
    pub fn new(script: Script, presenter: P) -> Self {
        Self::with_config(script, EngineConfig::default(), presenter)
    }

    pub fn with_config(script: Script, config: EngineConfig, presenter: P) -> Self {
        Self {
            script,
            config,
            state: ConversationState::default(),
            phase: ConversationPhase::Idle,
            generation: next_generation(),
            presenter,
        }
    }

    /// Begins the conversation from the first step, discarding any
    /// previous answers and pending timers.
    pub fn start(&mut self) {
        self.generation = next_generation();
        self.state = ConversationState::default();

        debug!("Starting conversation (generation {})", self.generation);

        self.enter_step(0);
    }

    /// Discards the conversation, as when the chat panel is closed.
    pub fn close(&mut self) {
        self.generation = next_generation();
        self.state = ConversationState::default();
        self.phase = ConversationPhase::Idle;

        debug!("Closed conversation");
    }

    /// Answers the current free-text step. Blank input is ignored.
    pub fn submit_text(&mut self, raw: &str) {
        let step = match self.awaited_step() {
            Some(step) => step,
            None => {
                debug!("Ignoring text, not waiting on an answer");
                return;
            }
        };

        if step.expects_choice() {
            debug!("Ignoring text, step {} expects an option", self.state.cursor);
            return;
        }

        let text = raw.trim();
        if text.is_empty() {
            debug!("Ignoring empty text");
            return;
        }

        let key = step.key.clone();

        self.present(Instruction::ShowUserMessage(text.to_string()));
        self.record(key, text);
        self.advance();
    }

    /// Answers the current choice step. Labels the step doesn't offer are
    /// ignored.
    pub fn select_option(&mut self, choice: &str) {
        let step = match self.awaited_step() {
            Some(step) => step,
            None => {
                debug!("Ignoring option, not waiting on an answer");
                return;
            }
        };

        if !step.offers(choice) {
            debug!("Ignoring unknown option {:?} at step {}", choice, self.state.cursor);
            return;
        }

        let key = step.key.clone();

        self.present(Instruction::ShowUserMessage(choice.to_string()));
        self.record(key, choice);
        self.present(Instruction::ClearOptions);
        self.advance();
    }

    /// Moves past the current step without recording an answer. Only
    /// optional steps can be skipped.
    pub fn skip(&mut self) {
        let step = match self.awaited_step() {
            Some(step) => step,
            None => {
                debug!("Ignoring skip, not waiting on an answer");
                return;
            }
        };

        if !step.optional {
            debug!("Ignoring skip, step {} is required", self.state.cursor);
            return;
        }

        if step.expects_choice() {
            self.present(Instruction::ClearOptions);
        }

        debug!("Skipped step {}", self.state.cursor);
        self.advance();
    }

    /// Runs a timer previously handed to the presenter. Timers from an
    /// earlier run of the conversation do nothing.
    pub fn fire(&mut self, timer: Timer) {
        if timer.generation != self.generation || self.phase == ConversationPhase::Idle {
            debug!("Dropping stale timer {:?}", timer.kind);
            return;
        }

        match timer.kind {
            TimerKind::FollowUp(index) => {
                // Only while the step is still waiting on its answer.
                if self.phase != ConversationPhase::AwaitingAnswer(index) {
                    debug!("Dropping follow-up for answered step {}", index);
                    return;
                }
                let follow_up = self.script.step(index)
                    .and_then(|step| step.follow_up.clone());
                if let Some(follow_up) = follow_up {
                    self.present(Instruction::ShowBotMessage(follow_up));
                }
            }
            TimerKind::Completion => self.complete(),
        }
    }

    pub fn phase(&self) -> ConversationPhase {
        self.phase
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn answers(&self) -> &HashMap<String, String> {
        &self.state.answers
    }

    pub fn answer(&self, key: &str) -> Option<&str> {
        self.state.answers.get(key).map(String::as_str)
    }

    pub fn is_completed(&self) -> bool {
        self.state.completed
    }

    /// The step waiting for an answer, if any.
    pub fn current_step(&self) -> Option<&Step> {
        match self.phase {
            ConversationPhase::AwaitingAnswer(index) => self.script.step(index),
            _ => None,
        }
    }

    pub fn script(&self) -> &Script {
        &self.script
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    fn awaited_step(&self) -> Option<Step> {
        self.current_step().cloned()
    }

    fn record(&mut self, key: Option<String>, value: &str) {
        if let Some(key) = key {
            debug!("Recorded {}", key);
            self.state.answers.insert(key, value.to_string());
        }
    }

    fn advance(&mut self) {
        self.state.cursor += 1;
        self.enter_step(self.state.cursor);
    }

    fn enter_step(&mut self, index: usize) {
        let step = match self.script.step(index) {
            Some(step) => step.clone(),
            None => {
                // Unreachable for a validated script, which always ends in a
                // confirmation step.
                warn!("Ran past the end of the script at step {}", index);
                self.complete();
                return;
            }
        };

        if step.confirmation {
            self.render_confirmation(&step);
            return;
        }

        self.phase = ConversationPhase::AwaitingAnswer(index);

        if let Some(prompt) = step.prompt {
            self.present(Instruction::ShowBotMessage(prompt));
        }

        if step.follow_up.is_some() {
            self.schedule(self.config.follow_up_delay, TimerKind::FollowUp(index));
        }

        if step.optional {
            self.present(Instruction::OfferSkip);
        }

        if let Some(options) = step.options {
            self.present(Instruction::ShowOptions(options));
        }
    }

    fn render_confirmation(&mut self, step: &Step) {
        self.phase = ConversationPhase::Confirming;

        let template = step.prompt.as_deref().unwrap_or_default();
        let message = fill_placeholders(template, &self.state.answers);
        self.present(Instruction::ShowBotMessage(message));

        for note in self.script.notes().to_vec() {
            self.present(Instruction::ShowBotMessage(note));
        }

        self.schedule(self.config.completion_delay, TimerKind::Completion);
    }

    fn complete(&mut self) {
        if self.state.completed {
            return;
        }

        self.state.completed = true;
        self.phase = ConversationPhase::Completed;

        let closing = self.script.closing().to_string();
        if !closing.is_empty() {
            self.present(Instruction::ShowBotMessage(closing));
        }

        self.present(Instruction::DisableInput);
        self.present(Instruction::PlayCompletionEffect(self.config.particle_count));

        debug!("Conversation complete");
    }

    fn present(&mut self, instruction: Instruction) {
        trace!("Presenting {:?}", instruction);
        self.presenter.present(instruction);
    }

    fn schedule(&mut self, delay: Duration, kind: TimerKind) {
        let timer = Timer {
            generation: self.generation,
            kind,
        };
        trace!("Scheduling {:?} in {:?}", kind, delay);
        self.presenter.schedule(delay, timer);
    }
}
