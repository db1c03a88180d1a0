use std::time::Duration;

use crate::{Instruction, Presenter, Timer};

/// A `Presenter` that keeps everything it's given, for hosts that poll
/// for output and for tests.
#[derive(Debug, Default)]
pub struct Transcript {
    instructions: Vec<Instruction>,
    timers: Vec<(Duration, Timer)>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn take_instructions(&mut self) -> Vec<Instruction> {
        std::mem::take(&mut self.instructions)
    }

    /// Pending timers, in the order they were scheduled.
    pub fn timers(&self) -> &[(Duration, Timer)] {
        &self.timers
    }

    /// Removes all pending timers, shortest delay first.
    pub fn take_timers(&mut self) -> Vec<Timer> {
        let mut timers = std::mem::take(&mut self.timers);
        timers.sort_by_key(|(delay, _)| *delay);
        timers.into_iter()
            .map(|(_, timer)| timer)
            .collect()
    }

    /// Text of every bot line recorded so far.
    pub fn bot_messages(&self) -> Vec<&str> {
        self.instructions.iter()
            .filter_map(|instruction| match instruction {
                Instruction::ShowBotMessage(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Presenter for Transcript {
    fn present(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    fn schedule(&mut self, delay: Duration, timer: Timer) {
        self.timers.push((delay, timer));
    }
}
