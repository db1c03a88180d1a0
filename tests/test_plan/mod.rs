use std::collections::VecDeque;
use std::error::Error;
use std::fs;
use std::io;
use std::path::Path;

use leadflow::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanStep {
    // Expectations, checked against what the conversation presents.
    Bot(String),
    User(String),
    Options(Vec<String>),
    Clear,
    OfferSkip,
    Disable,
    Effect(u32),
    // Actions, sent to the conversation.
    Say(String),
    Select(usize),
    Skip,
    Wait,
    Stop,
}

impl PlanStep {
    fn new(line: &str) -> Self {
        let mut split_line = line.splitn(2, ':');
        let name = split_line.next().map(str::trim);
        let value = split_line.next()
            .map(|value| value.strip_prefix(' ').unwrap_or(value).to_owned());
        match (name, value) {
            (Some("bot"), Some(text)) => Self::Bot(text),
            (Some("user"), Some(text)) => Self::User(text),
            (Some("option"), Some(text)) => Self::Options(vec![text]),
            (Some("clear"), None) => Self::Clear,
            (Some("offer-skip"), None) => Self::OfferSkip,
            (Some("disable"), None) => Self::Disable,
            (Some("effect"), Some(count)) => Self::Effect(count.trim().parse().unwrap()),
            (Some("say"), Some(text)) => Self::Say(text),
            (Some("select"), Some(index)) => {
                let index: usize = index.trim().parse().unwrap();
                if index < 1 {
                    panic!("Select index must be 1 or greater.");
                }
                Self::Select(index - 1)
            }
            (Some("skip"), None) => Self::Skip,
            (Some("wait"), None) => Self::Wait,
            (Some("stop"), None) => Self::Stop,
            (Some(step), _) => panic!(
                "Could not parse test plan step \"{}\" in line \"{}\"",
                step, line
            ),
            (None, _) => panic!("Could not parse test plan step in line \"{}\"", line),
        }
    }

    fn expected_instruction(&self) -> Option<Instruction> {
        let instruction = match self {
            Self::Bot(text) => Instruction::ShowBotMessage(text.clone()),
            Self::User(text) => Instruction::ShowUserMessage(text.clone()),
            Self::Options(options) => Instruction::ShowOptions(options.clone()),
            Self::Clear => Instruction::ClearOptions,
            Self::OfferSkip => Instruction::OfferSkip,
            Self::Disable => Instruction::DisableInput,
            Self::Effect(count) => Instruction::PlayCompletionEffect(*count),
            _ => return None,
        };
        Some(instruction)
    }
}

pub fn load_plan(plan_path: &Path) -> io::Result<Vec<PlanStep>> {
    let plan_text = fs::read_to_string(plan_path)?;

    let mut steps: Vec<PlanStep> = Vec::new();
    for line in plan_text
        .lines()
        .map(|line| line.trim_start())
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
    {
        let step = PlanStep::new(line);

        // Consecutive option lines describe a single option set.
        if let (Some(PlanStep::Options(options)), PlanStep::Options(next)) =
            (steps.last_mut(), &step)
        {
            options.extend(next.iter().cloned());
            continue;
        }

        steps.push(step);
    }

    Ok(steps)
}

pub struct PlanRunner {
    conversation: Conversation<Transcript>,
    plan: Vec<PlanStep>,
    pending: VecDeque<Instruction>,
    options: Vec<String>,
}

impl PlanRunner {
    pub fn new(plan_path: &str) -> Self {
        let _ = pretty_env_logger::try_init();

        let plan_path = Path::new(plan_path);

        let script = Script::from_csv_path(plan_path.with_extension("csv")).unwrap();
        let plan = load_plan(plan_path).unwrap();

        Self {
            conversation: Conversation::new(script, Transcript::new()),
            plan,
            pending: VecDeque::new(),
            options: Vec::new(),
        }
    }

    pub fn conversation(&self) -> &Conversation<Transcript> {
        &self.conversation
    }

    pub fn run(&mut self) -> Result<(), Box<dyn Error>> {
        self.conversation.start();

        for (i, step) in self.plan.clone().into_iter().enumerate() {
            let presented = self.conversation.presenter_mut().take_instructions();
            self.pending.extend(presented);

            if let Some(expected) = step.expected_instruction() {
                // Assert that the test plan expects this instruction.
                let actual = self.pending.pop_front();
                assert_eq!(
                    actual.as_ref(),
                    Some(&expected),
                    "[{}] Expected {:?}, got {:?}",
                    i + 1,
                    expected,
                    actual
                );
                if let PlanStep::Options(options) = step {
                    self.options = options;
                }
                continue;
            }

            match step {
                PlanStep::Say(text) => self.conversation.submit_text(&text),
                PlanStep::Select(index) => {
                    let choice = self.options.get(index)
                        .cloned()
                        .ok_or_else(|| format!("[{}] No option {} to select", i + 1, index + 1))?;
                    self.conversation.select_option(&choice);
                }
                PlanStep::Skip => self.conversation.skip(),
                PlanStep::Wait => {
                    for timer in self.conversation.presenter_mut().take_timers() {
                        self.conversation.fire(timer);
                    }
                }
                PlanStep::Stop => {
                    assert!(
                        self.pending.is_empty(),
                        "[{}] Expected the end of the conversation, got {:?}",
                        i + 1,
                        self.pending
                    );
                    assert!(self.conversation.is_completed());
                    return Ok(());
                }
                step => panic!("[{}] Unexpected plan step {:?}", i + 1, step),
            }
        }

        Err("Test plan ended without a stop step".into())
    }
}
