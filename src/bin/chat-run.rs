use std::env;
use std::error::Error;
use std::io::{self, BufRead};
use std::thread;
use std::time::Duration;

use leadflow::*;

const SKIP_COMMAND: &str = "skip";

#[derive(Default)]
struct Terminal {
    options: Vec<String>,
    timers: Vec<(Duration, Timer)>,
    input_disabled: bool,
}

impl Presenter for Terminal {
    fn present(&mut self, instruction: Instruction) {
        match instruction {
            Instruction::ShowBotMessage(text) => println!("bot> {}", text),
            Instruction::ShowUserMessage(text) => println!("you> {}", text),
            Instruction::ShowOptions(options) => {
                println!("== Choose option ==");
                for (i, option) in options.iter().enumerate() {
                    println!("{}: {}", i + 1, option);
                }
                self.options = options;
            }
            Instruction::ClearOptions => self.options.clear(),
            Instruction::OfferSkip => println!("== Type \"{}\" to skip this question ==", SKIP_COMMAND),
            Instruction::DisableInput => self.input_disabled = true,
            Instruction::PlayCompletionEffect(count) => {
                println!("== {} ==", "*".repeat(count as usize));
            }
        }
    }

    fn schedule(&mut self, delay: Duration, timer: Timer) {
        self.timers.push((delay, timer));
    }
}

// Sleeps through every pending timer in delay order, including any that
// fire while we wait.
fn run_timers(conversation: &mut Conversation<Terminal>) {
    loop {
        let mut timers = std::mem::take(&mut conversation.presenter_mut().timers);
        if timers.is_empty() {
            break;
        }
        timers.sort_by_key(|(delay, _)| *delay);

        let mut elapsed = Duration::from_millis(0);
        for (delay, timer) in timers {
            if delay > elapsed {
                thread::sleep(delay - elapsed);
                elapsed = delay;
            }
            conversation.fire(timer);
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let mut args = env::args();

    // Read the optional first argument as a path to a script table.
    args.next();
    let script = match args.next() {
        Some(script_path) => Script::from_csv_path(script_path)?,
        None => Script::land_registration(),
    };

    let mut conversation = Conversation::new(script, Terminal::default());
    conversation.start();
    run_timers(&mut conversation);

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let input = line.trim();

        let (expects_choice, optional) = match conversation.current_step() {
            Some(step) => (step.expects_choice(), step.optional),
            None => (false, false),
        };

        if optional && input.eq_ignore_ascii_case(SKIP_COMMAND) {
            conversation.skip();
        } else if expects_choice {
            let options = &conversation.presenter().options;
            let choice = input.parse::<usize>().ok()
                .and_then(|number| number.checked_sub(1))
                .and_then(|index| options.get(index))
                .or_else(|| options.iter().find(|option| option.as_str() == input))
                .cloned();
            match choice {
                Some(choice) => conversation.select_option(&choice),
                None => println!("== Enter a number between 1 and {} ==", options.len()),
            }
        } else {
            conversation.submit_text(&line);
        }

        run_timers(&mut conversation);

        if conversation.presenter().input_disabled {
            break;
        }
    }

    Ok(())
}
