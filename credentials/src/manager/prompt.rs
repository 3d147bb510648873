//! Terminal interaction, kept behind a trait so resolution can be driven
//! without a terminal.

use std::io::{self, BufRead, Write};

/// Source of interactive answers.
pub trait Prompter: Send + Sync {
    /// Read a secret with echo disabled.
    fn secret(&self, prompt: &str) -> io::Result<String>;

    /// Ask a yes/no question; an empty answer yields `default`.
    fn confirm(&self, question: &str, default: bool) -> io::Result<bool>;
}

/// Reads from the controlling terminal via `rpassword`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn secret(&self, prompt: &str) -> io::Result<String> {
        rpassword::prompt_password(prompt)
    }

    fn confirm(&self, question: &str, default: bool) -> io::Result<bool> {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        let mut stderr = io::stderr().lock();
        write!(stderr, "{question} {hint}: ")?;
        stderr.flush()?;

        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        Ok(parse_answer(&answer, default))
    }
}

fn parse_answer(answer: &str, default: bool) -> bool {
    match answer.trim().to_ascii_lowercase().as_str() {
        "" => default,
        "y" | "yes" => true,
        "n" | "no" => false,
        _ => default,
    }
}
