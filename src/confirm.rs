//! The blocking yes/no confirmation channel.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

use crate::decision::Prompt;

/// Asks the operator a yes/no question and blocks until answered.
pub trait Confirm {
    /// # Errors
    /// The channel could not deliver an answer.
    fn confirm(&mut self, prompt: Prompt) -> io::Result<bool>;
}

/// Interactive prompt: writes `<question> [y/N] ` and reads one line.
///
/// Only `y`/`yes` (any case) accepts; anything else, including an empty
/// line, declines. End of input is an error rather than a silent "no".
pub struct Terminal<R, W> {
    input: R,
    output: W,
}

impl Terminal<io::StdinLock<'static>, io::Stderr> {
    /// Prompt on stderr, read from stdin.
    #[must_use]
    pub fn stdio() -> Self {
        Self {
            input: io::stdin().lock(),
            output: io::stderr(),
        }
    }
}

impl<R: BufRead, W: Write> Terminal<R, W> {
    pub const fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Confirm for Terminal<R, W> {
    fn confirm(&mut self, prompt: Prompt) -> io::Result<bool> {
        write!(self.output, "{} {} [y/N] ", prompt.glyph(), prompt.text())?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "stdin closed while waiting for an answer",
            ));
        }
        let answer = line.trim().to_ascii_lowercase();
        let accepted = answer == "y" || answer == "yes";
        tracing::debug!(?prompt, accepted, "operator answered");
        Ok(accepted)
    }
}

/// Pre-recorded answers, consumed in order. Records every prompt asked.
#[derive(Debug, Default)]
pub struct Scripted {
    answers: VecDeque<bool>,
    pub asked: Vec<Prompt>,
}

impl Scripted {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            asked: Vec::new(),
        }
    }

    /// Answers never consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl Confirm for Scripted {
    fn confirm(&mut self, prompt: Prompt) -> io::Result<bool> {
        self.asked.push(prompt);
        self.answers.pop_front().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("no scripted answer for {prompt:?}"),
            )
        })
    }
}
