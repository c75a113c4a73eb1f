//! Arbitration between candidate criteria.
//!
//! The optimizer never reads from a terminal itself. It asks an injected
//! [`Arbiter`], which is either a person at a console or an automatic rule.

use std::io::{self, BufRead, BufReader, Stdin, Stdout, Write};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArbiterError {
    #[error("Arbiter input closed before a decision was made")]
    InputClosed,

    #[error("No candidates to choose from")]
    NoCandidates,

    #[error("Arbiter chose {index}, but only {available} candidates exist")]
    InvalidChoice { index: usize, available: usize },

    #[error("Arbiter I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// Outcome of reviewing a batch of candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Review {
    /// Keep these candidates and move on to choosing one
    Accept,

    /// Regenerate the candidates with these notes
    Annotate(String),
}

/// Resolves several candidate criteria to one.
pub trait Arbiter: Send {
    /// Look at candidates for `criterion` and accept them or ask for new ones.
    fn review(&mut self, criterion: &str, candidates: &[String]) -> Result<Review, ArbiterError>;

    /// Pick one candidate; returns its 0-based index.
    fn choose_one(&mut self, candidates: &[String]) -> Result<usize, ArbiterError>;
}

/// Non-interactive arbiter: accepts every batch and picks the first candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoArbiter;

impl Arbiter for AutoArbiter {
    fn review(&mut self, _criterion: &str, _candidates: &[String]) -> Result<Review, ArbiterError> {
        Ok(Review::Accept)
    }

    fn choose_one(&mut self, candidates: &[String]) -> Result<usize, ArbiterError> {
        if candidates.is_empty() {
            return Err(ArbiterError::NoCandidates);
        }
        Ok(0)
    }
}

/// Arbiter backed by a line-oriented console.
///
/// Invalid answers are reprompted; a closed input stream is an error.
pub struct ConsoleArbiter<R, W> {
    input: R,
    output: W,
}

impl ConsoleArbiter<BufReader<Stdin>, Stdout> {
    /// Arbiter on the process's stdin and stdout.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsoleArbiter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Consume the arbiter, returning the output sink.
    pub fn into_output(self) -> W {
        self.output
    }

    fn ask(&mut self, question: &str) -> Result<String, ArbiterError> {
        writeln!(self.output, "{}", question)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(ArbiterError::InputClosed);
        }
        Ok(line.trim().to_string())
    }

    fn list(&mut self, candidates: &[String]) -> Result<(), ArbiterError> {
        for (i, candidate) in candidates.iter().enumerate() {
            writeln!(self.output, "[{}] {}", i + 1, candidate)?;
        }
        Ok(())
    }
}

impl<R: BufRead + Send, W: Write + Send> Arbiter for ConsoleArbiter<R, W> {
    fn review(&mut self, criterion: &str, candidates: &[String]) -> Result<Review, ArbiterError> {
        writeln!(
            self.output,
            "Here are some proposals for improving the criterion \"{}\":",
            criterion
        )?;
        self.list(candidates)?;

        loop {
            match self
                .ask("Is there anything you would like to add? [y/n]")?
                .to_lowercase()
                .as_str()
            {
                "y" => {
                    let notes = self.ask("Please enter your annotations:")?;
                    return Ok(Review::Annotate(notes));
                }
                "n" => return Ok(Review::Accept),
                _ => writeln!(self.output, "Please answer 'y' for yes or 'n' for no.")?,
            }
        }
    }

    fn choose_one(&mut self, candidates: &[String]) -> Result<usize, ArbiterError> {
        if candidates.is_empty() {
            return Err(ArbiterError::NoCandidates);
        }

        let range = (1..=candidates.len())
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join("/");
        writeln!(self.output, "Here are the options:")?;
        self.list(candidates)?;

        loop {
            let answer = self.ask(&format!(
                "Which of the proposals do you want to keep? [{}]",
                range
            ))?;
            match answer.parse::<usize>() {
                Ok(choice) if (1..=candidates.len()).contains(&choice) => {
                    writeln!(
                        self.output,
                        "You chose proposal {}: {}",
                        choice,
                        candidates[choice - 1]
                    )?;
                    return Ok(choice - 1);
                }
                Ok(_) => writeln!(
                    self.output,
                    "Please enter a number from 1 to {}.",
                    candidates.len()
                )?,
                Err(_) => writeln!(self.output, "Please enter a valid number.")?,
            }
        }
    }
}
