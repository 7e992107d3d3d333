//! Interactive confirmation capability.
//!
//! The engine never talks to a user directly. Every question goes through a
//! [`Prompter`] passed in by the caller, which always comes back with a
//! definite answer. Questions are asked one at a time, in a stable order, and
//! the engine does not move on until the answer is in.

use std::collections::VecDeque;

pub trait Prompter {
    /// Asks a yes/no question.
    fn confirm(&mut self, question: &str) -> bool;

    /// Asks the user to pick one of `options`. `None` means "none of these".
    fn choose(&mut self, question: &str, options: &[String]) -> Option<usize> {
        let _ = (question, options);
        None
    }
}

/// Gives the same answer to every question.
#[derive(Debug, Clone, Copy)]
pub struct FixedPrompter {
    pub answer: bool,
}

impl FixedPrompter {
    pub fn yes() -> Self {
        Self { answer: true }
    }

    pub fn no() -> Self {
        Self { answer: false }
    }
}

impl Prompter for FixedPrompter {
    fn confirm(&mut self, _question: &str) -> bool {
        self.answer
    }

    fn choose(&mut self, _question: &str, options: &[String]) -> Option<usize> {
        (self.answer && options.len() == 1).then_some(0)
    }
}

/// Replays a fixed script of answers and records what was asked.
///
/// Once the script runs out every further question is declined.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<bool>,
    choices: VecDeque<Option<usize>>,
    asked: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn with_choices(mut self, choices: impl IntoIterator<Item = Option<usize>>) -> Self {
        self.choices = choices.into_iter().collect();
        self
    }

    /// Every question asked so far, in order.
    pub fn asked(&self) -> &[String] {
        &self.asked
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&mut self, question: &str) -> bool {
        self.asked.push(question.to_string());
        self.answers.pop_front().unwrap_or(false)
    }

    fn choose(&mut self, question: &str, options: &[String]) -> Option<usize> {
        self.asked.push(question.to_string());
        self.choices
            .pop_front()
            .flatten()
            .filter(|index| *index < options.len())
    }
}
