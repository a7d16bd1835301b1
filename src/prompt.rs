//! Interactive input for registry credentials.
//!
//! The registry password never travels through the command line or the
//! environment; it is read with a masked prompt when the credential secret
//! has to be created.

use dialoguer::{Input, Password};

use crate::controller::error::{Error, Result};

#[cfg(any(test, feature = "testing"))]
pub use scripted::ScriptedPrompter;

/// Source of interactive answers.
pub trait Prompter: Send + Sync {
    /// Read a visible line of text.
    fn input(&self, label: &str) -> Result<String>;

    /// Read a secret without echoing it.
    fn password(&self, label: &str) -> Result<String>;
}

/// Terminal prompter backed by `dialoguer`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DialoguerPrompter;

impl Prompter for DialoguerPrompter {
    fn input(&self, label: &str) -> Result<String> {
        Input::<String>::new()
            .with_prompt(label)
            .interact_text()
            .map_err(|e| Error::Prompt(e.to_string()))
    }

    fn password(&self, label: &str) -> Result<String> {
        Password::new()
            .with_prompt(label)
            .interact()
            .map_err(|e| Error::Prompt(e.to_string()))
    }
}

#[cfg(any(test, feature = "testing"))]
mod scripted {
    use std::collections::VecDeque;
    use std::sync::{Mutex, PoisonError};

    use super::Prompter;
    use crate::controller::error::{Error, Result};

    /// Prompter answering from a fixed script (testing only).
    ///
    /// Answers are handed out in order regardless of the kind of prompt; an
    /// exhausted script fails like a closed terminal would.
    #[derive(Debug, Default)]
    pub struct ScriptedPrompter {
        answers: Mutex<VecDeque<String>>,
        asked: Mutex<Vec<String>>,
    }

    impl ScriptedPrompter {
        pub fn new(answers: &[&str]) -> Self {
            Self {
                answers: Mutex::new(answers.iter().map(|a| a.to_string()).collect()),
                asked: Mutex::new(Vec::new()),
            }
        }

        /// Labels of every prompt shown so far.
        pub fn asked(&self) -> Vec<String> {
            self.asked
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        fn next(&self, label: &str) -> Result<String> {
            self.asked
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(label.to_string());
            self.answers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front()
                .ok_or_else(|| Error::Prompt(format!("no answer for '{}'", label)))
        }
    }

    impl Prompter for ScriptedPrompter {
        fn input(&self, label: &str) -> Result<String> {
            self.next(label)
        }

        fn password(&self, label: &str) -> Result<String> {
            self.next(label)
        }
    }
}
