//! Interactive password entry.

use std::collections::VecDeque;

use zeroize::Zeroizing;

/// Outcome of asking the user for a password.
#[derive(Debug)]
pub enum PasswordInput {
    Entered(Zeroizing<String>),
    /// The user interrupted or closed input; not something to retry.
    Canceled,
}

/// Source of passwords for creating and unlocking the vault.
pub trait PasswordPrompt: Send {
    fn read_password(&mut self, prompt: &str) -> PasswordInput;

    /// Tell the user why the last entry was not accepted.
    fn notify(&mut self, message: &str) {
        eprintln!("{}", message);
    }
}

/// Reads passwords from the controlling terminal without echo.
#[derive(Debug, Default)]
pub struct TerminalPrompt;

impl PasswordPrompt for TerminalPrompt {
    fn read_password(&mut self, prompt: &str) -> PasswordInput {
        match rpassword::prompt_password(prompt) {
            Ok(password) => PasswordInput::Entered(Zeroizing::new(password)),
            Err(e) => {
                tracing::debug!(error = %e, "Password input ended");
                PasswordInput::Canceled
            }
        }
    }
}

/// Replays a fixed list of answers, then reports cancellation.
///
/// Used for non-interactive runs and tests.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: VecDeque<String>,
    pub prompts: Vec<String>,
    pub messages: Vec<String>,
}

impl ScriptedPrompt {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            prompts: Vec::new(),
            messages: Vec::new(),
        }
    }
}

impl PasswordPrompt for ScriptedPrompt {
    fn read_password(&mut self, prompt: &str) -> PasswordInput {
        self.prompts.push(prompt.to_string());
        match self.answers.pop_front() {
            Some(answer) => PasswordInput::Entered(Zeroizing::new(answer)),
            None => PasswordInput::Canceled,
        }
    }

    fn notify(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }
}
