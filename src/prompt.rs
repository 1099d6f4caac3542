use std::io::{self, Write};

use async_trait::async_trait;

use crate::error::{AppError, Result};

/// Questions the interactive run mode asks the user.
#[async_trait]
pub trait Prompter: Send + Sync {
    /// Ask a free-text question; the answer is trimmed.
    async fn ask(&self, question: &str) -> Result<String>;

    /// Ask a yes/no question.
    async fn confirm(&self, question: &str) -> Result<bool> {
        let answer = self.ask(&format!("{question} (y/n): ")).await?;
        Ok(is_yes(&answer))
    }
}

/// Accepts English and Spanish affirmatives, case-insensitively.
pub fn is_yes(answer: &str) -> bool {
    matches!(
        answer.trim().to_lowercase().as_str(),
        "y" | "yes" | "s" | "si" | "sí"
    )
}

fn read_line(question: &str) -> Result<String> {
    print!("{question}");
    io::stdout().flush()?;

    let mut input = String::new();
    let read = io::stdin().read_line(&mut input)?;
    if read == 0 {
        return Err(AppError::Prompt("stdin closed".to_string()));
    }
    Ok(input.trim().to_string())
}

/// Prompter reading answers from the terminal.
pub struct ConsolePrompter;

#[async_trait]
impl Prompter for ConsolePrompter {
    async fn ask(&self, question: &str) -> Result<String> {
        let question = question.to_string();
        tokio::task::spawn_blocking(move || read_line(&question))
            .await
            .map_err(|e| AppError::Prompt(format!("Prompt task panicked: {e}")))?
    }
}

/// Block until the user presses ENTER. Errors (e.g. no terminal) are ignored.
pub fn wait_for_enter(message: &str) {
    let _ = read_line(message);
}

/// Prompter replaying canned answers, for tests.
#[cfg(test)]
pub struct ScriptedPrompter {
    answers: std::sync::Mutex<std::collections::VecDeque<String>>,
    asked: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: std::sync::Mutex::new(answers.into_iter().map(Into::into).collect()),
            asked: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn ask(&self, question: &str) -> Result<String> {
        self.asked.lock().unwrap().push(question.to_string());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .map(|a| a.trim().to_string())
            .ok_or_else(|| AppError::Prompt(format!("no scripted answer for: {question}")))
    }
}
