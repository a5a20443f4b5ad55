// Human-in-the-loop hooks for sensitive actions and operator takeover.
use std::io::{BufRead, Write};

use async_trait::async_trait;

use crate::action::types::Action;

/// Asked before a sensitive action runs; `false` cancels it.
#[async_trait]
pub trait ConfirmationHook: Send + Sync {
    async fn confirm(&self, message: &str) -> bool;
}

/// Hands control to a human; returns once the operator signals resume.
#[async_trait]
pub trait TakeoverHook: Send + Sync {
    async fn takeover(&self, message: &str);
}

/// Returns true if this action requires human approval before execution.
pub fn requires_approval(action: &Action) -> bool {
    matches!(action, Action::Tap { message: Some(_), .. })
}

/// Prompts on the controlling terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleHooks;

#[async_trait]
impl ConfirmationHook for ConsoleHooks {
    async fn confirm(&self, message: &str) -> bool {
        let prompt = format!("⚠️  Confirm: {message}? (y/n): ");
        match prompt_line(prompt).await {
            Some(answer) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
            None => false,
        }
    }
}

#[async_trait]
impl TakeoverHook for ConsoleHooks {
    async fn takeover(&self, message: &str) {
        let prompt = format!("✋ {message} (press Enter when done): ");
        let _ = prompt_line(prompt).await;
    }
}

/// Non-interactive hooks for unattended runs: sensitive actions get a fixed
/// answer and takeovers return immediately.
#[derive(Debug, Clone, Copy)]
pub struct HeadlessHooks {
    pub approve_sensitive: bool,
}

#[async_trait]
impl ConfirmationHook for HeadlessHooks {
    async fn confirm(&self, message: &str) -> bool {
        tracing::warn!(reason = message, approved = self.approve_sensitive, "sensitive action auto-answered");
        self.approve_sensitive
    }
}

#[async_trait]
impl TakeoverHook for HeadlessHooks {
    async fn takeover(&self, message: &str) {
        tracing::warn!(reason = message, "takeover requested in headless mode; continuing");
    }
}

/// Reads one line from stdin without blocking the runtime.
/// `None` on EOF or read failure.
pub async fn prompt_line(prompt: String) -> Option<String> {
    let read = tokio::task::spawn_blocking(move || {
        let mut stdout = std::io::stdout();
        let _ = write!(stdout, "{prompt}");
        let _ = stdout.flush();
        let mut line = String::new();
        match std::io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line),
        }
    })
    .await;
    match read {
        Ok(line) => line,
        Err(e) => {
            tracing::error!(error = %e, "stdin prompt task failed");
            None
        }
    }
}
