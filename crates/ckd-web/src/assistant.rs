//! Local LLM assistant invoked as a child process.

use std::process::Stdio;
use std::time::Duration;

use ckd_core::Diagnostic;
use ckd_sync::KitchenConfig;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{info, warn};

pub const TIMEOUT_MESSAGE: &str = "AI request timed out.";

/// Command line the prompt is piped into, e.g. `ollama run kitchen_ai`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantConfig {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl AssistantConfig {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    pub fn from_config(config: &KitchenConfig) -> Self {
        Self::new(
            config.assistant_program.clone(),
            vec!["run".to_string(), config.assistant_model.clone()],
            config.assistant_timeout,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssistantReply {
    Answer(String),
    /// The process exited non-zero; carries its stderr.
    Failed(String),
    TimedOut,
    SpawnFailed(String),
    BlankQuestion,
}

impl AssistantReply {
    pub fn text(&self) -> String {
        match self {
            AssistantReply::Answer(text) | AssistantReply::Failed(text) => text.clone(),
            AssistantReply::TimedOut => TIMEOUT_MESSAGE.to_string(),
            AssistantReply::SpawnFailed(err) => format!("Error calling AI: {err}"),
            AssistantReply::BlankQuestion => "Please enter a question.".to_string(),
        }
    }

    pub fn diagnostic(&self) -> Diagnostic {
        match self {
            AssistantReply::Answer(text) => Diagnostic::success(text.clone()),
            AssistantReply::BlankQuestion => Diagnostic::warning(self.text()),
            _ => Diagnostic::error(self.text()),
        }
    }
}

pub fn build_prompt(summary: &str, question: &str) -> String {
    format!("{summary}\n\nUser Question: {question}")
}

/// Pipe the summary and question into the assistant and wait up to the configured timeout.
pub async fn ask(config: &AssistantConfig, summary: &str, question: &str) -> AssistantReply {
    let question = question.trim();
    if question.is_empty() {
        return AssistantReply::BlankQuestion;
    }

    let mut child = match Command::new(&config.program)
        .args(&config.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
    {
        Ok(child) => child,
        Err(err) => {
            warn!(program = %config.program, error = %err, "assistant spawn failed");
            return AssistantReply::SpawnFailed(err.to_string());
        }
    };

    let prompt = build_prompt(summary, question);
    let stdin = child.stdin.take();
    let exchange = async move {
        if let Some(mut stdin) = stdin {
            if let Err(err) = stdin.write_all(prompt.as_bytes()).await {
                warn!(error = %err, "writing assistant prompt failed");
            }
        }
        child.wait_with_output().await
    };

    match tokio::time::timeout(config.timeout, exchange).await {
        Err(_) => {
            warn!(timeout_secs = config.timeout.as_secs_f64(), "assistant timed out");
            AssistantReply::TimedOut
        }
        Ok(Err(err)) => AssistantReply::SpawnFailed(err.to_string()),
        Ok(Ok(output)) if output.status.success() => {
            info!(bytes = output.stdout.len(), "assistant answered");
            AssistantReply::Answer(String::from_utf8_lossy(&output.stdout).trim().to_string())
        }
        Ok(Ok(output)) => {
            warn!(status = %output.status, "assistant exited with failure");
            AssistantReply::Failed(String::from_utf8_lossy(&output.stderr).trim().to_string())
        }
    }
}
