//! Operator decisions during interactive runs.

use crate::error::{OrchestratorError, Result};
use async_trait::async_trait;
use seedcast_core::DestinationId;
use std::io::{BufRead, Write};

/// A yes/no question put to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Question {
    /// Upload although the release group is banned
    OverrideBan {
        /// Destination asking
        destination: DestinationId,
        /// Banned group
        group: String,
        /// Ban conditions, if listed
        note: Option<String>,
    },
    /// Upload although duplicates were found
    UploadDuplicates {
        /// Destination asking
        destination: DestinationId,
        /// Names of the duplicates
        duplicates: Vec<String>,
    },
    /// Final confirmation before posting
    ConfirmUpload {
        /// Destination asking
        destination: DestinationId,
        /// Release name as it will be uploaded
        name: String,
    },
}

impl Question {
    /// Prompt text shown on the console.
    #[must_use]
    pub fn text(&self) -> String {
        match self {
            Self::OverrideBan {
                destination,
                group,
                note,
            } => {
                let mut text = format!("{group} is banned from {destination}.");
                if let Some(note) = note {
                    text.push_str(&format!(" Note: {note}."));
                }
                text.push_str(" Upload anyway?");
                text
            }
            Self::UploadDuplicates {
                destination,
                duplicates,
            } => {
                let mut text = format!("Possible duplicates on {destination}:");
                for name in duplicates {
                    text.push_str("\n  - ");
                    text.push_str(name);
                }
                text.push_str("\nUpload anyway?");
                text
            }
            Self::ConfirmUpload { destination, name } => {
                format!("Upload {name} to {destination}?")
            }
        }
    }
}

/// Source of operator decisions.
#[async_trait]
pub trait DecisionPrompter: Send + Sync {
    /// Answer a question; `true` means go ahead.
    async fn ask(&self, question: Question) -> Result<bool>;
}

/// Asks on stdin/stdout. Only used when destinations run one at a time.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsolePrompter;

#[async_trait]
impl DecisionPrompter for ConsolePrompter {
    async fn ask(&self, question: Question) -> Result<bool> {
        let text = question.text();
        tokio::task::spawn_blocking(move || -> std::io::Result<bool> {
            let mut stdout = std::io::stdout().lock();
            write!(stdout, "{text} [y/N] ")?;
            stdout.flush()?;

            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            Ok(matches!(line.trim().to_lowercase().as_str(), "y" | "yes"))
        })
        .await
        .map_err(|e| OrchestratorError::Prompt {
            reason: e.to_string(),
        })?
        .map_err(|e| OrchestratorError::Prompt {
            reason: e.to_string(),
        })
    }
}

/// Answers without asking: confirms uploads, never overrides a ban or a
/// duplicate flag.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

#[async_trait]
impl DecisionPrompter for AutoApprove {
    async fn ask(&self, question: Question) -> Result<bool> {
        Ok(matches!(question, Question::ConfirmUpload { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> DestinationId {
        DestinationId::new("BLU").expect("valid id")
    }

    #[test]
    fn test_question_text() {
        let ban = Question::OverrideBan {
            destination: id(),
            group: "EVO".to_string(),
            note: Some("Raw content only".to_string()),
        };
        assert_eq!(
            ban.text(),
            "EVO is banned from BLU. Note: Raw content only. Upload anyway?"
        );

        let dupes = Question::UploadDuplicates {
            destination: id(),
            duplicates: vec!["A".to_string(), "B".to_string()],
        };
        assert_eq!(dupes.text(), "Possible duplicates on BLU:\n  - A\n  - B\nUpload anyway?");
    }

    #[tokio::test]
    async fn test_auto_approve() {
        let prompter = AutoApprove;
        assert!(prompter
            .ask(Question::ConfirmUpload {
                destination: id(),
                name: "x".to_string(),
            })
            .await
            .expect("answer"));
        assert!(!prompter
            .ask(Question::UploadDuplicates {
                destination: id(),
                duplicates: Vec::new(),
            })
            .await
            .expect("answer"));
    }
}
