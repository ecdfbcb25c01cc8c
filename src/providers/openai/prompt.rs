use super::client::{ChatMessage, Role};
use crate::models::CommitRecord;

const REVIEWER_PERSONA: &str = "You are an expert code reviewer.";

/// System and user messages asking the model to review `commit`.
pub fn review_messages(commit: &CommitRecord) -> Vec<ChatMessage> {
    vec![
        ChatMessage::new(Role::System, REVIEWER_PERSONA),
        ChatMessage::new(Role::User, review_prompt(commit)),
    ]
}

fn review_prompt(commit: &CommitRecord) -> String {
    let files = match commit.changed_files {
        Some(count) => format!("{count} files"),
        None => "unknown number of files".to_string(),
    };

    format!(
        "Analyze this commit:\n\
         Message: {message}\n\
         Changes: +{additions}/-{deletions} ({files})\n\
         \n\
         Respond in JSON format:\n\
         {{\"type\": \"<type>\", \"quality_score\": <score>, \"insights\": \"<insights>\"}}",
        message = commit.message,
        additions = commit.additions,
        deletions = commit.deletions,
    )
}
