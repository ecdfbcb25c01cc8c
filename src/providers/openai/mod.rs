mod annotator;
mod client;
mod prompt;

pub use annotator::CommitAnnotator;
pub use client::CompletionClient;
