//! Human-readable texts shown to whoever schedules the task.

use dirsync_core::models::common::ContextSelection;

/// Source of the task's display strings, so hosts can localize them.
pub trait MessageCatalog: Send + Sync {
    /// Label used in place of a configuration name when all are selected.
    fn all_configurations(&self) -> String;

    /// One-line description of what the task is set up to do.
    fn additional_information(&self, context: ContextSelection, configuration_name: &str) -> String;
}

/// Built-in English texts.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishMessages;

impl MessageCatalog for EnglishMessages {
    fn all_configurations(&self) -> String {
        "all configurations".to_string()
    }

    fn additional_information(&self, context: ContextSelection, configuration_name: &str) -> String {
        format!("Context: {context} / Configuration: {configuration_name}")
    }
}
