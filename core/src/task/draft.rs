//! Staged title for the "new task" input

/// The value bound to the new-task text input
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleDraft {
    text: String,
}

impl TitleDraft {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Clear the input after a confirmed create
    pub fn clear(&mut self) {
        self.text.clear();
    }

    /// True when nothing but whitespace is staged
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

impl From<String> for TitleDraft {
    fn from(text: String) -> Self {
        Self { text }
    }
}
