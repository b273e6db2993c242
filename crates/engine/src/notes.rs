use crate::time::TimeCode;

/// Free-text notes taken while watching, with playback timestamps inserted on
/// demand.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotesDraft {
    text: String,
}

impl NotesDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn push_str(&mut self, text: &str) {
        self.text.push_str(text);
    }

    /// Appends a `[MM:SS] ` marker for `position`, starting a new line unless
    /// the draft is empty or already ends with one.
    ///
    /// # Example
    /// ```
    /// use codex_engine::NotesDraft;
    ///
    /// let mut notes = NotesDraft::new();
    /// notes.capture(65.7);
    /// notes.push_str("loss curve");
    /// notes.capture(130.0);
    /// assert_eq!(notes.as_str(), "[01:05] loss curve\n[02:10] ");
    /// ```
    pub fn capture(&mut self, position: f64) -> TimeCode {
        let stamp = TimeCode::from_position(position);
        if !self.text.is_empty() && !self.text.ends_with('\n') {
            self.text.push('\n');
        }
        self.text.push_str(&format!("[{stamp}] "));
        stamp
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl From<String> for NotesDraft {
    fn from(text: String) -> Self {
        Self { text }
    }
}
