use aura_realtime_types::journal::{Speaker, TranscriptEntry};

/// Buffers streaming partial transcript text for both speakers until the
/// service signals that the turn is complete.
#[derive(Debug, Default)]
pub struct TranscriptAccumulator {
    input: String,
    output: String,
}

impl TranscriptAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_input(&mut self, fragment: &str) {
        self.input.push_str(fragment);
    }

    pub fn push_output(&mut self, fragment: &str) {
        self.output.push_str(fragment);
    }

    pub fn is_empty(&self) -> bool {
        self.input.is_empty() && self.output.is_empty()
    }

    /// Flushes both buffers into immutable entries, user before Aura, and
    /// clears them for the next turn. A side whose trimmed text is empty is
    /// skipped rather than committed.
    pub fn commit_turn(&mut self) -> Vec<TranscriptEntry> {
        let mut entries = Vec::with_capacity(2);
        let input = std::mem::take(&mut self.input);
        let output = std::mem::take(&mut self.output);

        let input = input.trim();
        if !input.is_empty() {
            entries.push(TranscriptEntry::new(Speaker::User, input.to_string()));
        }
        let output = output.trim();
        if !output.is_empty() {
            entries.push(TranscriptEntry::new(Speaker::Aura, output.to_string()));
        }
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_orders_user_before_aura_and_clears() {
        let mut acc = TranscriptAccumulator::new();
        acc.push_input("A");
        acc.push_input("B");
        acc.push_output("C");
        acc.push_output("D");

        let entries = acc.commit_turn();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].speaker, Speaker::User);
        assert_eq!(entries[0].text, "AB");
        assert_eq!(entries[1].speaker, Speaker::Aura);
        assert_eq!(entries[1].text, "CD");
        assert!(acc.is_empty());
    }

    #[test]
    fn empty_sides_are_skipped() {
        let mut acc = TranscriptAccumulator::new();
        acc.push_output("Take a slow breath with me.");

        let entries = acc.commit_turn();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].speaker, Speaker::Aura);
    }

    #[test]
    fn whitespace_only_turn_commits_nothing() {
        let mut acc = TranscriptAccumulator::new();
        acc.push_input("   ");
        acc.push_output("\n");
        assert!(acc.commit_turn().is_empty());
        assert!(acc.is_empty());
    }

    #[test]
    fn buffers_restart_clean_for_the_next_turn() {
        let mut acc = TranscriptAccumulator::new();
        acc.push_input("first");
        acc.commit_turn();
        acc.push_input("second");
        let entries = acc.commit_turn();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].text, "second");
    }
}
