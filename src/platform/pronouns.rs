//! Static pronoun id → display label table

use std::collections::HashMap;

use super::traits::PronounDirectory;

/// In-memory pronoun directory seeded with the site's known pronoun ids.
pub struct StaticPronouns {
    labels: HashMap<&'static str, &'static str>,
}

impl Default for StaticPronouns {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticPronouns {
    pub fn new() -> Self {
        let labels = HashMap::from([
            ("hehim", "He/Him"),
            ("sheher", "She/Her"),
            ("theythem", "They/Them"),
            ("hethem", "He/They"),
            ("shethem", "She/They"),
            ("itits", "It/Its"),
            ("anyall", "Any/All"),
            ("other", "Other"),
        ]);
        Self { labels }
    }
}

impl PronounDirectory for StaticPronouns {
    fn label(&self, id: &str) -> Option<String> {
        self.labels.get(id).map(|s| s.to_string())
    }
}
