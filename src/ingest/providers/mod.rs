pub mod github;
pub mod hacker_news;
pub mod reddit;

/// Provider-side topic filter: keyword match plus a popularity floor.
#[derive(Debug, Clone, Default)]
pub struct TopicFilter {
    pub keywords: Vec<String>,
    pub min_score: i64,
}

impl TopicFilter {
    pub fn new(keywords: Vec<String>, min_score: i64) -> Self {
        Self {
            keywords,
            min_score,
        }
    }

    /// True when any keyword occurs (case-insensitive) in any of the fields.
    /// An empty keyword list accepts everything.
    pub fn mentions_topic(&self, fields: &[&str]) -> bool {
        if self.keywords.is_empty() {
            return true;
        }
        let hay = fields.join(" ").to_lowercase();
        self.keywords
            .iter()
            .any(|k| hay.contains(&k.to_lowercase()))
    }

    pub fn accepts(&self, score: i64, fields: &[&str]) -> bool {
        score >= self.min_score && self.mentions_topic(fields)
    }
}
