pub mod dev_to;
pub mod medium;

/// How many keywords a secondary turns into tag queries.
pub const MAX_TAG_QUERIES: usize = 3;
/// Results taken per tag query.
pub const PER_TAG_RESULTS: usize = 10;

/// Keyword to tag slug: lowercase, alphanumerics only, words joined by `sep`.
pub fn tag_slug(keyword: &str, sep: &str) -> String {
    keyword
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}
