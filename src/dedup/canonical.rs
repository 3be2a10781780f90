// src/dedup/canonical.rs
//! Link and title canonicalization applied before any comparison.

use url::{form_urlencoded, Url};

/// Query parameters that never identify content.
pub const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "ref",
    "referrer",
    "source",
    "_source",
];

/// Boilerplate stripped from the start of canonical titles.
pub const TITLE_PREFIXES: &[&str] = &[
    "show hn",
    "ask hn",
    "tell hn",
    "breaking",
    "urgent",
    "update",
    "new",
    "latest",
    "just in",
];

/// Boilerplate stripped from the end of canonical titles.
pub const TITLE_SUFFIXES: &[&str] = &[
    "hacker news",
    "hn",
    "reddit",
    "github",
    "discussion",
    "comments",
    "thread",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalLink {
    /// Host without a leading `www.`, with the port when it is not the default.
    pub host: String,
    /// Path without trailing slash, followed by `?query` when parameters survive.
    pub path: String,
    pub serialized: String,
}

/// Canonical form of a link. Unparseable input degrades to the trimmed,
/// lowercased string with an empty host.
pub fn canonicalize_link(raw: &str) -> CanonicalLink {
    let lowered = raw.trim().to_lowercase();
    let Ok(url) = Url::parse(&lowered) else {
        return CanonicalLink {
            host: String::new(),
            path: lowered.clone(),
            serialized: lowered,
        };
    };

    let scheme = match url.scheme() {
        "http" | "https" => "https",
        other => other,
    };
    let mut host = url
        .host_str()
        .map(|h| h.strip_prefix("www.").unwrap_or(h).to_string())
        .unwrap_or_default();
    if let Some(port) = url
        .port()
        .filter(|p| !(scheme == "https" && matches!(*p, 80 | 443)))
    {
        host.push_str(&format!(":{port}"));
    }

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !TRACKING_PARAMS.contains(&k.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    pairs.sort();

    let mut path = url.path().trim_end_matches('/').to_string();
    if !pairs.is_empty() {
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        path.push('?');
        path.push_str(&query);
    }
    // Percent-encoding emitted by the parser is uppercase.
    let path = path.to_lowercase();

    let serialized = if host.is_empty() {
        format!("{scheme}:{path}")
    } else {
        format!("{scheme}://{host}{path}")
    };
    CanonicalLink {
        host,
        path,
        serialized,
    }
}

/// Canonical form of a title: lowercase alphanumeric words separated by a
/// single space, boilerplate prefixes and suffixes removed.
pub fn canonicalize_title(raw: &str) -> String {
    let spaced: String = raw
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    let mut title = spaced.split_whitespace().collect::<Vec<_>>().join(" ");

    loop {
        let before = title.len();
        for p in TITLE_PREFIXES {
            if let Some(rest) = title.strip_prefix(p).and_then(|r| r.strip_prefix(' ')) {
                title = rest.to_string();
            }
        }
        for s in TITLE_SUFFIXES {
            if let Some(rest) = title.strip_suffix(s).and_then(|r| r.strip_suffix(' ')) {
                title = rest.to_string();
            }
        }
        if title.len() == before {
            return title;
        }
    }
}
