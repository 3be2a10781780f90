// tests/providers_fixtures.rs
use news_feeder::ingest::providers::{github, hacker_news, reddit, TopicFilter};
use news_feeder::verify::sources::{dev_to::DevToSource, medium::MediumSource};
use news_feeder::{CorroborationSource, Provenance, SourceCollector};
use std::time::Duration;

const FOREVER: Duration = Duration::from_secs(100 * 365 * 24 * 3600);

fn filter(min_score: i64) -> TopicFilter {
    TopicFilter::new(
        vec!["OpenAI".into(), "LLM".into(), "machine learning".into()],
        min_score,
    )
}

#[tokio::test]
async fn hn_fixture_keeps_on_topic_popular_stories() {
    let c = hacker_news::HackerNewsCollector::from_fixture_str(
        include_str!("fixtures/hn_stories.json"),
        filter(50),
    );
    let items = c.fetch(FOREVER, 10).await.unwrap();
    let ids: Vec<_> = items
        .iter()
        .map(|i| i.provenance_metadata["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![101, 102, 103]);

    let ask = &items[2];
    assert!(ask.canonical_link.is_empty());
    assert!(!ask.is_mergeable());
    // Entities and tags are gone from the body.
    assert_eq!(ask.body_excerpt, "We keep shipping \"agents\" without a real eval story.");
}

#[tokio::test]
async fn hn_fixture_outside_window_is_empty() {
    let c = hacker_news::HackerNewsCollector::from_fixture_str(
        include_str!("fixtures/hn_stories.json"),
        filter(0),
    );
    assert!(c.fetch(Duration::from_secs(3600), 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn reddit_fixture_maps_listing() {
    let c = reddit::RedditCollector::from_fixture_str(
        include_str!("fixtures/reddit_hot.json"),
        filter(50),
    );
    let items = c.fetch(FOREVER, 10).await.unwrap();
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|i| i.provenance == Provenance::Reddit));
    assert_eq!(items[0].popularity_score, 1500);
    assert_eq!(
        items[0].provenance_metadata["permalink"],
        serde_json::json!("https://www.reddit.com/r/MachineLearning/comments/1abc/openai_releases_gpt5/")
    );
    assert!(items[1].body_excerpt.contains("LoRA"));
}

#[tokio::test]
async fn github_fixture_respects_star_floor() {
    let src = include_str!("fixtures/github_search.json");

    let strict = github::GitHubCollector::from_fixture_str(src, filter(10));
    let items = strict.fetch(FOREVER, 10).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "acme/tiny-llm: A tiny LLM inference server in Rust");
    assert_eq!(items[0].provenance_metadata["forks"], serde_json::json!(12));

    let loose = github::GitHubCollector::from_fixture_str(src, filter(0));
    assert_eq!(loose.fetch(FOREVER, 10).await.unwrap().len(), 2);
    assert_eq!(loose.fetch(FOREVER, 1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn devto_fixture_lists_all_articles() {
    let s = DevToSource::from_fixture_str(include_str!("fixtures/devto_articles.json"));
    let hits = s.search(&["LLM".into()]).await.unwrap();
    assert_eq!(hits.len(), 3);
    assert_eq!(hits[1].link, "https://dev.to/bob/running-an-llm-locally");
}

#[tokio::test]
async fn medium_fixture_scrubs_html_entities() {
    let s = MediumSource::from_fixture_str(include_str!("fixtures/medium_tag.xml"));
    let hits = s.search(&["LLM".into()]).await.unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].title, "What GPT-5 means for developers");
    assert_eq!(hits[1].title, "LLM evaluation in practice - lessons learned");
    assert_eq!(hits[1].link, "https://medium.com/@erin/llm-evaluation-5678");
}
