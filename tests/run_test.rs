use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::sync::Arc;
use venue_extract::config::VenueConfig;
use venue_extract::error::{ExtractError, Result};
use venue_extract::infra::http_client::{FetchedPage, PageFetcher};
use venue_extract::storage::{EventSink, InMemorySink};
use venue_extract::tasks::{run_venues, VenueStatus};

struct StaticFetcher {
    pages: HashMap<String, String>,
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        match self.pages.get(url) {
            Some(body) => Ok(FetchedPage {
                url: url.to_string(),
                status: 200,
                content_type: "text/html".to_string(),
                body: body.clone(),
            }),
            None => Err(ExtractError::FetchStatus {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 2, 10)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

fn venue(id: &str, url: &str) -> VenueConfig {
    venue_with_policy(id, url, "")
}

fn venue_with_policy(id: &str, url: &str, extra_policy: &str) -> VenueConfig {
    VenueConfig::from_toml_str(&format!(
        r#"
        [venue]
        id = "{id}"
        name = "{id} hall"
        url = "{url}"

        [policy]
        dedup = "highest_score"
        {extra_policy}
        "#
    ))
    .unwrap()
}

#[tokio::test]
async fn test_run_distinguishes_empty_from_fetch_failure() {
    let mut pages = HashMap::new();
    pages.insert(
        "https://busy.example.com/".to_string(),
        r#"<html><body><div class="event"><h3>Jazz Night</h3>
           <time datetime="2026-03-01">March 1</time></div></body></html>"#
            .to_string(),
    );
    pages.insert(
        "https://quiet.example.com/".to_string(),
        "<html><body><p>No shows scheduled.</p></body></html>".to_string(),
    );
    let fetcher = Arc::new(StaticFetcher { pages });
    let sink = Arc::new(InMemorySink::new());

    let outcomes = run_venues(
        vec![
            venue("busy", "https://busy.example.com/"),
            venue("quiet", "https://quiet.example.com/"),
            venue("gone", "https://gone.example.com/"),
        ],
        fetcher,
        sink.clone(),
        2,
        now(),
    )
    .await;

    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0].venue_id, "busy");
    assert_eq!(
        outcomes[0].status,
        VenueStatus::Extracted {
            events: 1,
            stored: 1,
            rejected: 0
        }
    );
    assert_eq!(outcomes[1].status, VenueStatus::Empty { rejected: 0 });
    assert!(matches!(
        outcomes[2].status,
        VenueStatus::FetchFailed { .. }
    ));

    let stored = sink.snapshot();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].venue_id, "busy");
    assert_eq!(stored[0].event.title, "Jazz Night");
}

#[tokio::test]
async fn test_rerun_does_not_duplicate_sink_records() {
    let mut pages = HashMap::new();
    pages.insert(
        "https://busy.example.com/".to_string(),
        r#"<html><body><div class="event"><h3>Jazz Night</h3>
           <time datetime="2026-03-01">March 1</time></div></body></html>"#
            .to_string(),
    );
    let fetcher = Arc::new(StaticFetcher { pages });
    let sink = Arc::new(InMemorySink::new());

    for _ in 0..2 {
        run_venues(
            vec![venue("busy", "https://busy.example.com/")],
            fetcher.clone(),
            sink.clone(),
            1,
            now(),
        )
        .await;
    }
    assert_eq!(sink.len(), 1);

    let again = sink
        .write_events("busy", &[sink.snapshot()[0].event.clone()])
        .await
        .unwrap();
    assert_eq!(again, 0);
}

#[tokio::test]
async fn test_same_day_showtimes_survive_into_the_sink() {
    let mut pages = HashMap::new();
    pages.insert(
        "https://rex.example.com/".to_string(),
        r#"<html><body>
           <div class="event"><h3>Jazz Matinee Set</h3><span class="date">March 7, 2026 3pm</span></div>
           <div class="event"><h3>Jazz Matinee Set</h3><span class="date">March 7, 2026 9pm</span></div>
           </body></html>"#
            .to_string(),
    );
    let fetcher = Arc::new(StaticFetcher { pages });
    let sink = Arc::new(InMemorySink::new());

    let outcomes = run_venues(
        vec![venue_with_policy(
            "rex",
            "https://rex.example.com/",
            r#"dedup_granularity = "timestamp""#,
        )],
        fetcher,
        sink.clone(),
        1,
        now(),
    )
    .await;

    assert_eq!(
        outcomes[0].status,
        VenueStatus::Extracted {
            events: 2,
            stored: 2,
            rejected: 0
        }
    );
    assert_eq!(sink.len(), 2);
}

#[tokio::test]
async fn test_venue_without_dedup_policy_fails_before_fetching() {
    let fetcher = Arc::new(StaticFetcher {
        pages: HashMap::new(),
    });
    let sink = Arc::new(InMemorySink::new());
    let config = VenueConfig::from_toml_str(
        r#"
        [venue]
        id = "unset"
        name = "Unset Hall"
        url = "https://unset.example.com/"
        "#,
    )
    .unwrap();

    let outcomes = run_venues(vec![config], fetcher, sink.clone(), 1, now()).await;
    assert!(matches!(outcomes[0].status, VenueStatus::Failed { .. }));
    assert!(sink.is_empty());
}
