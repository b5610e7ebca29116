//! End-to-end harvest passes against a mock API

use reddit_harvest::config::{Config, CrawlerConfig, OutputConfig, RedditConfig};
use reddit_harvest::ingest::{run_harvest, PassOutcome, StopReason};
use reddit_harvest::storage::{open_sink, DuplicatePolicy, RecordSink, RunStatus};
use reddit_harvest::HarvestError;
use serde_json::{json, Value};
use std::path::Path;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str, db_path: &Path, subreddits: &[&str]) -> Config {
    Config {
        reddit: RedditConfig {
            base_url: base_url.to_string(),
            user_agent: "reddit-harvest-tests/0.1".to_string(),
            access_token: None,
            page_size: 2,
        },
        crawler: CrawlerConfig {
            subreddits: subreddits.iter().map(|s| s.to_string()).collect(),
            rate_limit: 0,
            ..CrawlerConfig::default()
        },
        output: OutputConfig {
            database_path: db_path.to_string_lossy().to_string(),
        },
    }
}

fn post_json(id: &str, created: i64, subreddit: &str) -> Value {
    json!({
        "kind": "t3",
        "data": {
            "id": id,
            "title": format!("Post {}", id),
            "selftext": "",
            "author": "poster",
            "score": 12,
            "created_utc": created as f64,
            "permalink": format!("/r/{}/comments/{}/post_{}/", subreddit, id, id),
            "num_comments": 2,
            "url": format!("https://example.com/{}", id),
            "subreddit": subreddit
        }
    })
}

fn listing_json(posts: Vec<Value>, after: Option<&str>) -> Value {
    json!({
        "kind": "Listing",
        "data": { "after": after, "children": posts }
    })
}

fn comment_json(id: &str, post_id: &str, parent: &str, created: i64, replies: Value) -> Value {
    json!({
        "kind": "t1",
        "data": {
            "id": id,
            "body": format!("Comment {}", id),
            "author": "commenter",
            "score": 3,
            "created_utc": created as f64,
            "permalink": format!("/r/rust/comments/{}/post/{}/", post_id, id),
            "parent_id": parent,
            "replies": replies
        }
    })
}

/// A post with one top-level comment and one reply from a deleted account
fn comments_json(post_id: &str, created: i64) -> Value {
    let reply = json!({
        "kind": "t1",
        "data": {
            "id": format!("{}b", post_id),
            "body": "[deleted]",
            "author": "[deleted]",
            "score": 0,
            "created_utc": (created + 2) as f64,
            "permalink": format!("/r/rust/comments/{}/post/{}b/", post_id, post_id),
            "parent_id": format!("t1_{}a", post_id),
            "replies": ""
        }
    });
    let top = comment_json(
        &format!("{}a", post_id),
        post_id,
        &format!("t3_{}", post_id),
        created + 1,
        json!({
            "kind": "Listing",
            "data": {
                "after": null,
                "children": [
                    reply,
                    { "kind": "more", "data": { "count": 4, "children": ["x1", "x2"] } }
                ]
            }
        }),
    );

    json!([
        listing_json(vec![post_json(post_id, created, "rust")], None),
        listing_json(vec![top], None)
    ])
}

async fn mount_listing(server: &MockServer, subreddit: &str, after: Option<&str>, body: Value) {
    let mut mock = Mock::given(method("GET")).and(path(format!("/r/{}/new.json", subreddit)));
    if let Some(after) = after {
        mock = mock.and(query_param("after", after));
    }
    mock.respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_comments(server: &MockServer, post_id: &str, created: i64, expected: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/comments/{}.json", post_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(comments_json(post_id, created)))
        .expect(expected)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_first_run_ingests_whole_listing() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("harvest.db");

    // Mocks matching a specific `after` token are mounted first so they win
    mount_listing(
        &mock_server,
        "rust",
        Some("t3_p2"),
        listing_json(vec![post_json("p1", 1_000, "rust")], None),
    )
    .await;
    mount_listing(
        &mock_server,
        "rust",
        None,
        listing_json(
            vec![post_json("p3", 3_000, "rust"), post_json("p2", 2_000, "rust")],
            Some("t3_p2"),
        ),
    )
    .await;
    for (id, created) in [("p3", 3_000), ("p2", 2_000), ("p1", 1_000)] {
        mount_comments(&mock_server, id, created, 1).await;
    }

    let config = create_test_config(&mock_server.uri(), &db_path, &["rust"]);
    let reports = run_harvest(&config, "hash-1", &config.crawler.subreddits)
        .await
        .unwrap();

    assert_eq!(reports.len(), 1);
    assert!(matches!(
        reports[0].outcome,
        PassOutcome::Completed(StopReason::Exhausted)
    ));
    assert_eq!(reports[0].pages_fetched, 2);
    assert_eq!(reports[0].posts_seen, 3);
    assert_eq!(reports[0].rows_written, 6);

    let sink = open_sink(&db_path, DuplicatePolicy::Append).unwrap();
    assert_eq!(sink.count_rows("rust").unwrap(), 6);
    assert_eq!(sink.count_distinct_posts("rust").unwrap(), 3);
    assert_eq!(
        sink.min_timestamp("rust").unwrap().map(|ts| ts.timestamp()),
        Some(1_000)
    );

    let run = sink.get_latest_run("rust").unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "hash-1");
    assert!(run.boundary.is_none());
    drop(sink);

    // Inspect a reply row directly
    let conn = rusqlite::Connection::open(&db_path).unwrap();
    let (author, parent, permalink, post_author): (String, Option<String>, String, String) = conn
        .query_row(
            "SELECT comment_author, parent_comment_id, comment_permalink, post_author
             FROM reddit_posts_comments WHERE comment_id = 'p3b'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .unwrap();
    assert_eq!(author, "no author");
    assert_eq!(parent.as_deref(), Some("p3a"));
    assert_eq!(
        permalink,
        "https://www.reddit.com/r/rust/comments/p3/post/p3b/"
    );
    assert_eq!(post_author, "poster");

    let top_parent: Option<String> = conn
        .query_row(
            "SELECT parent_comment_id FROM reddit_posts_comments WHERE comment_id = 'p3a'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(top_parent, None);
}

#[tokio::test]
async fn test_second_run_resumes_from_stored_boundary() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("harvest.db");

    {
        let first = MockServer::start().await;
        mount_listing(
            &first,
            "rust",
            None,
            listing_json(
                vec![post_json("p2", 2_000, "rust"), post_json("p1", 1_000, "rust")],
                None,
            ),
        )
        .await;
        mount_comments(&first, "p2", 2_000, 1).await;
        mount_comments(&first, "p1", 1_000, 1).await;

        let config = create_test_config(&first.uri(), &db_path, &["rust"]);
        run_harvest(&config, "hash", &config.crawler.subreddits)
            .await
            .unwrap();
    }

    let second = MockServer::start().await;
    mount_listing(
        &second,
        "rust",
        Some("t3_p3"),
        listing_json(
            vec![post_json("p2", 2_000, "rust"), post_json("p1", 1_000, "rust")],
            Some("t3_p1"),
        ),
    )
    .await;
    mount_listing(
        &second,
        "rust",
        None,
        listing_json(
            vec![post_json("p4", 4_000, "rust"), post_json("p3", 3_000, "rust")],
            Some("t3_p3"),
        ),
    )
    .await;
    mount_comments(&second, "p4", 4_000, 1).await;
    mount_comments(&second, "p3", 3_000, 1).await;
    mount_comments(&second, "p2", 2_000, 1).await;
    // the boundary post itself is never revisited
    mount_comments(&second, "p1", 1_000, 0).await;

    let config = create_test_config(&second.uri(), &db_path, &["rust"]);
    let reports = run_harvest(&config, "hash", &config.crawler.subreddits)
        .await
        .unwrap();

    let report = &reports[0];
    assert!(matches!(
        report.outcome,
        PassOutcome::Completed(StopReason::BoundaryReached)
    ));
    assert_eq!(report.posts_seen, 3);
    assert_eq!(report.rows_written, 6);

    let sink = open_sink(&db_path, DuplicatePolicy::Append).unwrap();
    // p2 was stored by both passes
    assert_eq!(sink.count_rows("rust").unwrap(), 10);
    assert_eq!(sink.count_distinct_posts("rust").unwrap(), 4);

    let run = sink.get_latest_run("rust").unwrap().unwrap();
    assert_eq!(run.stop_reason.as_deref(), Some("boundary"));
    assert_eq!(run.boundary.map(|ts| ts.timestamp()), Some(1_000));
}

#[tokio::test]
async fn test_failed_pass_keeps_rows_and_continues_with_next_subreddit() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("harvest.db");

    mount_listing(
        &mock_server,
        "rust",
        None,
        listing_json(
            vec![post_json("p3", 3_000, "rust"), post_json("p2", 2_000, "rust")],
            Some("t3_p2"),
        ),
    )
    .await;
    mount_comments(&mock_server, "p3", 3_000, 1).await;
    Mock::given(method("GET"))
        .and(path("/comments/p2.json"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    mount_listing(
        &mock_server,
        "golang",
        None,
        listing_json(vec![post_json("g1", 5_000, "golang")], None),
    )
    .await;
    mount_comments(&mock_server, "g1", 5_000, 1).await;

    let config = create_test_config(&mock_server.uri(), &db_path, &["rust", "golang"]);
    let reports = run_harvest(&config, "hash", &config.crawler.subreddits)
        .await
        .unwrap();

    assert_eq!(reports.len(), 2);
    match &reports[0].outcome {
        PassOutcome::Failed(HarvestError::Source(e)) => {
            assert!(e.to_string().contains("503"), "unexpected error: {}", e)
        }
        other => panic!("expected a source failure, got {:?}", other),
    }
    assert_eq!(reports[0].rows_written, 2);
    assert!(matches!(reports[1].outcome, PassOutcome::Completed(_)));

    let sink = open_sink(&db_path, DuplicatePolicy::Append).unwrap();
    assert_eq!(sink.count_rows("rust").unwrap(), 2);
    assert_eq!(
        sink.min_timestamp("rust").unwrap().map(|ts| ts.timestamp()),
        Some(3_000)
    );
    assert_eq!(sink.count_rows("golang").unwrap(), 2);

    let failed = sink.get_latest_run("rust").unwrap().unwrap();
    assert_eq!(failed.status, RunStatus::Failed);
    assert!(failed.error_message.is_some());
}

#[tokio::test]
async fn test_rate_limited_listing_fails_the_pass() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("harvest.db");

    Mock::given(method("GET"))
        .and(path("/r/rust/new.json"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), &db_path, &["rust"]);
    let reports = run_harvest(&config, "hash", &config.crawler.subreddits)
        .await
        .unwrap();

    assert!(matches!(
        reports[0].outcome,
        PassOutcome::Failed(HarvestError::Source(
            reddit_harvest::source::SourceError::RateLimited { .. }
        ))
    ));

    let sink = open_sink(&db_path, DuplicatePolicy::Append).unwrap();
    assert_eq!(sink.count_rows("rust").unwrap(), 0);
}

#[tokio::test]
async fn test_skip_policy_rerun_adds_no_rows() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("harvest.db");

    mount_listing(
        &mock_server,
        "rust",
        None,
        listing_json(
            vec![post_json("p2", 2_000, "rust"), post_json("p1", 1_000, "rust")],
            None,
        ),
    )
    .await;
    mount_comments(&mock_server, "p2", 2_000, 2).await;
    mount_comments(&mock_server, "p1", 1_000, 1).await;

    let mut config = create_test_config(&mock_server.uri(), &db_path, &["rust"]);
    config.crawler.on_duplicate = DuplicatePolicy::Skip;

    run_harvest(&config, "hash", &config.crawler.subreddits)
        .await
        .unwrap();
    let reports = run_harvest(&config, "hash", &config.crawler.subreddits)
        .await
        .unwrap();

    assert_eq!(reports[0].posts_seen, 1);
    assert_eq!(reports[0].rows_written, 0);

    let sink = open_sink(&db_path, DuplicatePolicy::Skip).unwrap();
    assert_eq!(sink.count_rows("rust").unwrap(), 4);
}
