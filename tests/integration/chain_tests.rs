//! Integration tests for chain traversal
//!
//! These tests use wiremock to serve chains of pages and run the engine
//! end-to-end against a progress table in a temporary directory.

use chapter_chain::config::Config;
use chapter_chain::crawler::{build_engine, DoneReason, HttpFetcher, RetryPolicy};
use chapter_chain::storage::{JsonProgressStore, StorageError, StorageResult};
use chapter_chain::{
    ChainError, LinkExtractor, ProgressRecord, ProgressStore, Source, SourceId, TraversalEngine,
};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Builds a chapter page with an optional `rel=next` link
fn chapter(title: &str, next: Option<&str>) -> String {
    let link = next
        .map(|href| format!(r#"<a rel="next" href="{}">Next chapter</a>"#, href))
        .unwrap_or_default();
    format!(
        "<html><head><title>{}</title></head><body><p>{} text</p>{}</body></html>",
        title, title, link
    )
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html")
}

/// Mounts a page that must be requested exactly `times` times
async fn mount_page(server: &MockServer, route: &str, body: String, times: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(body))
        .expect(times)
        .mount(server)
        .await;
}

/// HTTP fetcher with a short backoff so retry tests stay fast
fn fast_fetcher(max_attempts: u32) -> HttpFetcher {
    HttpFetcher::with_client(
        reqwest::Client::new(),
        RetryPolicy::new(max_attempts, Duration::from_millis(10)),
    )
}

fn engine_with<S: ProgressStore>(store: S) -> TraversalEngine<HttpFetcher, S> {
    TraversalEngine::new(fast_fetcher(3), store, LinkExtractor::default())
}

fn read(dir: &Path, name: &str) -> String {
    fs::read_to_string(dir.join(name)).unwrap()
}

/// Store whose `save` fails on one chosen call, like a crash mid-run
struct CrashingStore {
    inner: JsonProgressStore,
    fail_on_save: usize,
    saves: AtomicUsize,
}

impl CrashingStore {
    fn new(inner: JsonProgressStore, fail_on_save: usize) -> Self {
        Self {
            inner,
            fail_on_save,
            saves: AtomicUsize::new(0),
        }
    }
}

impl ProgressStore for CrashingStore {
    fn load(&self, source: &Source) -> StorageResult<ProgressRecord> {
        self.inner.load(source)
    }

    fn save(&self, source: &Source, record: &ProgressRecord) -> StorageResult<()> {
        let n = self.saves.fetch_add(1, Ordering::SeqCst) + 1;
        if n == self.fail_on_save {
            return Err(StorageError::Io(io::Error::new(
                io::ErrorKind::Other,
                "simulated crash",
            )));
        }
        self.inner.save(source, record)
    }

    fn delete(&self, id: &SourceId) -> StorageResult<bool> {
        self.inner.delete(id)
    }

    fn list_all(&self) -> StorageResult<Vec<(SourceId, ProgressRecord)>> {
        self.inner.list_all()
    }

    fn purge_completed(&self) -> StorageResult<usize> {
        self.inner.purge_completed()
    }
}

#[tokio::test]
async fn test_full_chain_saves_every_page() {
    let server = MockServer::start().await;
    let tmp = TempDir::new().unwrap();

    mount_page(&server, "/book/1", chapter("Chapter 1", Some("/book/2")), 1).await;
    mount_page(&server, "/book/2", chapter("Chapter 2", Some("/book/3")), 1).await;
    mount_page(&server, "/book/3", chapter("Chapter 3: The End?", None), 1).await;

    let store = JsonProgressStore::new(tmp.path().join("state.json"));
    let engine = engine_with(&store);
    let out = tmp.path().join("novels");
    let source = Source::new(&format!("{}/book/1", server.uri()), &out).unwrap();

    let report = engine.run(&source).await.unwrap();

    assert_eq!(report.pages_saved, 3);
    assert_eq!(report.reason, DoneReason::NoNextLink);
    assert_eq!(report.output_location, out);
    assert_eq!(read(&out, "Chapter 1.html"), chapter("Chapter 1", Some("/book/2")));
    assert!(read(&out, "Chapter 3 The End.html").contains("Chapter 3: The End? text"));

    // A finished chain leaves nothing to resume
    assert!(store.list_all().unwrap().is_empty());
}

#[tokio::test]
async fn test_resume_after_crash_refetches_only_unrecorded_page() {
    let server = MockServer::start().await;
    let tmp = TempDir::new().unwrap();

    // Page 2 is written in the first run but its cursor move is lost, so it
    // is fetched again; pages 1 and 3 are fetched once overall
    mount_page(&server, "/c/1", chapter("One", Some("/c/2")), 1).await;
    mount_page(&server, "/c/2", chapter("Two", Some("/c/3")), 2).await;
    mount_page(&server, "/c/3", chapter("Three", None), 1).await;

    let state = tmp.path().join("state.json");
    let out = tmp.path().join("out");
    let source = Source::new(&format!("{}/c/1", server.uri()), &out).unwrap();

    // Save 1 is the initial record, save 2 follows page 1, save 3 follows page 2
    let crashing = engine_with(CrashingStore::new(JsonProgressStore::new(&state), 3));
    let err = crashing.run(&source).await.unwrap_err();
    assert!(matches!(err, ChainError::Storage(_)));
    assert!(out.join("Two.html").exists());

    let store = JsonProgressStore::new(&state);
    let record = store.load(&source).unwrap();
    assert_eq!(record.cursor, Some(format!("{}/c/2", server.uri())));
    assert_eq!(record.visited.len(), 1);

    let report = engine_with(&store).run(&source).await.unwrap();

    assert_eq!(report.pages_saved, 2);
    assert_eq!(report.last_url, Some(format!("{}/c/3", server.uri())));
    assert!(out.join("One.html").exists());
    assert!(out.join("Three.html").exists());
    assert!(store.list_all().unwrap().is_empty());
}

#[tokio::test]
async fn test_cycle_ends_chain_without_refetching() {
    let server = MockServer::start().await;
    let tmp = TempDir::new().unwrap();

    mount_page(&server, "/a", chapter("A", Some("/b")), 1).await;
    mount_page(&server, "/b", chapter("B", Some("/a")), 1).await;

    let store = JsonProgressStore::new(tmp.path().join("state.json"));
    let source = Source::new(&format!("{}/a", server.uri()), tmp.path().join("out")).unwrap();

    let report = engine_with(&store).run(&source).await.unwrap();

    assert_eq!(report.pages_saved, 2);
    assert_eq!(report.reason, DoneReason::Cycle(format!("{}/a", server.uri())));
    assert!(store.list_all().unwrap().is_empty());
}

#[tokio::test]
async fn test_retry_recovers_from_server_errors() {
    let server = MockServer::start().await;
    let tmp = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    mount_page(&server, "/flaky", chapter("Flaky", None), 1).await;

    let store = JsonProgressStore::new(tmp.path().join("state.json"));
    let source = Source::new(&format!("{}/flaky", server.uri()), tmp.path().join("out")).unwrap();

    let report = engine_with(&store).run(&source).await.unwrap();

    assert_eq!(report.pages_saved, 1);
    assert!(tmp.path().join("out/Flaky.html").exists());
}

#[tokio::test]
async fn test_exhausted_retries_keep_progress() {
    let server = MockServer::start().await;
    let tmp = TempDir::new().unwrap();

    mount_page(&server, "/s/1", chapter("First", Some("/s/2")), 1).await;
    Mock::given(method("GET"))
        .and(path("/s/2"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let store = JsonProgressStore::new(tmp.path().join("state.json"));
    let out = tmp.path().join("out");
    let source = Source::new(&format!("{}/s/1", server.uri()), &out).unwrap();

    let err = engine_with(&store).run(&source).await.unwrap_err();

    match err {
        ChainError::Fetch(e) => {
            assert_eq!(e.attempts, 3);
            assert_eq!(e.url, format!("{}/s/2", server.uri()));
        }
        other => panic!("expected a fetch error, got {other:?}"),
    }

    let all = store.list_all().unwrap();
    assert_eq!(all.len(), 1);
    let (id, record) = &all[0];
    assert_eq!(id, source.id());
    assert_eq!(record.cursor, Some(format!("{}/s/2", server.uri())));
    assert!(record.has_visited(&format!("{}/s/1", server.uri())));
    assert_eq!(record.output_location.as_deref(), Some(out.as_path()));
    assert_eq!(record.entry_url, format!("{}/s/1", server.uri()));
}

#[tokio::test]
async fn test_resume_writes_to_recorded_location() {
    let server = MockServer::start().await;
    let tmp = TempDir::new().unwrap();

    mount_page(&server, "/r/1", chapter("Opening", Some("/r/2")), 1).await;
    Mock::given(method("GET"))
        .and(path("/r/2"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(3)
        .expect(3)
        .mount(&server)
        .await;
    mount_page(&server, "/r/2", chapter("Closing", None), 1).await;

    let store = JsonProgressStore::new(tmp.path().join("state.json"));
    let entry = format!("{}/r/1", server.uri());

    let first = Source::new(&entry, tmp.path().join("first")).unwrap();
    assert!(engine_with(&store).run(&first).await.is_err());

    // Same entry URL, different requested directory
    let second = Source::new(&entry, tmp.path().join("second")).unwrap();
    let report = engine_with(&store).run(&second).await.unwrap();

    assert_eq!(report.output_location, tmp.path().join("first"));
    assert!(tmp.path().join("first/Opening.html").exists());
    assert!(tmp.path().join("first/Closing.html").exists());
    assert!(!tmp.path().join("second").exists());
}

#[tokio::test]
async fn test_selector_priority_and_relative_links() {
    let server = MockServer::start().await;
    let tmp = TempDir::new().unwrap();

    // `.next` appears first in the document, but `a[rel=next]` is tried first
    mount_page(
        &server,
        "/vol1/ch1.html",
        r#"<html><head><title>Ch1</title></head><body>
            <a class="next" href="/wrong.html">Ad</a>
            <a rel="next" href="../vol2/ch2.html#content">Next</a>
        </body></html>"#
            .to_string(),
        1,
    )
    .await;
    mount_page(&server, "/vol2/ch2.html", chapter("Ch2", None), 1).await;
    mount_page(&server, "/wrong.html", chapter("Wrong", None), 0).await;

    let store = JsonProgressStore::new(tmp.path().join("state.json"));
    let source = Source::new(
        &format!("{}/vol1/ch1.html", server.uri()),
        tmp.path().join("out"),
    )
    .unwrap();

    let report = engine_with(&store).run(&source).await.unwrap();

    assert_eq!(report.pages_saved, 2);
    assert_eq!(
        report.last_url,
        Some(format!("{}/vol2/ch2.html", server.uri()))
    );
}

#[tokio::test]
async fn test_engine_from_config_uses_custom_selectors_and_agent() {
    let server = MockServer::start().await;
    let tmp = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/p/1"))
        .and(header("user-agent", "ChainTest/1.0"))
        .respond_with(html(
            r#"<html><head><title>P1</title></head><body>
                <a rel="next" href="/p/ignored">Next</a>
                <a class="chapter-next" href="/p/2">Forward</a>
            </body></html>"#
                .to_string(),
        ))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/p/2", chapter("P2", None), 1).await;
    mount_page(&server, "/p/ignored", chapter("Ignored", None), 0).await;

    let mut config = Config::default();
    config.fetch.backoff_base_ms = 10;
    config.user_agent.header = "ChainTest/1.0".to_string();
    config.output.directory = tmp.path().join("out");
    config.output.state_file = tmp.path().join("state.json");
    config.links.next_selectors = vec!["a.chapter-next".to_string()];

    let engine = build_engine(&config).unwrap();
    let source = Source::new(&format!("{}/p/1", server.uri()), &config.output.directory).unwrap();

    let report = engine.run(&source).await.unwrap();

    assert_eq!(report.pages_saved, 2);
    assert!(tmp.path().join("out/P2.html").exists());
}

#[tokio::test]
async fn test_sources_share_one_table() {
    let server = MockServer::start().await;
    let tmp = TempDir::new().unwrap();

    mount_page(&server, "/x/1", chapter("X1", Some("/x/2")), 1).await;
    Mock::given(method("GET"))
        .and(path("/x/2"))
        .respond_with(ResponseTemplate::new(404))
        .expect(3)
        .mount(&server)
        .await;
    mount_page(&server, "/y/1", chapter("Y1", None), 1).await;

    let store = JsonProgressStore::new(tmp.path().join("state.json"));
    let x = Source::new(&format!("{}/x/1", server.uri()), tmp.path().join("x")).unwrap();
    let y = Source::new(&format!("{}/y/1", server.uri()), tmp.path().join("y")).unwrap();

    assert!(engine_with(&store).run(&x).await.is_err());
    engine_with(&store).run(&y).await.unwrap();

    // Finishing y must not disturb x's record
    let all = store.list_all().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(&all[0].0, x.id());

    let raw: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
    assert!(raw.get(x.id().as_str()).is_some());
    assert!(raw.get(y.id().as_str()).is_none());
}
