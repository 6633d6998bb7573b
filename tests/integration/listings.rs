//! Listing crawl behavior across pages, categories and runs

use crate::common::{blank_page, end_of_results, listing_page, page_url, Scripted, ScriptedRenderer};
use games_scraper::config::CategoryTarget;
use games_scraper::crawler::{
    ItemRecord, ItemStream, ListingOutcome, ListingRun, ListingSettings, Orchestrator,
};
use games_scraper::state::{
    CategoryPhase, CrawlState, PageCursor, StateGuard, StateStore, SuspendReason,
};
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

fn settings(max_pages: u32) -> ListingSettings {
    ListingSettings {
        page_size: 12,
        max_pages_per_category: max_pages,
        scroll_script: "window.scrollTo(0, 2600)".to_string(),
        wait_timeout: Duration::from_secs(1),
    }
}

fn target(name: &str) -> CategoryTarget {
    CategoryTarget::new(
        name,
        Url::parse(&format!("https://store.example.com/category/{}/?snr=1_4_4", name)).unwrap(),
    )
}

fn store(dir: &TempDir) -> StateStore {
    StateStore::new(dir.path().join("state.json")).with_ids_export(dir.path().join("ids.json"))
}

/// Runs one listing crawl to completion and collects what it emitted
async fn run_listing(
    renderer: Arc<ScriptedRenderer>,
    targets: Vec<CategoryTarget>,
    store: StateStore,
    max_pages: u32,
) -> (Vec<ItemRecord>, ListingOutcome) {
    let guard = StateGuard::load(store).unwrap();
    let orchestrator =
        Orchestrator::new(renderer, settings(max_pages), CancellationToken::new()).unwrap();
    let mut run = orchestrator.run(targets, guard);

    let mut items = Vec::new();
    while let Some(item) = run.items.recv().await {
        items.push(item);
    }
    let outcome = run.handle.await.unwrap().unwrap();
    (items, outcome)
}

#[tokio::test]
async fn test_only_unseen_items_are_emitted() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);

    let mut state = CrawlState::new();
    for id in [1, 3, 5, 7, 9] {
        state.admit(id);
    }
    store.save(&mut state).unwrap();

    let renderer = Arc::new(
        ScriptedRenderer::new().page(&page_url("action", 0), listing_page(1..=12)),
    );
    let (items, outcome) = run_listing(renderer, vec![target("action")], store, 1).await;

    let ids: Vec<u64> = items.iter().map(|item| item.id).collect();
    assert_eq!(ids, vec![2, 4, 6, 8, 10, 11, 12]);
    assert!(items.iter().all(|item| item.category == "action"));
    assert_eq!(items[0].name, "Game 2");

    assert_eq!(outcome.state.seen_ids().len(), 12);
    assert_eq!(outcome.state.cursor("action"), PageCursor::Next(1));
    assert_eq!(outcome.report.items_emitted, 7);
    assert_eq!(outcome.report.duplicates_skipped, 5);
    assert_eq!(
        outcome.report.categories[0].phase,
        CategoryPhase::Suspended(SuspendReason::BudgetSpent)
    );
}

#[tokio::test]
async fn test_end_of_results_exhausts_category() {
    let dir = TempDir::new().unwrap();
    let renderer = Arc::new(
        ScriptedRenderer::new()
            .page(&page_url("rpg", 0), listing_page(100..103))
            .page(&page_url("rpg", 1), end_of_results()),
    );

    let (items, outcome) = run_listing(renderer.clone(), vec![target("rpg")], store(&dir), 4).await;

    assert_eq!(items.len(), 3);
    assert_eq!(renderer.requests().len(), 2);
    assert_eq!(outcome.state.cursor("rpg"), PageCursor::Exhausted);
    assert_eq!(outcome.report.categories[0].phase, CategoryPhase::Exhausted);

    let saved = fs::read_to_string(dir.path().join("state.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&saved).unwrap();
    assert_eq!(json["categories"]["rpg"], "exhausted");

    let ids: Vec<u64> =
        serde_json::from_str(&fs::read_to_string(dir.path().join("ids.json")).unwrap()).unwrap();
    assert_eq!(ids, vec![100, 101, 102]);
}

#[tokio::test]
async fn test_exhausted_category_is_never_requested() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let mut state = CrawlState::new();
    state.mark_exhausted("rpg");
    store.save(&mut state).unwrap();

    let renderer = Arc::new(
        ScriptedRenderer::new()
            .page(&page_url("rpg", 0), listing_page([1]))
            .page(&page_url("action", 0), end_of_results()),
    );
    let (items, outcome) = run_listing(
        renderer.clone(),
        vec![target("rpg"), target("action")],
        store,
        4,
    )
    .await;

    assert!(items.is_empty());
    assert_eq!(renderer.requests(), vec![page_url("action", 0)]);
    assert_eq!(outcome.report.categories[0].phase, CategoryPhase::Exhausted);
    assert_eq!(outcome.report.categories[0].pages_fetched, 0);
}

#[tokio::test]
async fn test_legacy_negative_cursor_is_exhausted() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("state.json"),
        r#"{"categories": {"rpg": -1, "action": 2}, "seen_ids": [5]}"#,
    )
    .unwrap();

    let renderer = Arc::new(ScriptedRenderer::new().page(&page_url("action", 2), end_of_results()));
    let (_, outcome) = run_listing(
        renderer.clone(),
        vec![target("rpg"), target("action")],
        store(&dir),
        4,
    )
    .await;

    assert_eq!(renderer.requests(), vec![page_url("action", 2)]);
    assert_eq!(outcome.state.cursor("rpg"), PageCursor::Exhausted);

    let saved = fs::read_to_string(dir.path().join("state.json")).unwrap();
    assert!(saved.contains(r#""rpg": "exhausted""#));
}

#[tokio::test]
async fn test_anomalous_page_rewinds_and_suspends() {
    let dir = TempDir::new().unwrap();
    let renderer = Arc::new(
        ScriptedRenderer::new()
            .page(&page_url("action", 0), listing_page(1..=12))
            .page(&page_url("action", 1), blank_page())
            .page(&page_url("rpg", 0), listing_page([50]))
            .page(&page_url("rpg", 1), end_of_results()),
    );

    let (items, outcome) = run_listing(
        renderer.clone(),
        vec![target("action"), target("rpg")],
        store(&dir),
        4,
    )
    .await;

    // The anomaly stops only its own category
    assert_eq!(items.len(), 13);
    assert_eq!(outcome.state.cursor("action"), PageCursor::Next(1));
    assert_eq!(
        outcome.report.categories[0].phase,
        CategoryPhase::Suspended(SuspendReason::Anomaly)
    );
    assert_eq!(outcome.report.categories[1].phase, CategoryPhase::Exhausted);

    assert_eq!(outcome.report.anomalies.len(), 1);
    let anomaly = &outcome.report.anomalies[0];
    assert_eq!(anomaly.category, "action");
    assert_eq!(anomaly.cursor, 1);
    assert_eq!(anomaly.address, page_url("action", 1));
    assert_eq!(anomaly.reason, SuspendReason::Anomaly);
}

#[tokio::test]
async fn test_fetch_failure_keeps_cursor_for_retry() {
    let dir = TempDir::new().unwrap();
    let renderer = Arc::new(
        ScriptedRenderer::new()
            .page(&page_url("action", 0), listing_page([1, 2]))
            .page(&page_url("action", 1), Scripted::Fail),
    );

    let (_, outcome) = run_listing(renderer, vec![target("action")], store(&dir), 4).await;

    assert_eq!(outcome.state.cursor("action"), PageCursor::Next(1));
    assert_ne!(outcome.state.cursor("action"), PageCursor::Exhausted);
    assert_eq!(outcome.report.anomalies[0].reason, SuspendReason::FetchFailed);
    assert_eq!(outcome.report.fetch_failures, 1);
}

#[tokio::test]
async fn test_resume_never_refetches_pages() {
    let dir = TempDir::new().unwrap();
    let renderer = Arc::new(
        ScriptedRenderer::new()
            .page(&page_url("action", 0), listing_page(1..=12))
            .page(&page_url("action", 1), listing_page(13..=24))
            .page(&page_url("action", 2), end_of_results()),
    );

    let (first, _) = run_listing(renderer.clone(), vec![target("action")], store(&dir), 1).await;
    let (second, _) = run_listing(renderer.clone(), vec![target("action")], store(&dir), 1).await;
    let (third, outcome) =
        run_listing(renderer.clone(), vec![target("action")], store(&dir), 1).await;
    let (fourth, _) = run_listing(renderer.clone(), vec![target("action")], store(&dir), 1).await;

    assert_eq!(first.len(), 12);
    assert_eq!(second.len(), 12);
    assert!(third.is_empty());
    assert!(fourth.is_empty());
    assert_eq!(outcome.state.cursor("action"), PageCursor::Exhausted);
    assert_eq!(
        renderer.requests(),
        vec![page_url("action", 0), page_url("action", 1), page_url("action", 2)]
    );
}

#[tokio::test]
async fn test_items_are_deduplicated_across_categories() {
    let dir = TempDir::new().unwrap();
    let renderer = Arc::new(
        ScriptedRenderer::new()
            .page(&page_url("action", 0), listing_page([1, 2, 3]))
            .page(&page_url("rpg", 0), listing_page([3, 4])),
    );

    let (items, _) = run_listing(
        renderer,
        vec![target("action"), target("rpg")],
        store(&dir),
        1,
    )
    .await;

    let ids: Vec<(u64, String)> = items.iter().map(|i| (i.id, i.category.clone())).collect();
    assert_eq!(
        ids,
        vec![
            (1, "action".to_string()),
            (2, "action".to_string()),
            (3, "action".to_string()),
            (4, "rpg".to_string()),
        ]
    );
}

/// Consumes a stream on its own task, returning the received ids
fn spawn_consumer(mut items: ItemStream) -> JoinHandle<Vec<u64>> {
    tokio::spawn(async move {
        let mut ids = Vec::new();
        while let Some(item) = items.recv().await {
            ids.push(item.id);
        }
        ids
    })
}

#[tokio::test]
async fn test_cancellation_saves_progress() {
    let dir = TempDir::new().unwrap();
    let renderer = Arc::new(
        ScriptedRenderer::new()
            .page(&page_url("action", 0), listing_page([1, 2]))
            .page(&page_url("action", 1), Scripted::Hang),
    );
    let cancel = CancellationToken::new();

    let guard = StateGuard::load(store(&dir)).unwrap();
    let orchestrator = Orchestrator::new(renderer.clone(), settings(4), cancel.clone()).unwrap();
    let ListingRun { items, handle } = orchestrator.run(vec![target("action")], guard);
    let consumer = spawn_consumer(items);

    // Wait for the second page to be in flight, then interrupt
    while renderer.requests().len() < 2 {
        renderer.started.notified().await;
    }
    cancel.cancel();

    assert_eq!(consumer.await.unwrap(), vec![1, 2]);
    let outcome = handle.await.unwrap().unwrap();
    assert!(outcome.report.cancelled);
    assert_eq!(
        outcome.report.categories[0].phase,
        CategoryPhase::Suspended(SuspendReason::Cancelled)
    );

    let saved: CrawlState = store(&dir).load().unwrap();
    assert_eq!(saved.seen_ids().len(), 2);
    assert_eq!(saved.cursor("action"), PageCursor::Next(2));
}

#[tokio::test]
async fn test_aborted_task_still_saves_state() {
    let dir = TempDir::new().unwrap();
    let renderer = Arc::new(
        ScriptedRenderer::new()
            .page(&page_url("action", 0), listing_page([7]))
            .page(&page_url("action", 1), Scripted::Hang),
    );

    let guard = StateGuard::load(store(&dir)).unwrap();
    let orchestrator =
        Orchestrator::new(renderer.clone(), settings(4), CancellationToken::new()).unwrap();
    let ListingRun { items, handle } = orchestrator.run(vec![target("action")], guard);
    let consumer = spawn_consumer(items);

    while renderer.requests().len() < 2 {
        renderer.started.notified().await;
    }

    handle.abort();
    assert!(handle.await.unwrap_err().is_cancelled());
    assert_eq!(consumer.await.unwrap(), vec![7]);

    let saved: CrawlState = store(&dir).load().unwrap();
    assert!(saved.is_seen(7));
    assert_eq!(saved.cursor("action"), PageCursor::Next(2));
}

#[tokio::test]
async fn test_dropped_consumer_leaves_unhandled_items_for_next_run() {
    let dir = TempDir::new().unwrap();
    let renderer = Arc::new(
        ScriptedRenderer::new().page(&page_url("action", 0), listing_page(1..=12)),
    );

    let guard = StateGuard::load(store(&dir)).unwrap();
    let orchestrator =
        Orchestrator::new(renderer.clone(), settings(1), CancellationToken::new()).unwrap();
    let ListingRun { mut items, handle } = orchestrator.run(vec![target("action")], guard);

    // The first item is handled once the second one is asked for
    assert_eq!(items.recv().await.map(|i| i.id), Some(1));
    assert_eq!(items.recv().await.map(|i| i.id), Some(2));
    drop(items);

    let outcome = handle.await.unwrap().unwrap();
    assert_eq!(outcome.state.seen_ids().iter().copied().collect::<Vec<_>>(), vec![1]);
    assert_eq!(outcome.state.cursor("action"), PageCursor::Next(0));
    assert_eq!(outcome.report.items_emitted, 1);
    assert_eq!(
        outcome.report.categories[0].phase,
        CategoryPhase::Suspended(SuspendReason::Cancelled)
    );

    let exported: Vec<u64> =
        serde_json::from_str(&fs::read_to_string(dir.path().join("ids.json")).unwrap()).unwrap();
    assert_eq!(exported, vec![1]);

    let (again, _) = run_listing(renderer, vec![target("action")], store(&dir), 1).await;
    let ids: Vec<u64> = again.iter().map(|item| item.id).collect();
    assert_eq!(ids, (2..=12).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_cancel_stops_category_while_consumer_stalls() {
    let dir = TempDir::new().unwrap();
    // More rows than the item channel can buffer
    let renderer = Arc::new(
        ScriptedRenderer::new()
            .page(&page_url("action", 0), listing_page(1..=70))
            .page(&page_url("action", 1), listing_page(71..=80)),
    );
    let cancel = CancellationToken::new();

    let guard = StateGuard::load(store(&dir)).unwrap();
    let orchestrator = Orchestrator::new(renderer.clone(), settings(4), cancel.clone()).unwrap();
    let ListingRun { items, handle } = orchestrator.run(vec![target("action")], guard);

    while renderer.requests().is_empty() {
        renderer.started.notified().await;
    }
    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();

    let received = spawn_consumer(items).await.unwrap();
    let outcome = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    assert!(received.len() < 70);
    assert_eq!(renderer.requests(), vec![page_url("action", 0)]);
    assert_eq!(
        outcome.report.categories[0].phase,
        CategoryPhase::Suspended(SuspendReason::Cancelled)
    );
    assert_eq!(
        outcome.state.seen_ids().iter().copied().collect::<Vec<_>>(),
        received
    );
    assert_eq!(outcome.state.cursor("action"), PageCursor::Next(0));

    let (rest, _) = run_listing(renderer, vec![target("action")], store(&dir), 1).await;
    let mut all: Vec<u64> = received;
    all.extend(rest.iter().map(|item| item.id));
    assert_eq!(all, (1..=70).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_rows_without_usable_links_suspend_category() {
    let dir = TempDir::new().unwrap();
    let unusable = Scripted::Html(
        r#"<html><body>
             <div class="salepreviewwidgets_SaleItemBrowserRow_y9MSd">
               <a href="/app/not-a-number/">Broken</a>
             </div>
           </body></html>"#
            .to_string(),
    );
    let renderer = Arc::new(
        ScriptedRenderer::new()
            .page(&page_url("action", 0), unusable.clone())
            .page(&page_url("action", 1), unusable),
    );

    let (items, outcome) = run_listing(renderer.clone(), vec![target("action")], store(&dir), 2).await;

    assert!(items.is_empty());
    assert_eq!(renderer.requests(), vec![page_url("action", 0)]);
    assert_eq!(outcome.state.cursor("action"), PageCursor::Next(0));
    assert_eq!(
        outcome.report.categories[0].phase,
        CategoryPhase::Suspended(SuspendReason::Anomaly)
    );
    assert_eq!(outcome.report.anomalies.len(), 1);
    assert_eq!(outcome.report.anomalies[0].cursor, 0);
    assert_eq!(outcome.report.anomalies[0].reason, SuspendReason::Anomaly);
}

#[tokio::test]
async fn test_relative_item_links_are_resolved() {
    let dir = TempDir::new().unwrap();
    let page = Scripted::Html(
        r#"<html><body>
             <div class="salepreviewwidgets_SaleItemBrowserRow_y9MSd">
               <a href="/app/5/Relative_Game/">Relative Game</a>
             </div>
           </body></html>"#
            .to_string(),
    );
    let renderer = Arc::new(ScriptedRenderer::new().page(&page_url("action", 0), page));

    let (items, outcome) = run_listing(renderer, vec![target("action")], store(&dir), 1).await;

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, 5);
    assert_eq!(items[0].address, "https://store.example.com/app/5/Relative_Game/");
    assert!(outcome.report.anomalies.is_empty());
    assert_eq!(outcome.state.cursor("action"), PageCursor::Next(1));
}
