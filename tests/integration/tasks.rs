//! Category discovery, detail crawl and rendered listings over HTTP

use games_scraper::config::{load_categories, CategoryTarget, RendererConfig, UserAgentConfig};
use games_scraper::crawler::{
    build_http_client, discover_categories, BrowserlessRenderer, DetailCrawler, GameDetail,
    HttpRenderer, ListingSettings, Orchestrator, PoliteRenderer,
};
use games_scraper::output::JsonLinesSink;
use games_scraper::robots::RobotsRules;
use games_scraper::state::{CrawlState, DetailState, PageCursor, StateGuard, StateStore};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn identity() -> UserAgentConfig {
    UserAgentConfig {
        user_agent: "TestBot/1.0".to_string(),
        accept_language: "es-ES,es;q=0.8".to_string(),
    }
}

#[tokio::test]
async fn test_discover_categories_writes_map() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><div id="genre_flyout">
                 <a class="popup_menu_item" href="/category/action/?snr=1_4_4__12">Acción</a>
                 <a class="popup_menu_item" href="/category/strategy/?snr=1_4_4__12">Estrategia</a>
                 <a class="popup_menu_item" href="/vr/">Realidad virtual</a>
               </div></body></html>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("categories.json");
    let index = Url::parse(&format!("{}/", server.uri())).unwrap();
    let renderer = HttpRenderer::new(build_http_client(&identity(), false).unwrap());

    let outcome = discover_categories(&renderer, &index, Some(output.as_path())).await.unwrap();
    assert_eq!(outcome.categories.len(), 2);
    assert_eq!(outcome.report.pages_fetched, 1);

    let saved = load_categories(&output).unwrap();
    assert_eq!(saved, outcome.categories);
    assert_eq!(saved["Acción"], format!("{}/category/action/", server.uri()));
}

#[tokio::test]
async fn test_empty_menu_fails_without_writing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body></body></html>"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("categories.json");
    let index = Url::parse(&format!("{}/", server.uri())).unwrap();
    let renderer = HttpRenderer::new(build_http_client(&identity(), false).unwrap());

    assert!(discover_categories(&renderer, &index, Some(output.as_path())).await.is_err());
    assert!(!output.exists());
}

fn detail_page(name: &str) -> String {
    format!(
        r#"<html><body>
             <div class="blockbg"><a>Todos los juegos</a></div>
             <div id="appHubAppName">{}</div>
           </body></html>"#,
        name
    )
}

#[tokio::test]
async fn test_detail_crawl_marks_ids_and_skips_them_next_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/app/10"))
        .and(header("cookie", "wants_mature_content=1; birthtime=786254401; lastagecheckage=1-0-1995"))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_page("Counter-Strike")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/app/20"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let store = StateStore::new(dir.path().join("details_state.json"));
    let details_path = dir.path().join("details.jsonl");
    let base = Url::parse(&format!("{}/", server.uri())).unwrap();
    let client = build_http_client(&identity(), true).unwrap();

    let crawler =
        DetailCrawler::new(HttpRenderer::new(client), base, CancellationToken::new()).unwrap();

    let mut sink = JsonLinesSink::open(&details_path).unwrap();
    let report = crawler
        .crawl(&[10, 20], StateGuard::load(store.clone()).unwrap(), &mut sink)
        .await
        .unwrap();
    assert_eq!(report.items_emitted, 1);
    assert_eq!(report.fetch_failures, 1);

    let state: DetailState = store.load().unwrap();
    assert!(state.is_crawled(10));
    assert!(state.is_crawled(20));

    // Both ids are already crawled: nothing is requested again
    let mut sink = JsonLinesSink::open(&details_path).unwrap();
    let report = crawler
        .crawl(&[10, 20], StateGuard::load(store.clone()).unwrap(), &mut sink)
        .await
        .unwrap();
    assert_eq!(report.pages_fetched, 0);

    let lines: Vec<GameDetail> = fs::read_to_string(&details_path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].id, 10);
    assert_eq!(lines[0].name.as_deref(), Some("Counter-Strike"));
}

#[tokio::test]
async fn test_rendered_listing_through_browserless() {
    let server = MockServer::start().await;
    let listing = "https://store.example.com/category/puzzle/";

    Mock::given(method("POST"))
        .and(path("/content"))
        .and(body_partial_json(serde_json::json!({
            "url": format!("{}?offset=0", listing),
            "addScriptTag": [{"content": "window.scrollTo(0, 2600)"}],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body>
                 <div class="salepreviewwidgets_SaleItemBrowserRow_a1"><a href="https://store.example.com/app/620/">Portal 2</a></div>
                 <div class="salepreviewwidgets_SaleItemBrowserRow_a1"><a href="https://store.example.com/app/400/">Portal</a></div>
               </body></html>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/content"))
        .and(body_partial_json(serde_json::json!({ "url": format!("{}?offset=12", listing) })))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><div class="saleitembrowser_EmptyResults_x">Nada</div></body></html>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let renderer = BrowserlessRenderer::new(
        &RendererConfig {
            endpoint: server.uri(),
            token: None,
        },
        &identity(),
    );
    let renderer = PoliteRenderer::new(
        renderer,
        Duration::from_millis(10),
        RobotsRules::allow_all(),
        "TestBot/1.0",
    );

    let dir = TempDir::new().unwrap();
    let store = StateStore::new(dir.path().join("state.json"));
    let settings = ListingSettings {
        page_size: 12,
        max_pages_per_category: 4,
        scroll_script: "window.scrollTo(0, 2600)".to_string(),
        wait_timeout: Duration::from_secs(5),
    };
    let orchestrator = Orchestrator::new(renderer, settings, CancellationToken::new()).unwrap();
    let targets = vec![CategoryTarget::new("puzzle", Url::parse(listing).unwrap())];

    let mut run = orchestrator.run(targets, StateGuard::load(store.clone()).unwrap());
    let mut ids = Vec::new();
    while let Some(item) = run.items.recv().await {
        ids.push(item.id);
    }
    run.handle.await.unwrap().unwrap();

    assert_eq!(ids, vec![620, 400]);
    let saved: CrawlState = store.load().unwrap();
    assert_eq!(saved.cursor("puzzle"), PageCursor::Exhausted);
}
