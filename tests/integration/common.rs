//! Shared fixtures: listing markup and a scripted renderer

use async_trait::async_trait;
use games_scraper::crawler::{PageRenderer, RenderRequest};
use games_scraper::FetchError;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::Notify;

/// How the scripted renderer answers one address
#[derive(Debug, Clone)]
pub enum Scripted {
    Html(String),
    Fail,
    /// Never completes; used to cancel a run mid-fetch
    Hang,
}

/// Renderer answering from a fixed script and recording every request
#[derive(Default)]
pub struct ScriptedRenderer {
    pages: HashMap<String, Scripted>,
    requests: Mutex<Vec<String>>,
    pub started: Notify,
}

impl ScriptedRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, address: &str, response: Scripted) -> Self {
        self.pages.insert(address.to_string(), response);
        self
    }

    /// Addresses requested so far, in order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageRenderer for ScriptedRenderer {
    async fn render(&self, request: &RenderRequest) -> Result<String, FetchError> {
        let address = request.address.to_string();
        self.requests.lock().unwrap().push(address.clone());
        self.started.notify_one();

        match self.pages.get(&address) {
            Some(Scripted::Html(html)) => Ok(html.clone()),
            Some(Scripted::Hang) => std::future::pending().await,
            Some(Scripted::Fail) | None => Err(FetchError::Renderer {
                url: address,
                message: "HTTP 500: scripted failure".to_string(),
            }),
        }
    }
}

/// One listing row for a game id
pub fn row(id: u64) -> String {
    format!(
        r#"<div class="salepreviewwidgets_SaleItemBrowserRow_y9MSd">
             <a href="https://store.example.com/app/{id}/Game_{id}/"><img src="https://cdn.example.com/{id}.jpg"></a>
             <div class="salepreviewwidgets_StoreSaleWidgetTitle_3jI46">Game {id}</div>
             <div class="salepreviewwidgets_StoreSalePriceBox_Wh0L8">{id},99€</div>
           </div>"#
    )
}

/// A rendered listing page holding the given ids
pub fn listing_page(ids: impl IntoIterator<Item = u64>) -> Scripted {
    let rows: String = ids.into_iter().map(row).collect();
    Scripted::Html(format!("<html><body><div id=\"list\">{}</div></body></html>", rows))
}

/// The page shown past the last game of a category
pub fn end_of_results() -> Scripted {
    Scripted::Html(
        r#"<html><body><div class="saleitembrowser_EmptyResults_3_IxA">No hay más resultados</div></body></html>"#
            .to_string(),
    )
}

/// A render that produced neither rows nor the end marker
pub fn blank_page() -> Scripted {
    Scripted::Html("<html><body><div class=\"throbber\"></div></body></html>".to_string())
}

/// Listing address of page `cursor` of a category with 12 items per page
pub fn page_url(category: &str, cursor: u32) -> String {
    format!(
        "https://store.example.com/category/{}/?offset={}",
        category,
        cursor * 12
    )
}
