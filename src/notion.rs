use crate::config::NotionConfig;
use crate::models::Item;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

const NOTION_VERSION: &str = "2022-06-28";
const HIGHLIGHTS_HEADING: &str = "Highlights";
/// Notion rejects more than 100 children in one append.
const MAX_CHILDREN_PER_REQUEST: usize = 100;
/// Maximum length of a single rich text content string.
const MAX_RICH_TEXT_CHARS: usize = 2000;
const PAGE_SIZE: usize = 100;

#[derive(Debug)]
pub enum NotionError {
    InvalidToken,
    Http(String),
    Api { status: u16, message: String },
    PageNotFound(String),
    UnexpectedResponse(String),
}

impl std::fmt::Display for NotionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotionError::InvalidToken => write!(f, "NOTION_TOKEN is not a valid header value"),
            NotionError::Http(e) => write!(f, "Notion request failed: {}", e),
            NotionError::Api { status, message } => {
                write!(f, "Notion API returned {}: {}", status, message)
            }
            NotionError::PageNotFound(title) => {
                write!(f, "No Notion page titled '{}' in the database", title)
            }
            NotionError::UnexpectedResponse(e) => write!(f, "Unexpected Notion response: {}", e),
        }
    }
}

impl std::error::Error for NotionError {}

impl From<reqwest::Error> for NotionError {
    fn from(e: reqwest::Error) -> Self {
        NotionError::Http(e.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct Paged<T> {
    results: Vec<T>,
    #[serde(default)]
    has_more: bool,
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Page {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Block {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    heading_3: Option<TextBlock>,
}

#[derive(Debug, Deserialize)]
struct TextBlock {
    #[serde(default)]
    rich_text: Vec<RichText>,
}

#[derive(Debug, Deserialize)]
struct RichText {
    plain_text: Option<String>,
    text: Option<TextContent>,
}

#[derive(Debug, Deserialize)]
struct TextContent {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

impl Block {
    fn is_highlights_heading(&self) -> bool {
        if self.kind != "heading_3" {
            return false;
        }
        let Some(heading) = &self.heading_3 else {
            return false;
        };

        let text: String = heading
            .rich_text
            .iter()
            .filter_map(|rt| {
                rt.plain_text
                    .as_deref()
                    .or_else(|| rt.text.as_ref().map(|t| t.content.as_str()))
            })
            .collect();

        text.trim() == HIGHLIGHTS_HEADING
    }
}

pub struct NotionClient {
    http: Client,
    api_url: String,
    database_id: String,
    title_property: String,
}

impl NotionClient {
    pub fn new(config: &NotionConfig) -> Result<Self, NotionError> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.token))
            .map_err(|_| NotionError::InvalidToken)?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert("Notion-Version", HeaderValue::from_static(NOTION_VERSION));

        let http = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            api_url: config.api_url.clone(),
            database_id: config.database_id.clone(),
            title_property: config.title_property.clone(),
        })
    }

    /// Finds the page, appends the items under its Highlights heading and
    /// returns how many were added.
    pub fn export(&self, title: &str, items: &[Item]) -> Result<usize, NotionError> {
        if items.is_empty() {
            info!(title, "nothing to export to notion");
            return Ok(0);
        }

        let page_id = self.find_page(title)?;
        let heading_id = self.ensure_highlights_heading(&page_id)?;
        self.append_highlights(&heading_id, items)
    }

    pub fn find_page(&self, title: &str) -> Result<String, NotionError> {
        let url = format!("{}/databases/{}/query", self.api_url, self.database_id);
        let body = page_query(&self.title_property, title);

        let response: Paged<Page> = self.send(self.http.post(url).json(&body))?;

        response
            .results
            .into_iter()
            .next()
            .map(|page| page.id)
            .ok_or_else(|| NotionError::PageNotFound(title.to_string()))
    }

    pub fn ensure_highlights_heading(&self, page_id: &str) -> Result<String, NotionError> {
        let mut cursor: Option<String> = None;

        loop {
            let url = format!("{}/blocks/{}/children", self.api_url, page_id);
            let mut query = vec![("page_size", PAGE_SIZE.to_string())];
            if let Some(c) = &cursor {
                query.push(("start_cursor", c.clone()));
            }

            let children: Paged<Block> = self.send(self.http.get(url).query(&query))?;

            if let Some(heading) = children.results.iter().find(|b| b.is_highlights_heading()) {
                debug!(heading_id = %heading.id, "found highlights heading");
                return Ok(heading.id.clone());
            }

            match children.next_cursor {
                Some(next) if children.has_more => cursor = Some(next),
                _ => break,
            }
        }

        info!(page_id, "creating highlights heading");
        let created = self.append_children(page_id, vec![highlights_heading_block()])?;
        created
            .results
            .into_iter()
            .next()
            .map(|block| block.id)
            .ok_or_else(|| NotionError::UnexpectedResponse("append returned no blocks".to_string()))
    }

    pub fn append_highlights(&self, block_id: &str, items: &[Item]) -> Result<usize, NotionError> {
        let mut added = 0;
        for batch in items.chunks(MAX_CHILDREN_PER_REQUEST) {
            let children = batch.iter().map(|item| bullet_block(item.text())).collect();
            self.append_children(block_id, children)?;
            added += batch.len();
            debug!(added, total = items.len(), "appended batch to notion");
        }
        Ok(added)
    }

    fn append_children(&self, block_id: &str, children: Vec<Value>) -> Result<Paged<Block>, NotionError> {
        let url = format!("{}/blocks/{}/children", self.api_url, block_id);
        self.send(self.http.patch(url).json(&json!({ "children": children })))
    }

    fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, NotionError> {
        let response = request.send()?;
        let status = response.status();

        if !status.is_success() {
            let message = response
                .json::<ApiError>()
                .map(|e| e.message)
                .unwrap_or_else(|_| status.canonical_reason().unwrap_or("unknown error").to_string());
            return Err(NotionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .map_err(|e| NotionError::UnexpectedResponse(e.to_string()))
    }
}

fn page_query(title_property: &str, title: &str) -> Value {
    json!({
        "filter": {
            "property": title_property,
            "title": { "equals": title }
        }
    })
}

fn highlights_heading_block() -> Value {
    json!({
        "object": "block",
        "type": "heading_3",
        "heading_3": {
            "rich_text": [{ "type": "text", "text": { "content": HIGHLIGHTS_HEADING } }],
            "is_toggleable": true
        }
    })
}

fn bullet_block(text: &str) -> Value {
    let rich_text: Vec<Value> = split_rich_text(text)
        .into_iter()
        .map(|chunk| json!({ "type": "text", "text": { "content": chunk } }))
        .collect();

    json!({
        "object": "block",
        "type": "bulleted_list_item",
        "bulleted_list_item": { "rich_text": rich_text }
    })
}

/// Splits on char boundaries into pieces of at most `MAX_RICH_TEXT_CHARS`.
fn split_rich_text(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars
        .chunks(MAX_RICH_TEXT_CHARS)
        .map(|chunk| chunk.iter().collect())
        .collect()
}
