// src/source/kleinanzeigen.rs
//! kleinanzeigen.de search result pages.

use std::time::Duration;

use async_trait::async_trait;
use metrics::histogram;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};

use crate::config::HttpCfg;
use crate::error::{ExtractionError, Result, WatchError};
use crate::source::types::{CandidateRecord, Extracted, FetchedPage, ListingSource, Query};

static ARTICLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("#srchrslt-adtable > li > article").unwrap());
static PRICE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".aditem-main--middle--price-shipping--price").unwrap());
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("h2 a").unwrap());
static DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".aditem-main--middle--description").unwrap());
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

pub struct KleinanzeigenSource {
    client: Client,
    base_url: String,
}

impl KleinanzeigenSource {
    pub fn new(cfg: &HttpCfg) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&cfg.user_agent)
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| WatchError::config(format!("building HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ListingSource for KleinanzeigenSource {
    async fn fetch(&self, query: &Query) -> Result<FetchedPage> {
        let rsp = self
            .client
            .get(&query.url)
            .send()
            .await
            .map_err(|e| WatchError::network(&query.url, e))?;

        let status = rsp.status();
        if !status.is_success() {
            return Ok(FetchedPage::status(status));
        }

        let body = rsp
            .text()
            .await
            .map_err(|e| WatchError::network(&query.url, e))?;

        let t0 = std::time::Instant::now();
        let items = parse_results(&body, &self.base_url);
        histogram!("watcher_parse_ms").record(t0.elapsed().as_secs_f64() * 1000.0);

        tracing::debug!(url = %query.url, items = items.len(), "parsed search page");
        Ok(FetchedPage { status, items })
    }

    fn name(&self) -> &'static str {
        "kleinanzeigen"
    }
}

/// Extract listings from a search result page, in page order.
///
/// Articles without a `data-href` have no identity and are skipped.
/// Articles without a price are reported as [`Extracted::Broken`].
pub fn parse_results(html: &str, base_url: &str) -> Vec<Extracted> {
    let doc = Html::parse_document(html);
    let mut out = Vec::new();

    for article in doc.select(&ARTICLE) {
        let Some(identity) = article.value().attr("data-href") else {
            tracing::debug!("article without data-href skipped");
            continue;
        };
        let identity = identity.trim().to_string();
        let link = format!("{base_url}{identity}");

        let price = first_text(&article, &PRICE);
        let Some(price) = price else {
            out.push(Extracted::Broken(ExtractionError {
                identity,
                link,
                field: "price",
            }));
            continue;
        };

        let title = first_text(&article, &TITLE).unwrap_or_default();
        let description = match first_text(&article, &DESCRIPTION) {
            Some(d) if !title.is_empty() => format!("{title}: {d}"),
            Some(d) => d,
            None => title,
        };

        out.push(Extracted::Candidate(CandidateRecord {
            identity,
            link,
            display_price: Some(price),
            display_description: description,
        }));
    }

    out
}

/// Whitespace-collapsed text of the first match; `None` when absent or blank.
fn first_text(el: &ElementRef<'_>, sel: &Selector) -> Option<String> {
    let node = el.select(sel).next()?;
    let raw = node.text().collect::<Vec<_>>().join(" ");
    let text = RE_WS.replace_all(&raw, " ").trim().to_string();
    (!text.is_empty()).then_some(text)
}
