// tests/common/mod.rs
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use classifieds_watcher::error::Result;
use classifieds_watcher::{
    CandidateRecord, ExtractionError, Extracted, FetchedPage, ListingSource, Notification,
    NotificationKind, Notifier, NotifierMux, Poller, PollerCfg, Query, WatchError,
};
use reqwest::StatusCode;

pub enum Step {
    Page(Vec<Extracted>),
    Status(StatusCode),
    NetErr,
    Err(WatchError),
    Hang,
    Panic(&'static str),
}

/// Source replaying a fixed script of fetch outcomes; empty pages afterwards.
pub struct ScriptedSource {
    steps: Mutex<VecDeque<Step>>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ListingSource for ScriptedSource {
    async fn fetch(&self, query: &Query) -> Result<FetchedPage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            None => Ok(FetchedPage::ok(vec![])),
            Some(Step::Page(items)) => Ok(FetchedPage::ok(items)),
            Some(Step::Status(s)) => Ok(FetchedPage::status(s)),
            Some(Step::NetErr) => Err(WatchError::network(&query.url, "connection refused")),
            Some(Step::Err(e)) => Err(e),
            Some(Step::Hang) => {
                std::future::pending::<()>().await;
                unreachable!()
            }
            Some(Step::Panic(msg)) => panic!("{msg}"),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Notifier channel that remembers every message.
#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<Notification>>>);

impl Recorder {
    pub fn messages(&self) -> Vec<String> {
        self.0.lock().unwrap().iter().map(|n| n.message.clone()).collect()
    }

    pub fn kinds(&self) -> Vec<NotificationKind> {
        self.0.lock().unwrap().iter().map(|n| n.kind).collect()
    }

    pub fn count_containing(&self, needle: &str) -> usize {
        self.messages().iter().filter(|m| m.contains(needle)).count()
    }

    pub fn mux(&self) -> Arc<NotifierMux> {
        Arc::new(NotifierMux::new(
            vec![Box::new(self.clone())],
            Duration::from_secs(5),
        ))
    }
}

#[async_trait::async_trait]
impl Notifier for Recorder {
    async fn send(&self, n: &Notification) -> anyhow::Result<()> {
        self.0.lock().unwrap().push(n.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

pub fn cand(id: &str, desc: &str) -> Extracted {
    Extracted::Candidate(CandidateRecord {
        identity: id.to_string(),
        link: format!("https://www.kleinanzeigen.de{id}"),
        display_price: Some("25 €".to_string()),
        display_description: desc.to_string(),
    })
}

pub fn broken(id: &str) -> Extracted {
    Extracted::Broken(ExtractionError {
        identity: id.to_string(),
        link: format!("https://www.kleinanzeigen.de{id}"),
        field: "price",
    })
}

pub fn query(url: &str) -> Query {
    Query::new(url)
}

pub fn query_excluding(url: &str, pattern: &str) -> Query {
    let re = regex::RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .unwrap();
    Query::new(url).with_exclude(re)
}

/// No sleeps between queries or rounds.
pub fn fast_cfg() -> PollerCfg {
    PollerCfg {
        query_delay: Duration::ZERO,
        round_delay: Duration::ZERO,
        fetch_timeout: Duration::from_secs(20),
    }
}

pub fn poller(queries: Vec<Query>, source: Arc<dyn ListingSource>, mux: Arc<NotifierMux>) -> Poller {
    Poller::new(queries.into(), source, mux, fast_cfg())
}
