// src/source/types.rs
use regex::Regex;
use reqwest::StatusCode;

use crate::error::{ExtractionError, Result};

/// A configured search. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct Query {
    pub url: String,
    /// Case-insensitive; a match suppresses the listing.
    pub exclude: Option<Regex>,
}

impl Query {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            exclude: None,
        }
    }

    pub fn with_exclude(mut self, re: Regex) -> Self {
        self.exclude = Some(re);
        self
    }

    /// True when the exclusion pattern matches the listing path or its
    /// description. The site host in `link` is not considered.
    pub fn excludes(&self, item: &Extracted) -> bool {
        let Some(re) = &self.exclude else {
            return false;
        };
        match item {
            Extracted::Candidate(c) => {
                re.is_match(&c.identity) || re.is_match(&c.display_description)
            }
            Extracted::Broken(b) => re.is_match(&b.identity),
        }
    }
}

/// One listing surfaced by a single fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRecord {
    /// Stable key, e.g. the listing path.
    pub identity: String,
    pub link: String,
    pub display_price: Option<String>,
    pub display_description: String,
}

/// Page item in page order: either a usable candidate or a broken listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted {
    Candidate(CandidateRecord),
    Broken(ExtractionError),
}

impl Extracted {
    pub fn identity(&self) -> &str {
        match self {
            Extracted::Candidate(c) => &c.identity,
            Extracted::Broken(b) => &b.identity,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: StatusCode,
    pub items: Vec<Extracted>,
}

impl FetchedPage {
    pub fn ok(items: Vec<Extracted>) -> Self {
        Self {
            status: StatusCode::OK,
            items,
        }
    }

    pub fn status(status: StatusCode) -> Self {
        Self {
            status,
            items: Vec::new(),
        }
    }
}

/// Fetch collaborator: one GET plus extraction per query.
#[async_trait::async_trait]
pub trait ListingSource: Send + Sync {
    async fn fetch(&self, query: &Query) -> Result<FetchedPage>;
    fn name(&self) -> &'static str;
}
