// src/source/mod.rs
pub mod kleinanzeigen;
pub mod types;

pub use kleinanzeigen::KleinanzeigenSource;
pub use types::{CandidateRecord, Extracted, FetchedPage, ListingSource, Query};
