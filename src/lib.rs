// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod clock;
pub mod config;
pub mod dedup;
pub mod error;
pub mod failure_monitor;
pub mod heartbeat;
pub mod metrics;
pub mod notify;
pub mod poller;
pub mod source;
pub mod supervisor;

// ---- Re-exports for stable public API ----
pub use crate::error::{ExtractionError, WatchError};
pub use crate::notify::{Notification, NotificationKind, Notifier, NotifierMux};
pub use crate::poller::{Poller, PollerCfg, RoundReport};
pub use crate::source::{CandidateRecord, Extracted, FetchedPage, ListingSource, Query};
pub use crate::supervisor::Supervisor;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides the default filter; `LOG_FORMAT=json` switches to
/// JSON lines.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("classifieds_watcher=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}
