// src/bin/notify_demo.rs
//! Sends one test message through every channel configured in the
//! environment (log only when none are set). Handy for checking credentials.

use std::time::Duration;

use classifieds_watcher::{Notification, NotificationKind, NotifierMux};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let mux = NotifierMux::from_env(Duration::from_secs(15));
    let n = Notification::new(
        NotificationKind::Test,
        "classifieds-watcher test notification",
    );
    let delivered = mux.notify(&n).await;

    println!(
        "notify-demo done: channels={:?} delivered={delivered}",
        mux.channel_names()
    );
}
