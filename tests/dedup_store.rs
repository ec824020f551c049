// tests/dedup_store.rs
use classifieds_watcher::dedup::{BoundedSeenStore, Deduplicator, InMemorySeenStore, SeenStore};
use classifieds_watcher::CandidateRecord;

fn cand(id: &str) -> CandidateRecord {
    CandidateRecord {
        identity: id.into(),
        link: format!("https://www.kleinanzeigen.de{id}"),
        display_price: None,
        display_description: String::new(),
    }
}

#[test]
fn repeated_identity_survives_many_batches_once() {
    let mut d = Deduplicator::default();
    let mut kept = 0;
    for _ in 0..10 {
        kept += d.filter_new(vec![cand("/i"), cand("/j")]).len();
    }
    assert_eq!(kept, 2);
    assert_eq!(d.len(), 2);
}

#[test]
fn seen_middle_item_is_dropped_in_order() {
    let mut d = Deduplicator::default();
    d.filter_new(vec![cand("/b")]);
    let out = d.filter_new(vec![cand("/a"), cand("/b"), cand("/c")]);
    let ids: Vec<_> = out.into_iter().map(|c| c.identity).collect();
    assert_eq!(ids, vec!["/a", "/c"]);
}

#[test]
fn identities_are_compared_verbatim() {
    let mut s = InMemorySeenStore::new();
    assert!(s.insert("/s-anzeige/a/1"));
    assert!(s.insert("/s-anzeige/a/1/"));
    assert!(s.insert("/S-ANZEIGE/a/1"));
    assert_eq!(s.len(), 3);
}

#[test]
fn bounded_store_behind_deduplicator() {
    let mut d = Deduplicator::new(Box::new(BoundedSeenStore::with_capacity(2)));
    assert_eq!(d.filter_new(vec![cand("/a"), cand("/b"), cand("/c")]).len(), 3);
    assert_eq!(d.len(), 2);
    // /a was evicted and counts as new again
    assert_eq!(d.filter_new(vec![cand("/a")]).len(), 1);
    assert!(!d.contains("/b"));
}
