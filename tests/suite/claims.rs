//! End-to-end credential claiming against the flat-file and SQLite backends.

use std::fs;
use std::sync::{Arc, Barrier};
use std::thread;

use wiseacre_store::{ClaimStore, FlatFileBackend, SqliteBackend};
use wiseacre_types::{AuthOutcome, AuthStatus, ClaimantLabel, CredentialToken};

use crate::common::Fixture;

fn label(s: &str) -> ClaimantLabel {
    ClaimantLabel::new(s).unwrap()
}

#[test]
fn empty_store_reports_not_found() {
    let fx = Fixture::new();
    let store = ClaimStore::new(FlatFileBackend::new(fx.store_path()));
    let outcome = store.authenticate("12345", &label("alice")).unwrap();
    assert_eq!(outcome.status(), AuthStatus::NotFound);
}

#[test]
fn first_claim_wins_and_discloses_holder() {
    let fx = Fixture::new();
    let store = ClaimStore::new(FlatFileBackend::new(fx.store_path()));

    assert!(store.provision("12345").unwrap());
    assert!(!store.provision(" 12345\n").unwrap());

    assert_eq!(store.authenticate("12345", &label("alice")).unwrap(), AuthOutcome::Granted);
    let second = store.authenticate("12345", &label("bob")).unwrap();
    assert_eq!(second.status(), AuthStatus::AlreadyClaimed);
    assert_eq!(second.existing_claimant(), Some(&label("alice")));

    // A fresh handle on the same file sees the claim.
    let reopened = ClaimStore::new(FlatFileBackend::new(fx.store_path()));
    let third = reopened.authenticate("12345", &label("carol")).unwrap();
    assert_eq!(third.existing_claimant(), Some(&label("alice")));
}

#[test]
fn stats_after_three_provisions_and_one_claim() {
    let fx = Fixture::new();
    let store = ClaimStore::new(FlatFileBackend::new(fx.store_path()));
    for id in ["111", "222", "333"] {
        assert!(store.provision(id).unwrap());
    }
    store.authenticate("222", &label("alice")).unwrap();

    let stats = store.stats().unwrap();
    assert_eq!((stats.total, stats.free), (3, 2));
    assert_eq!(stats.claimed(), 1);
}

#[test]
fn file_stores_only_digests() {
    let fx = Fixture::new();
    let store = ClaimStore::new(FlatFileBackend::new(fx.store_path()));
    store.provision("12345").unwrap();
    store.authenticate("12345", &label("alice")).unwrap();

    let content = fs::read_to_string(fx.store_path()).unwrap();
    assert!(!content.contains("12345:"));
    let expected = format!("{}:занят@alice", CredentialToken::from_raw("12345"));
    assert_eq!(content.trim_end(), expected);
}

#[test]
fn legacy_file_is_honoured() {
    let fx = Fixture::new();
    let free = CredentialToken::from_raw("100");
    let taken = CredentialToken::from_raw("200");
    fs::write(
        fx.store_path(),
        format!("{free}:свободен\n\n{taken}:занят\n"),
    )
    .unwrap();

    let store = ClaimStore::new(FlatFileBackend::new(fx.store_path()));
    let outcome = store.authenticate("200", &label("alice")).unwrap();
    assert_eq!(outcome, AuthOutcome::AlreadyClaimed { claimant: None });
    assert_eq!(store.authenticate("100", &label("alice")).unwrap(), AuthOutcome::Granted);
    assert_eq!(store.stats().unwrap().free, 0);
}

#[test]
fn concurrent_claims_across_handles_grant_once() {
    let fx = Fixture::new();
    let store = Arc::new(ClaimStore::new(FlatFileBackend::new(fx.store_path())));
    store.provision("777").unwrap();

    let threads = 16;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                store
                    .authenticate("777", &label(&format!("user_{i}")))
                    .unwrap()
            })
        })
        .collect();

    let outcomes: Vec<AuthOutcome> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners: Vec<usize> = outcomes
        .iter()
        .enumerate()
        .filter(|(_, o)| o.is_success())
        .map(|(i, _)| i)
        .collect();
    assert_eq!(winners.len(), 1);

    let holder = label(&format!("user_{}", winners[0]));
    for outcome in outcomes.iter().filter(|o| !o.is_success()) {
        assert_eq!(outcome.existing_claimant(), Some(&holder));
    }
}

#[test]
fn sqlite_backend_behaves_like_flat_file() {
    let fx = Fixture::new();
    let db = fx.root().join("data").join("claims.db");
    let store = ClaimStore::new(
        SqliteBackend::open(&db, std::time::Duration::from_secs(2)).unwrap(),
    );

    let report = store
        .provision_many(["111", "222", "", "222", "333"])
        .unwrap();
    assert_eq!((report.added, report.skipped), (3, 1));

    assert_eq!(store.authenticate("111", &label("alice")).unwrap(), AuthOutcome::Granted);
    assert_eq!(
        store.authenticate("111", &label("bob")).unwrap().existing_claimant(),
        Some(&label("alice"))
    );
    drop(store);

    let reopened = ClaimStore::new(
        SqliteBackend::open(&db, std::time::Duration::from_secs(2)).unwrap(),
    );
    let stats = reopened.stats().unwrap();
    assert_eq!((stats.total, stats.free), (3, 2));
}
