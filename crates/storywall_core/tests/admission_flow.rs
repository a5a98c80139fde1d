use std::sync::{Arc, Barrier};
use std::thread;
use storywall_core::admission::{InMemoryRateWindowStore, RateWindowStore};
use storywall_core::db::open_db;
use storywall_core::{
    Admission, AdmissionController, DenyReason, ManualClock, NoteDraft, PostNoteError,
    QuotaConsistency, QuotaPolicy, RateDecision, RateLimitConfig, RateLimiter, RoomDimensions,
    SqliteNoteRepository, WallService,
};

fn controller(
    config: RateLimitConfig,
    quota: QuotaPolicy,
) -> (AdmissionController, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(5_000_000));
    let limiter = RateLimiter::in_memory(config, clock.clone());
    (AdmissionController::new(limiter, quota), clock)
}

fn draft(content: &str) -> NoteDraft {
    NoteDraft {
        content: content.to_string(),
        wall: Some("back".to_string()),
        color: "blue".to_string(),
        ..NoteDraft::default()
    }
}

#[test]
fn eleven_checks_in_one_window_deny_the_last() {
    let (admission, _clock) = controller(RateLimitConfig::default(), QuotaPolicy::default());
    for _ in 0..10 {
        assert_eq!(admission.check_admission_with_count("o", 0), Admission::Allow);
    }
    assert!(matches!(
        admission.check_admission_with_count("o", 0),
        Admission::Deny(DenyReason::RateLimited { .. })
    ));
}

#[test]
fn elapsed_window_resets_regardless_of_prior_count() {
    let (admission, clock) = controller(RateLimitConfig::default(), QuotaPolicy::default());
    for _ in 0..25 {
        admission.check_admission_with_count("o", 0);
    }
    clock.advance(60_001);
    assert_eq!(admission.check_admission_with_count("o", 0), Admission::Allow);
}

#[test]
fn racing_first_requests_observe_distinct_counts() {
    for _ in 0..50 {
        let store = Arc::new(InMemoryRateWindowStore::new());
        let barrier = Arc::new(Barrier::new(2));
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    store.record_hit("fresh-origin", 1_000, 60_000).request_count
                })
            })
            .collect();

        let mut counts: Vec<u32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        counts.sort_unstable();
        assert_eq!(counts, vec![1, 2]);
    }
}

#[test]
fn concurrent_checks_never_undercount() {
    let clock = Arc::new(ManualClock::new(0));
    let limiter = Arc::new(RateLimiter::in_memory(
        RateLimitConfig {
            limit: 40,
            ..RateLimitConfig::default()
        },
        clock,
    ));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let limiter = Arc::clone(&limiter);
            thread::spawn(move || {
                (0..10)
                    .filter(|_| limiter.check("shared").is_allowed())
                    .count()
            })
        })
        .collect();

    let allowed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(allowed, 40);
    assert!(matches!(
        limiter.check("shared"),
        RateDecision::Limited { count: 81, .. }
    ));
}

#[test]
fn post_note_enforces_quota_after_rate_limit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wall.db");
    let (admission, _clock) = controller(
        RateLimitConfig {
            limit: 2,
            ..RateLimitConfig::default()
        },
        QuotaPolicy::default(),
    );

    let mut conn = open_db(&path).unwrap();
    let repo = SqliteNoteRepository::try_new(&mut conn).unwrap();
    let mut service = WallService::new(
        repo,
        &admission,
        storywall_core::config::DEFAULT_GRID_COLUMNS,
        RoomDimensions::default(),
    );

    let created = service.post_note("203.0.113.9", &draft("first")).unwrap();
    assert_eq!(created.content, "first");

    let second = service.post_note("203.0.113.9", &draft("second")).unwrap_err();
    assert!(matches!(second, PostNoteError::QuotaExceeded { cap: 1 }));

    let third = service.post_note("203.0.113.9", &draft("third")).unwrap_err();
    assert!(third.is_retryable(), "expected rate limit, got {third}");

    assert_eq!(service.list_notes().unwrap().len(), 1);
}

#[test]
fn invalid_drafts_do_not_consume_rate_budget() {
    let dir = tempfile::tempdir().unwrap();
    let (admission, _clock) = controller(
        RateLimitConfig {
            limit: 1,
            ..RateLimitConfig::default()
        },
        QuotaPolicy::default(),
    );

    let mut conn = open_db(dir.path().join("wall.db")).unwrap();
    let repo = SqliteNoteRepository::try_new(&mut conn).unwrap();
    let mut service = WallService::new(
        repo,
        &admission,
        storywall_core::config::DEFAULT_GRID_COLUMNS,
        RoomDimensions::default(),
    );

    let err = service.post_note("o", &draft("   ")).unwrap_err();
    assert!(matches!(err, PostNoteError::Validation(_)));
    assert!(service.post_note("o", &draft("valid")).is_ok());
}

#[test]
fn atomic_mode_enforces_cap_inside_store() {
    let dir = tempfile::tempdir().unwrap();
    let (admission, _clock) = controller(
        RateLimitConfig::default(),
        QuotaPolicy {
            cap: 2,
            consistency: QuotaConsistency::Atomic,
        },
    );

    let mut conn = open_db(dir.path().join("wall.db")).unwrap();
    let repo = SqliteNoteRepository::try_new(&mut conn).unwrap();
    let mut service = WallService::new(
        repo,
        &admission,
        storywall_core::config::DEFAULT_GRID_COLUMNS,
        RoomDimensions::default(),
    );

    service.post_note("o", &draft("one")).unwrap();
    service.post_note("o", &draft("two")).unwrap();
    let err = service.post_note("o", &draft("three")).unwrap_err();
    assert!(matches!(err, PostNoteError::QuotaExceeded { cap: 2 }));
}

#[test]
fn atomic_mode_holds_cap_across_concurrent_connections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wall.db");
    drop(open_db(&path).unwrap());

    let (admission, _clock) = controller(
        RateLimitConfig {
            limit: 100,
            ..RateLimitConfig::default()
        },
        QuotaPolicy {
            cap: 1,
            consistency: QuotaConsistency::Atomic,
        },
    );
    let admission = Arc::new(admission);
    let barrier = Arc::new(Barrier::new(4));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let admission = Arc::clone(&admission);
            let barrier = Arc::clone(&barrier);
            let path = path.clone();
            thread::spawn(move || {
                let mut conn = open_db(&path).unwrap();
                let repo = SqliteNoteRepository::try_new(&mut conn).unwrap();
                let mut service = WallService::new(
                    repo,
                    &admission,
                    storywall_core::config::DEFAULT_GRID_COLUMNS,
                    RoomDimensions::default(),
                );
                barrier.wait();
                service
                    .post_note("same-origin", &draft(&format!("attempt {i}")))
                    .is_ok()
            })
        })
        .collect();

    let successes = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();
    assert_eq!(successes, 1);
}
