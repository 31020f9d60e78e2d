use std::sync::Arc;

use futures::future::join_all;

use tutor_auth::domain::types::{CODE_TTL_SECS, CodePurpose, CodeStatus};
use tutor_auth::error::AuthServiceError;

use crate::helpers::{FakeClock, MockCodeRepo, statuses, test_store, test_user};

#[tokio::test]
async fn should_issue_six_digit_active_code() {
    let repo = MockCodeRepo::empty();
    let clock = FakeClock::new();
    let store = test_store(&repo, &clock);
    let user = test_user();

    let code = store.issue(user.id, CodePurpose::Login).await.unwrap();

    assert_eq!(code.len(), 6);
    assert!(code.bytes().all(|b| b.is_ascii_digit()));
    let codes = repo.codes_handle();
    let codes = codes.lock().unwrap();
    assert_eq!(codes.len(), 1);
    assert_eq!(codes[0].status, CodeStatus::Active);
    assert_eq!(
        (codes[0].expires_at - codes[0].issued_at).num_seconds(),
        CODE_TTL_SECS
    );
}

#[tokio::test]
async fn should_accept_code_only_once() {
    let repo = MockCodeRepo::empty();
    let clock = FakeClock::new();
    let store = test_store(&repo, &clock);
    let user = test_user();

    let code = store.issue(user.id, CodePurpose::Login).await.unwrap();

    assert!(store.validate(user.id, &code, CodePurpose::Login).await.unwrap());
    assert!(!store.validate(user.id, &code, CodePurpose::Login).await.unwrap());
    assert_eq!(
        statuses(&repo, user.id, CodePurpose::Login),
        vec![CodeStatus::Used]
    );
}

#[tokio::test]
async fn should_reject_code_after_expiry() {
    let repo = MockCodeRepo::empty();
    let clock = FakeClock::new();
    let store = test_store(&repo, &clock);
    let user = test_user();

    let code = store.issue(user.id, CodePurpose::Login).await.unwrap();
    clock.advance(CODE_TTL_SECS + 1);

    assert!(!store.validate(user.id, &code, CodePurpose::Login).await.unwrap());
    // Expired codes are rejected, not consumed.
    assert_eq!(
        statuses(&repo, user.id, CodePurpose::Login),
        vec![CodeStatus::Active]
    );
}

#[tokio::test]
async fn should_accept_code_at_expiry_boundary() {
    let repo = MockCodeRepo::empty();
    let clock = FakeClock::new();
    let store = test_store(&repo, &clock);
    let user = test_user();

    let code = store.issue(user.id, CodePurpose::Login).await.unwrap();
    clock.advance(CODE_TTL_SECS);

    assert!(store.validate(user.id, &code, CodePurpose::Login).await.unwrap());
}

#[tokio::test]
async fn should_supersede_previous_code_on_reissue() {
    let repo = MockCodeRepo::empty();
    let clock = FakeClock::new();
    let store = test_store(&repo, &clock);
    let user = test_user();

    let first = store.issue(user.id, CodePurpose::Login).await.unwrap();
    let second = store.resend(user.id, CodePurpose::Login).await.unwrap();

    assert_eq!(
        statuses(&repo, user.id, CodePurpose::Login),
        vec![CodeStatus::Superseded, CodeStatus::Active]
    );
    if first != second {
        assert!(!store.validate(user.id, &first, CodePurpose::Login).await.unwrap());
    }
    assert!(store.validate(user.id, &second, CodePurpose::Login).await.unwrap());
}

#[tokio::test]
async fn should_keep_purposes_independent() {
    let repo = MockCodeRepo::empty();
    let clock = FakeClock::new();
    let store = test_store(&repo, &clock);
    let user = test_user();

    let login = store.issue(user.id, CodePurpose::Login).await.unwrap();
    store.issue(user.id, CodePurpose::Recovery).await.unwrap();

    assert_eq!(
        statuses(&repo, user.id, CodePurpose::Login),
        vec![CodeStatus::Active]
    );
    // A login code never satisfies a recovery check, even with the same digits.
    let recovery_matches_login = repo
        .codes_handle()
        .lock()
        .unwrap()
        .iter()
        .any(|c| c.purpose == CodePurpose::Recovery && c.code == login);
    if !recovery_matches_login {
        assert!(!store.validate(user.id, &login, CodePurpose::Recovery).await.unwrap());
    }
    assert!(store.validate(user.id, &login, CodePurpose::Login).await.unwrap());
}

#[tokio::test]
async fn should_reject_malformed_input_without_error() {
    let repo = MockCodeRepo::empty();
    let clock = FakeClock::new();
    let store = test_store(&repo, &clock);
    let user = test_user();
    store.issue(user.id, CodePurpose::Login).await.unwrap();

    for input in ["", "12345", "1234567", "abcdef", " 12345"] {
        assert!(!store.validate(user.id, input, CodePurpose::Login).await.unwrap());
    }
    assert_eq!(
        statuses(&repo, user.id, CodePurpose::Login),
        vec![CodeStatus::Active]
    );
}

#[tokio::test]
async fn should_allow_exactly_one_concurrent_validation() {
    let repo = MockCodeRepo::empty();
    let clock = FakeClock::new();
    let store = test_store(&repo, &clock);
    let user = test_user();
    let code = store.issue(user.id, CodePurpose::Login).await.unwrap();

    let results = join_all((0..16).map(|_| store.validate(user.id, &code, CodePurpose::Login))).await;

    let accepted = results
        .into_iter()
        .map(Result::unwrap)
        .filter(|ok| *ok)
        .count();
    assert_eq!(accepted, 1);
}

#[tokio::test]
async fn should_leave_one_active_code_after_concurrent_issues() {
    let repo = MockCodeRepo::empty();
    let clock = FakeClock::new();
    let store = Arc::new(test_store(&repo, &clock));
    let user = test_user();
    let user_id = user.id;

    let tasks = (0..8).map(|i| {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            if i % 2 == 0 {
                store.issue(user_id, CodePurpose::Login).await
            } else {
                store.resend(user_id, CodePurpose::Login).await
            }
        })
    });
    let issued: Vec<String> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    let all = statuses(&repo, user.id, CodePurpose::Login);
    assert_eq!(all.len(), 8);
    assert_eq!(
        all.iter().filter(|s| **s == CodeStatus::Active).count(),
        1,
        "exactly one code may stay active"
    );

    let mut accepted = 0;
    for code in &issued {
        if store.validate(user.id, code, CodePurpose::Login).await.unwrap() {
            accepted += 1;
        }
    }
    assert_eq!(accepted, 1, "only the surviving code validates");
}

#[tokio::test]
async fn should_invalidate_active_code_with_mark_used() {
    let repo = MockCodeRepo::empty();
    let clock = FakeClock::new();
    let store = test_store(&repo, &clock);
    let user = test_user();

    let code = store.issue(user.id, CodePurpose::Login).await.unwrap();

    assert_eq!(store.mark_used(user.id, CodePurpose::Login).await.unwrap(), 1);
    assert_eq!(store.mark_used(user.id, CodePurpose::Login).await.unwrap(), 0);
    assert!(!store.validate(user.id, &code, CodePurpose::Login).await.unwrap());
}

#[tokio::test]
async fn should_surface_storage_failure_as_error() {
    let repo = MockCodeRepo::unavailable();
    let clock = FakeClock::new();
    let store = test_store(&repo, &clock);
    let user = test_user();

    let result = store.validate(user.id, "123456", CodePurpose::Login).await;

    assert!(
        matches!(result, Err(AuthServiceError::StorageUnavailable(_))),
        "expected StorageUnavailable, got {result:?}"
    );
}

#[tokio::test]
async fn should_walk_through_login_lifecycle() {
    let repo = MockCodeRepo::empty();
    let clock = FakeClock::new();
    let store = test_store(&repo, &clock);
    let user = test_user();

    // Expired code is useless; a fresh one works exactly once.
    let stale = store.issue(user.id, CodePurpose::Login).await.unwrap();
    clock.advance(CODE_TTL_SECS + 1);
    assert!(!store.validate(user.id, &stale, CodePurpose::Login).await.unwrap());

    let fresh = store.resend(user.id, CodePurpose::Login).await.unwrap();
    clock.advance(60);
    assert!(store.validate(user.id, &fresh, CodePurpose::Login).await.unwrap());
    assert!(!store.validate(user.id, &fresh, CodePurpose::Login).await.unwrap());

    assert_eq!(
        statuses(&repo, user.id, CodePurpose::Login),
        vec![CodeStatus::Superseded, CodeStatus::Used]
    );
}
