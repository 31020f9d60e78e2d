use tutor_auth::domain::types::{CodePurpose, CodeStatus};
use tutor_auth::error::AuthServiceError;
use tutor_auth::usecase::code::{ResendCodeInput, ResendCodeUseCase};
use tutor_auth::usecase::recovery::{CompleteRecoveryInput, CompleteRecoveryUseCase};

use crate::helpers::{
    FakeClock, MockCodeRepo, MockUserRepo, RecordingDelivery, statuses, test_store, test_user,
};

#[tokio::test]
async fn should_invalidate_login_code_after_recovery() {
    let user = test_user();
    let repo = MockCodeRepo::empty();
    let clock = FakeClock::new();
    let store = test_store(&repo, &clock);

    let login = store.issue(user.id, CodePurpose::Login).await.unwrap();
    let recovery = store.issue(user.id, CodePurpose::Recovery).await.unwrap();

    let uc = CompleteRecoveryUseCase {
        store: test_store(&repo, &clock),
    };
    let user_id = uc
        .execute(CompleteRecoveryInput {
            user_id: user.id,
            code: recovery,
        })
        .await
        .unwrap();

    assert_eq!(user_id, user.id);
    assert_eq!(
        statuses(&repo, user.id, CodePurpose::Login),
        vec![CodeStatus::Used]
    );
    assert_eq!(
        statuses(&repo, user.id, CodePurpose::Recovery),
        vec![CodeStatus::Used]
    );
    assert!(!store.validate(user.id, &login, CodePurpose::Login).await.unwrap());
}

#[tokio::test]
async fn should_reject_login_code_for_recovery() {
    let user = test_user();
    let repo = MockCodeRepo::empty();
    let clock = FakeClock::new();
    let store = test_store(&repo, &clock);
    let login = store.issue(user.id, CodePurpose::Login).await.unwrap();

    let result = CompleteRecoveryUseCase { store }
        .execute(CompleteRecoveryInput {
            user_id: user.id,
            code: login,
        })
        .await;

    assert!(
        matches!(result, Err(AuthServiceError::InvalidCode)),
        "expected InvalidCode, got {result:?}"
    );
    // A failed recovery attempt leaves the login code usable.
    assert_eq!(
        statuses(&repo, user.id, CodePurpose::Login),
        vec![CodeStatus::Active]
    );
}

#[tokio::test]
async fn should_reject_expired_recovery_code() {
    let user = test_user();
    let repo = MockCodeRepo::empty();
    let clock = FakeClock::new();
    let store = test_store(&repo, &clock);
    let recovery = store.issue(user.id, CodePurpose::Recovery).await.unwrap();
    clock.advance(301);

    let result = CompleteRecoveryUseCase { store }
        .execute(CompleteRecoveryInput {
            user_id: user.id,
            code: recovery,
        })
        .await;

    assert!(matches!(result, Err(AuthServiceError::InvalidCode)));
}

#[tokio::test]
async fn should_complete_recovery_with_resent_code_only() {
    let user = test_user();
    let repo = MockCodeRepo::empty();
    let clock = FakeClock::new();
    let delivery = RecordingDelivery::default();
    let store = test_store(&repo, &clock);
    let first = store.issue(user.id, CodePurpose::Recovery).await.unwrap();

    ResendCodeUseCase {
        users: MockUserRepo::new(vec![user.clone()]),
        store: test_store(&repo, &clock),
        delivery: delivery.clone(),
    }
    .execute(ResendCodeInput {
        user_id: user.id,
        purpose: CodePurpose::Recovery,
    })
    .await
    .unwrap();

    let resent = delivery.last_code();
    assert_eq!(delivery.sent.lock().unwrap()[0].1, CodePurpose::Recovery);
    assert_eq!(
        statuses(&repo, user.id, CodePurpose::Recovery),
        vec![CodeStatus::Superseded, CodeStatus::Active]
    );

    let uc = CompleteRecoveryUseCase { store };
    if first != resent {
        let stale = uc
            .execute(CompleteRecoveryInput {
                user_id: user.id,
                code: first,
            })
            .await;
        assert!(matches!(stale, Err(AuthServiceError::InvalidCode)));
    }
    uc.execute(CompleteRecoveryInput {
        user_id: user.id,
        code: resent,
    })
    .await
    .unwrap();
}
