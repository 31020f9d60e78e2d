use tutor_auth::domain::types::{CODE_TTL_SECS, CodePurpose, CodeStatus};
use tutor_auth::error::AuthServiceError;
use tutor_auth::usecase::code::{
    RequestCodeInput, RequestCodeUseCase, ResendCodeInput, ResendCodeUseCase,
};
use tutor_auth::usecase::login::{VerifyLoginInput, VerifyLoginUseCase};

use crate::helpers::{
    FakeClock, MockCodeRepo, MockUserRepo, RecordingDelivery, TEST_CHAT_ID, statuses, test_store,
    test_user, unlinked_user,
};

fn request_usecase(
    users: MockUserRepo,
    repo: &MockCodeRepo,
    clock: &FakeClock,
    delivery: RecordingDelivery,
) -> RequestCodeUseCase<MockUserRepo, MockCodeRepo, RecordingDelivery, FakeClock> {
    RequestCodeUseCase {
        users,
        store: test_store(repo, clock),
        delivery,
    }
}

#[tokio::test]
async fn should_deliver_login_code_to_linked_chat() {
    let user = test_user();
    let repo = MockCodeRepo::empty();
    let clock = FakeClock::new();
    let delivery = RecordingDelivery::default();
    let uc = request_usecase(
        MockUserRepo::new(vec![user.clone()]),
        &repo,
        &clock,
        delivery.clone(),
    );

    let issued = uc
        .execute(RequestCodeInput {
            email: user.email.clone(),
            purpose: CodePurpose::Login,
        })
        .await
        .unwrap();

    assert_eq!(issued.user_id, user.id);
    assert_eq!(issued.expires_in, CODE_TTL_SECS);
    let sent = delivery.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, TEST_CHAT_ID);
    assert_eq!(sent[0].1, CodePurpose::Login);
    let stored = repo.codes_handle().lock().unwrap()[0].code.clone();
    assert_eq!(sent[0].2, stored);
}

#[tokio::test]
async fn should_return_not_found_when_email_unknown() {
    let repo = MockCodeRepo::empty();
    let uc = request_usecase(
        MockUserRepo::empty(),
        &repo,
        &FakeClock::new(),
        RecordingDelivery::default(),
    );

    let result = uc
        .execute(RequestCodeInput {
            email: "nobody@example.com".to_owned(),
            purpose: CodePurpose::Login,
        })
        .await;

    assert!(
        matches!(result, Err(AuthServiceError::UserNotFound)),
        "expected UserNotFound, got {result:?}"
    );
    assert!(repo.codes_handle().lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_refuse_to_issue_without_linked_chat() {
    let user = unlinked_user();
    let repo = MockCodeRepo::empty();
    let uc = request_usecase(
        MockUserRepo::new(vec![user.clone()]),
        &repo,
        &FakeClock::new(),
        RecordingDelivery::default(),
    );

    let result = uc
        .execute(RequestCodeInput {
            email: user.email,
            purpose: CodePurpose::Login,
        })
        .await;

    assert!(
        matches!(result, Err(AuthServiceError::DeliveryChannelMissing)),
        "expected DeliveryChannelMissing, got {result:?}"
    );
    assert!(repo.codes_handle().lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_report_delivery_failure_and_keep_code() {
    let user = test_user();
    let repo = MockCodeRepo::empty();
    let uc = request_usecase(
        MockUserRepo::new(vec![user.clone()]),
        &repo,
        &FakeClock::new(),
        RecordingDelivery::failing(),
    );

    let result = uc
        .execute(RequestCodeInput {
            email: user.email.clone(),
            purpose: CodePurpose::Login,
        })
        .await;

    assert!(matches!(result, Err(AuthServiceError::DeliveryFailed)));
    assert_eq!(
        statuses(&repo, user.id, CodePurpose::Login),
        vec![CodeStatus::Active]
    );
}

#[tokio::test]
async fn should_resend_and_supersede_previous_code() {
    let user = test_user();
    let users = MockUserRepo::new(vec![user.clone()]);
    let repo = MockCodeRepo::empty();
    let clock = FakeClock::new();
    let delivery = RecordingDelivery::default();

    request_usecase(users.clone(), &repo, &clock, delivery.clone())
        .execute(RequestCodeInput {
            email: user.email.clone(),
            purpose: CodePurpose::Login,
        })
        .await
        .unwrap();

    let resend = ResendCodeUseCase {
        users,
        store: test_store(&repo, &clock),
        delivery: delivery.clone(),
    };
    resend
        .execute(ResendCodeInput {
            user_id: user.id,
            purpose: CodePurpose::Login,
        })
        .await
        .unwrap();

    assert_eq!(delivery.sent.lock().unwrap().len(), 2);
    assert_eq!(
        statuses(&repo, user.id, CodePurpose::Login),
        vec![CodeStatus::Superseded, CodeStatus::Active]
    );
}

#[tokio::test]
async fn should_verify_delivered_login_code_once() {
    let user = test_user();
    let repo = MockCodeRepo::empty();
    let clock = FakeClock::new();
    let delivery = RecordingDelivery::default();
    request_usecase(
        MockUserRepo::new(vec![user.clone()]),
        &repo,
        &clock,
        delivery.clone(),
    )
    .execute(RequestCodeInput {
        email: user.email.clone(),
        purpose: CodePurpose::Login,
    })
    .await
    .unwrap();

    let verify = VerifyLoginUseCase {
        store: test_store(&repo, &clock),
    };
    let code = delivery.last_code();

    let user_id = verify
        .execute(VerifyLoginInput {
            user_id: user.id,
            code: code.clone(),
        })
        .await
        .unwrap();
    assert_eq!(user_id, user.id);

    let replay = verify
        .execute(VerifyLoginInput {
            user_id: user.id,
            code,
        })
        .await;
    assert!(
        matches!(replay, Err(AuthServiceError::InvalidCode)),
        "expected InvalidCode, got {replay:?}"
    );
}

#[tokio::test]
async fn should_reject_expired_login_code() {
    let user = test_user();
    let repo = MockCodeRepo::empty();
    let clock = FakeClock::new();
    let store = test_store(&repo, &clock);
    let code = store.issue(user.id, CodePurpose::Login).await.unwrap();
    clock.advance(301);

    let result = VerifyLoginUseCase { store }
        .execute(VerifyLoginInput {
            user_id: user.id,
            code,
        })
        .await;

    assert!(matches!(result, Err(AuthServiceError::InvalidCode)));
}
