use std::sync::Arc;

use tutor_auth::infra::telegram::LinkAccountHandler;
use tutor_telegram::UpdateHandler;
use tutor_telegram::types::{Chat, Message, Update};

use crate::helpers::{FakeBot, MockUserRepo, unlinked_user};

const CHAT_ID: i64 = 777;

fn update(kind: &str, text: &str) -> Update {
    Update {
        update_id: 1,
        message: Some(Message {
            message_id: 10,
            chat: Chat {
                id: CHAT_ID,
                kind: kind.to_owned(),
                username: None,
            },
            from: None,
            text: Some(text.to_owned()),
            date: 1_772_355_600,
        }),
    }
}

#[tokio::test]
async fn should_link_chat_for_valid_start_token() {
    let user = unlinked_user();
    let users = MockUserRepo::new(vec![user.clone()]).with_link_token("tok-1", user.id);
    let bot = Arc::new(FakeBot::default());
    let handler = LinkAccountHandler::new(users.clone(), bot.clone());

    handler.handle(update("private", "/start tok-1")).await.unwrap();

    assert_eq!(users.user(user.id).unwrap().telegram_chat_id, Some(CHAT_ID));
    assert!(users.link_tokens.lock().unwrap().is_empty(), "token must be single use");
    let messages = bot.messages.lock().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].0, CHAT_ID);
    assert!(messages[0].1.contains(&user.email));
}

#[tokio::test]
async fn should_reply_expired_for_unknown_token() {
    let user = unlinked_user();
    let users = MockUserRepo::new(vec![user.clone()]);
    let bot = Arc::new(FakeBot::default());
    let handler = LinkAccountHandler::new(users.clone(), bot.clone());

    handler.handle(update("private", "/start gone")).await.unwrap();

    assert_eq!(users.user(user.id).unwrap().telegram_chat_id, None);
    let messages = bot.messages.lock().unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].1.contains("expired"));
}

#[tokio::test]
async fn should_ignore_group_chats_and_plain_text() {
    let user = unlinked_user();
    let users = MockUserRepo::new(vec![user.clone()]).with_link_token("tok-1", user.id);
    let bot = Arc::new(FakeBot::default());
    let handler = LinkAccountHandler::new(users.clone(), bot.clone());

    handler.handle(update("group", "/start tok-1")).await.unwrap();
    handler.handle(update("private", "hello")).await.unwrap();
    handler
        .handle(Update {
            update_id: 2,
            message: None,
        })
        .await
        .unwrap();

    assert_eq!(users.user(user.id).unwrap().telegram_chat_id, None);
    assert!(bot.messages.lock().unwrap().is_empty());
}
