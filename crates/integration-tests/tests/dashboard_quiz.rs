mod common;

use std::time::Duration;

use common::{u1, user, Harness};
use serde_json::json;
use wb_core::{paths, to_document, AppError, DocumentStore, ListId, WordDraft};

#[tokio::test]
async fn stats_count_lists_words_and_recent_lists() {
    let h = Harness::new();
    let mut ids = Vec::new();
    for name in ["a", "b", "c", "d"] {
        ids.push(h.list(name).await);
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    h.word(&ids[0], WordDraft::new("猫", "고양이")).await;
    h.word(&ids[3], WordDraft::new("犬", "개")).await;
    h.word(&ids[3], WordDraft::new("鳥", "새")).await;

    let stats = h.vocab.dashboard.stats(&user()).await.unwrap();
    assert_eq!(stats.total_lists, 4);
    assert_eq!(stats.total_words, 3);
    let recent: Vec<&str> = stats.recent_lists.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(recent, ["d", "c", "b"]);
}

#[tokio::test]
async fn stats_never_migrate() {
    let h = Harness::new();
    h.docs
        .set(
            &paths::legacy_words(&u1()).doc("猫"),
            to_document(&json!({ "word": "猫", "meaning": "고양이", "language": "japanese" })).unwrap(),
        )
        .await
        .unwrap();

    let stats = h.vocab.dashboard.stats(&user()).await.unwrap();
    assert_eq!(stats.total_lists, 0);
    assert_eq!(h.docs.count(&paths::legacy_words(&u1())).await, 1);
}

#[tokio::test]
async fn quiz_walks_through_the_list() {
    let h = Harness::new();
    let l1 = h.list("quiz").await;
    h.word(&l1, WordDraft::new("猫", "고양이")).await;
    tokio::time::sleep(Duration::from_millis(2)).await;
    h.word(&l1, WordDraft::new("犬", "개")).await;

    let mut quiz = h.vocab.start_quiz(&user(), &l1).await.unwrap();
    assert_eq!(quiz.progress(), (1, 2));
    assert_eq!(quiz.current().unwrap().word, "猫");

    assert!(quiz.answer(true));
    assert!(quiz.is_revealed());
    quiz.next();
    assert_eq!(quiz.current().unwrap().word, "犬");

    quiz.answer(false);
    quiz.next();
    assert!(quiz.is_finished());
    assert_eq!(quiz.score(), 1);

    quiz.restart();
    assert_eq!(quiz.progress(), (1, 2));
    assert_eq!(quiz.score(), 0);
}

#[tokio::test]
async fn quiz_needs_words_and_a_list() {
    let h = Harness::new();
    let empty = h.list("empty").await;

    assert!(matches!(
        h.vocab.start_quiz(&user(), &empty).await,
        Err(AppError::ValidationError(_))
    ));
    assert!(matches!(
        h.vocab.start_quiz(&user(), &ListId::from("gone")).await,
        Err(AppError::NotFound(..))
    ));
}
