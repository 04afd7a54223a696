mod common;

use common::{u1, user, Harness};
use serde_json::json;
use wb_core::{paths, to_document, DocumentStore, Language, Migrator, WordId};

async fn seed_legacy(h: &Harness, id: &str, fields: serde_json::Value) {
    h.docs
        .set(&paths::legacy_words(&u1()).doc(id), to_document(&fields).unwrap())
        .await
        .expect("Failed to seed legacy word");
}

#[tokio::test]
async fn legacy_words_move_into_one_list_per_language() {
    let h = Harness::new();
    seed_legacy(
        &h,
        "猫",
        json!({
            "word": "猫",
            "meaning": "고양이",
            "language": "japanese",
            "partOfSpeech": "noun",
            "imageUrl": "memory://blobs/wordImages/u1/猫",
            "createdAt": "2023-03-01T09:00:00Z",
        }),
    )
    .await;
    seed_legacy(&h, "犬", json!({ "word": "犬", "meaning": "개", "language": "japanese" })).await;
    seed_legacy(&h, "hello", json!({ "word": "hello", "meaning": "안녕", "language": "english" })).await;

    let (lists, report) = h.vocab.lists.list_lists_reporting(&user()).await.unwrap();
    let report = report.expect("migration should report");
    assert_eq!(report.moved(), 3);
    assert_eq!(report.summary(), None);

    let names: Vec<&str> = lists.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, ["기본 영어 단어장", "기본 일본어 단어장"]);
    assert_eq!(h.docs.count(&paths::legacy_words(&u1())).await, 0);

    let japanese = lists.iter().find(|l| l.language == Language::Japanese).unwrap();
    let cat = h
        .docs
        .get(&paths::word(&u1(), &japanese.id, &WordId::from("猫")))
        .await
        .unwrap()
        .expect("word keeps its id");
    assert_eq!(cat.fields["partOfSpeech"], "noun");
    assert_eq!(cat.fields["imageUrl"], "memory://blobs/wordImages/u1/猫");
    assert_eq!(cat.fields["createdAt"], "2023-03-01T09:00:00Z");

    let words = h.vocab.words.fetch_words(&user(), &japanese.id).await.unwrap();
    assert_eq!(words.len(), 2);
}

#[tokio::test]
async fn second_run_moves_nothing() {
    let h = Harness::new();
    seed_legacy(&h, "hello", json!({ "word": "hello", "meaning": "안녕", "language": "english" })).await;

    let (first, _) = h.vocab.lists.list_lists_reporting(&user()).await.unwrap();
    assert_eq!(first.len(), 1);

    // A list exists now, so later legacy data is left alone.
    seed_legacy(&h, "bye", json!({ "word": "bye", "meaning": "잘 가", "language": "english" })).await;
    let (second, report) = h.vocab.lists.list_lists_reporting(&user()).await.unwrap();
    assert!(report.is_none());
    assert_eq!(second, first);
    assert_eq!(h.docs.count(&paths::legacy_words(&u1())).await, 1);
    assert_eq!(h.vocab.words.fetch_words(&user(), &first[0].id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn rerunning_the_routine_directly_is_a_no_op() {
    let h = Harness::new();
    seed_legacy(&h, "猫", json!({ "word": "猫", "meaning": "고양이", "language": "japanese" })).await;

    let migrator = Migrator::new(h.docs.clone());
    assert_eq!(migrator.run(&u1()).await.moved(), 1);

    let again = migrator.run(&u1()).await;
    assert!(again.is_empty());
    assert_eq!(h.docs.count(&paths::lists(&u1())).await, 1);
}

#[tokio::test]
async fn a_manual_list_suppresses_migration() {
    let h = Harness::new();
    h.list("mine").await;
    seed_legacy(&h, "猫", json!({ "word": "猫", "meaning": "고양이", "language": "japanese" })).await;

    let lists = h.vocab.lists.list_lists(&user()).await.unwrap();
    assert_eq!(lists.len(), 1);
    assert_eq!(h.docs.count(&paths::legacy_words(&u1())).await, 1);
}

#[tokio::test]
async fn one_failing_language_does_not_stop_the_other() {
    let h = Harness::new();
    seed_legacy(&h, "猫", json!({ "word": "猫", "meaning": "고양이", "language": "japanese" })).await;
    seed_legacy(&h, "broken", json!({ "word": 5, "language": "japanese" })).await;
    seed_legacy(&h, "hello", json!({ "word": "hello", "meaning": "안녕", "language": "english" })).await;

    let (lists, report) = h.vocab.lists.list_lists_reporting(&user()).await.unwrap();
    let report = report.unwrap();

    assert_eq!(lists.len(), 1);
    assert_eq!(lists[0].language, Language::English);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].language, Language::Japanese);

    // Combined banner mentions both outcomes.
    let summary = report.summary().unwrap();
    assert!(summary.contains("japanese"));
    assert!(summary.contains("기본 영어 단어장"));

    // The japanese batch never committed.
    assert_eq!(h.docs.count(&paths::legacy_words(&u1())).await, 2);
}

#[tokio::test]
async fn legacy_words_without_timestamps_get_one() {
    let h = Harness::new();
    seed_legacy(&h, "hello", json!({ "word": "hello", "meaning": "안녕", "language": "english" })).await;

    let lists = h.vocab.lists.list_lists(&user()).await.unwrap();
    let words = h.vocab.words.fetch_words(&user(), &lists[0].id).await.unwrap();
    assert_eq!(words[0].id, WordId::from("hello"));
    assert!(words[0].created_at <= chrono::Utc::now());
}
