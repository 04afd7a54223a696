mod common;

use common::{user, Harness};
use wb_core::{AppError, Language, ListId, RequestContext};

#[tokio::test]
async fn created_list_is_listed() {
    let h = Harness::new();
    let l1 = h
        .vocab
        .lists
        .create_list(&user(), "핵심 표현", Language::Japanese)
        .await
        .unwrap();

    let lists = h.vocab.lists.list_lists(&user()).await.unwrap();
    assert_eq!(lists.len(), 1);
    assert_eq!(lists[0].id, l1);
    assert_eq!(lists[0].name, "핵심 표현");
    assert_eq!(lists[0].language, Language::Japanese);
}

#[tokio::test]
async fn blank_names_are_rejected() {
    let h = Harness::new();
    let err = h
        .vocab
        .lists
        .create_list(&user(), "   ", Language::English)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));
    assert!(h.vocab.lists.list_lists(&user()).await.unwrap().is_empty());

    let l1 = h.list("단어").await;
    let err = h
        .vocab
        .lists
        .update_list(&user(), &l1, "", Language::English)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));
}

#[tokio::test]
async fn lists_sort_by_name_and_allow_duplicates() {
    let h = Harness::new();
    for name in ["여행", "가족", "여행"] {
        h.list(name).await;
    }

    let names: Vec<String> = h
        .vocab
        .lists
        .list_lists(&user())
        .await
        .unwrap()
        .into_iter()
        .map(|l| l.name)
        .collect();
    assert_eq!(names, ["가족", "여행", "여행"]);
}

#[tokio::test]
async fn update_changes_name_and_language() {
    let h = Harness::new();
    let l1 = h.list("old").await;

    h.vocab
        .lists
        .update_list(&user(), &l1, "new", Language::English)
        .await
        .unwrap();

    let list = h.vocab.lists.get_list(&user(), &l1).await.unwrap();
    assert_eq!(list.name, "new");
    assert_eq!(list.language, Language::English);
}

#[tokio::test]
async fn unknown_lists_are_not_found() {
    let h = Harness::new();
    let missing = ListId::from("nope");

    let err = h
        .vocab
        .lists
        .update_list(&user(), &missing, "x", Language::Japanese)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(kind, id) if kind == "list" && id == "nope"));

    assert!(matches!(
        h.vocab.lists.get_list(&user(), &missing).await,
        Err(AppError::NotFound(..))
    ));
    assert!(matches!(
        h.vocab.lists.delete_list(&user(), &missing).await,
        Err(AppError::NotFound(..))
    ));
}

#[tokio::test]
async fn every_operation_requires_a_user() {
    let h = Harness::new();
    let anon = RequestContext::anonymous();

    assert!(matches!(
        h.vocab.lists.create_list(&anon, "x", Language::Japanese).await,
        Err(AppError::AuthRequired)
    ));
    assert!(matches!(
        h.vocab.lists.list_lists(&anon).await,
        Err(AppError::AuthRequired)
    ));
    assert!(matches!(
        h.vocab.dashboard.stats(&anon).await,
        Err(AppError::AuthRequired)
    ));
}

#[tokio::test]
async fn users_only_see_their_own_lists() {
    let h = Harness::new();
    h.list("mine").await;

    let other = RequestContext::authenticated("u2".into());
    assert!(h.vocab.lists.list_lists(&other).await.unwrap().is_empty());
}
