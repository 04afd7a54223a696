//! # wb-api Handlers
//!
//! This module coordinates the flow between HTTP requests and the core.

use std::convert::Infallible;
use std::sync::Arc;

use actix_web::http::header::{CacheControl, CacheDirective};
use actix_web::web::{self, Bytes};
use actix_web::HttpResponse;
use futures_util::stream;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;
use wb_core::{
    AuthProvider, FetchRelay, Language, ListId, Vocabulary, VocabularyList, Word, WordDraft,
    WordId,
};

use crate::error::ApiError;
use crate::extract::Caller;

/// State shared across all Actix-web workers.
#[derive(Clone)]
pub struct AppState {
    pub vocab: Vocabulary,
    pub auth: Arc<dyn AuthProvider>,
    pub relay: Arc<dyn FetchRelay>,
}

type ApiResult = Result<HttpResponse, ApiError>;

#[derive(Debug, Deserialize)]
pub struct ListRequest {
    pub name: String,
    pub language: Language,
}

#[derive(Debug, Serialize)]
pub struct ListsResponse {
    pub lists: Vec<VocabularyList>,
    /// Combined message when a lazy legacy migration partly failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWordRequest {
    #[serde(flatten)]
    pub draft: WordDraft,
    /// The `imageUrl` the client loaded before editing; required so that a
    /// cleared image is never mistaken for an unchanged one.
    pub original_image_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayRequest {
    #[serde(default)]
    pub image_url: String,
}

fn created(id: &str) -> HttpResponse {
    HttpResponse::Created().json(json!({ "id": id }))
}

pub async fn dashboard(state: web::Data<AppState>, caller: Caller) -> ApiResult {
    let stats = state.vocab.dashboard.stats(&caller.0).await?;
    Ok(HttpResponse::Ok().json(stats))
}

/// Lists the caller's lists, migrating legacy words first when there are none.
pub async fn list_lists(state: web::Data<AppState>, caller: Caller) -> ApiResult {
    let (lists, report) = state.vocab.lists.list_lists_reporting(&caller.0).await?;
    let notice = report.and_then(|r| r.summary());
    Ok(HttpResponse::Ok().json(ListsResponse { lists, notice }))
}

pub async fn create_list(
    state: web::Data<AppState>,
    caller: Caller,
    body: web::Json<ListRequest>,
) -> ApiResult {
    let ListRequest { name, language } = body.into_inner();
    let id = state.vocab.lists.create_list(&caller.0, &name, language).await?;
    Ok(created(id.as_str()))
}

pub async fn get_list(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<String>,
) -> ApiResult {
    let list_id = ListId::new(path.into_inner());
    let list = state.vocab.lists.get_list(&caller.0, &list_id).await?;
    Ok(HttpResponse::Ok().json(list))
}

pub async fn update_list(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<String>,
    body: web::Json<ListRequest>,
) -> ApiResult {
    let list_id = ListId::new(path.into_inner());
    let ListRequest { name, language } = body.into_inner();
    state
        .vocab
        .lists
        .update_list(&caller.0, &list_id, &name, language)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn delete_list(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<String>,
) -> ApiResult {
    let list_id = ListId::new(path.into_inner());
    state.vocab.lists.delete_list(&caller.0, &list_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn list_words(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<String>,
) -> ApiResult {
    let list_id = ListId::new(path.into_inner());
    let words = state.vocab.words.fetch_words(&caller.0, &list_id).await?;
    Ok(HttpResponse::Ok().json(words))
}

pub async fn add_word(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<String>,
    body: web::Json<WordDraft>,
) -> ApiResult {
    let list_id = ListId::new(path.into_inner());
    let id = state
        .vocab
        .words
        .add_word(&caller.0, &list_id, body.into_inner())
        .await?;
    Ok(created(id.as_str()))
}

pub async fn update_word(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<(String, String)>,
    body: web::Json<UpdateWordRequest>,
) -> ApiResult {
    let (list_id, word_id) = path.into_inner();
    let UpdateWordRequest {
        draft,
        original_image_url,
    } = body.into_inner();
    state
        .vocab
        .words
        .update_word(
            &caller.0,
            &ListId::new(list_id),
            &WordId::new(word_id),
            draft,
            &original_image_url,
        )
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn delete_word(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<(String, String)>,
) -> ApiResult {
    let (list_id, word_id) = path.into_inner();
    state
        .vocab
        .words
        .delete_word(&caller.0, &ListId::new(list_id), &WordId::new(word_id))
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn remove_image(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<(String, String)>,
) -> ApiResult {
    let (list_id, word_id) = path.into_inner();
    state
        .vocab
        .words
        .remove_image(&caller.0, &ListId::new(list_id), &WordId::new(word_id))
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Streams the list's words as server-sent events: the current snapshot
/// first, then one event per change. The subscription is dropped together
/// with the response stream when the client disconnects.
pub async fn watch_words(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<String>,
) -> ApiResult {
    let list_id = ListId::new(path.into_inner());
    let feed = state.vocab.words.watch_words(&caller.0, &list_id).await?;
    let initial = feed.current();

    let events = stream::unfold((feed, Some(initial)), |(mut feed, pending)| async move {
        let words = match pending {
            Some(words) => words,
            None => feed.changed().await?,
        };
        let event = sse_event(&words)?;
        Some((Ok::<_, Infallible>(event), (feed, None)))
    });

    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(CacheControl(vec![CacheDirective::NoCache]))
        .streaming(events))
}

fn sse_event(words: &[Word]) -> Option<Bytes> {
    match serde_json::to_string(words) {
        Ok(json) => Some(Bytes::from(format!("data: {json}\n\n"))),
        Err(e) => {
            warn!(error = %e, "failed to encode word snapshot; closing feed");
            None
        }
    }
}

/// Server-side fetch of a remote image, re-hosted under the caller's
/// image folder. Answers `{ "downloadURL": ... }`.
pub async fn upload_image_from_url(
    state: web::Data<AppState>,
    caller: Caller,
    body: web::Json<RelayRequest>,
) -> ApiResult {
    let download_url = state
        .relay
        .upload_from_url(&caller.0, &body.image_url)
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "downloadURL": download_url })))
}
