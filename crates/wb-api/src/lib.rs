//! # wb-api
//!
//! The JSON HTTP layer for Wordbook. Handlers only translate between HTTP
//! and the core; every consistency rule lives in `wb-core`.

pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;

use actix_web::web;

pub use error::ApiError;
pub use extract::Caller;
pub use handlers::AppState;

/// Largest accepted JSON body; file images travel inline as data URLs.
pub const JSON_LIMIT: usize = 16 * 1024 * 1024;

/// Configures the routes for the vocabulary API.
///
/// # Developer Note
/// We use a scoped configuration to allow the main binary to mount
/// the API under different paths if needed (e.g., /api/v1/).
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().limit(JSON_LIMIT))
        .service(
            web::scope("")
                .route("/dashboard", web::get().to(handlers::dashboard))
                .route("/lists", web::get().to(handlers::list_lists))
                .route("/lists", web::post().to(handlers::create_list))
                .route("/lists/{list_id}", web::get().to(handlers::get_list))
                .route("/lists/{list_id}", web::put().to(handlers::update_list))
                .route("/lists/{list_id}", web::delete().to(handlers::delete_list))
                .route("/lists/{list_id}/words", web::get().to(handlers::list_words))
                .route("/lists/{list_id}/words", web::post().to(handlers::add_word))
                .route("/lists/{list_id}/words/live", web::get().to(handlers::watch_words))
                .route(
                    "/lists/{list_id}/words/{word_id}",
                    web::put().to(handlers::update_word),
                )
                .route(
                    "/lists/{list_id}/words/{word_id}",
                    web::delete().to(handlers::delete_word),
                )
                .route(
                    "/lists/{list_id}/words/{word_id}/image",
                    web::delete().to(handlers::remove_image),
                )
                .route(
                    "/relay/upload-image-from-url",
                    web::post().to(handlers::upload_image_from_url),
                ),
        );
}
