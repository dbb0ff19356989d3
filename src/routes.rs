use axum::Router;
use axum::routing::get;
use tower_cookies::CookieManagerLayer;
use tower_http::trace::TraceLayer;

use crate::app::AppState;
use crate::views;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(views::root))
        .route(
            "/accounts/login/",
            get(views::login_form).post(views::login),
        )
        .route("/logout/", get(views::logout).post(views::logout))
        .route(
            "/clients/",
            get(views::client_list).post(views::client_create),
        )
        .route(
            "/clients/{id}/",
            get(views::client_detail).post(views::client_update),
        )
        .route(
            "/entries/",
            get(views::entry_list).post(views::entry_create),
        )
        .route(
            "/projects/",
            get(views::project_list).post(views::project_create),
        )
        .route(
            "/projects/{id}/",
            get(views::project_detail).post(views::project_update),
        )
        .fallback(views::not_found)
        .layer(CookieManagerLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
