use std::sync::Arc;

use axum::{response::IntoResponse, routing::get, Extension, Router};

use crate::{
    middleware::Viewer,
    views::{PageInfo, SimplePage},
    AppState, Result,
};

pub fn pages_handler() -> Router {
    Router::new()
        .route("/about/", get(about))
        .route("/rules/", get(rules))
}

async fn about(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
) -> Result<impl IntoResponse> {
    app_state.templates.render(
        "pages/about",
        &SimplePage {
            page_info: PageInfo::new("About", viewer.user()),
        },
    )
}

async fn rules(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(viewer): Extension<Viewer>,
) -> Result<impl IntoResponse> {
    app_state.templates.render(
        "pages/rules",
        &SimplePage {
            page_info: PageInfo::new("Rules", viewer.user()),
        },
    )
}
