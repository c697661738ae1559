use axum::response::IntoResponse;

use crate::GIT_COMMIT_HASH;

pub async fn root() -> impl IntoResponse {
    format!(
        "{} {} ({})\n",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        GIT_COMMIT_HASH
    )
}
