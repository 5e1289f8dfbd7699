use std::sync::Arc;

use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use crates::domain::repositories::catalog::MasterclassCatalog;
use serde_json::json;
use tracing::error;

use crate::axum_http::error_responses::AppError;
use crate::axum_http::http_serve::AppClients;

pub fn routes(clients: Arc<AppClients>) -> Router {
    Router::new()
        .route("/", get(list_masterclasses))
        .with_state(Arc::clone(&clients.calendar))
}

pub async fn list_masterclasses<M>(
    State(catalog): State<Arc<M>>,
) -> Result<impl IntoResponse, AppError>
where
    M: MasterclassCatalog + Send + Sync,
{
    let masterclasses = catalog.list_masterclasses().await.map_err(|err| {
        error!(error = ?err, "masterclass catalog listing failed");
        AppError::Internal(err)
    })?;

    Ok(Json(json!({ "masterclasses": masterclasses })))
}
