pub mod queries;
pub mod results;
pub mod search;
pub mod zip;

use axum::Router;
use std::sync::Arc;

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(search::routes())
        .merge(queries::routes())
        .merge(zip::routes())
        .merge(results::routes())
}
