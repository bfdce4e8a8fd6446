pub mod health;
pub mod search;

use crate::state::AppState;
use axum::Router;

pub fn configure(state: AppState) -> Router {
    Router::new()
        .merge(search::routes(state))
        .merge(health::routes())
}
