use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{db::Store, error::AppResult, middleware::auth::JwtKeys};

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub jwt: Arc<JwtKeys>,
}

impl AppState {
    pub fn new(store: Store, jwt: JwtKeys) -> Self {
        Self {
            store,
            jwt: Arc::new(jwt),
        }
    }

    /// Current database connection, or [`crate::error::AppError::Unavailable`].
    pub async fn orm(&self) -> AppResult<DatabaseConnection> {
        self.store.connection().await
    }
}
