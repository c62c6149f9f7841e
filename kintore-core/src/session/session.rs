use std::sync::Arc;

use anyhow::Result;
use sqlx::SqlitePool;

use crate::db;
use crate::error::ActionError;
use crate::llm::LlmInterface;
use crate::menu::{self, MenuEntry, MenuRequest, WorkoutMenu};

pub struct Session {
    pub db_pool: SqlitePool,
    pub llm_backend: Arc<LlmInterface>,
}

impl Session {
    /// Open the database at `db_path` (applying migrations) and wrap it
    /// together with a text-generation backend.
    pub async fn new(db_path: &str, llm_backend: LlmInterface) -> Result<Self> {
        let db_pool = db::connect(db_path).await?;
        Ok(Self {
            db_pool,
            llm_backend: Arc::new(llm_backend),
        })
    }

    pub fn from_parts(db_pool: SqlitePool, llm_backend: Arc<LlmInterface>) -> Self {
        Self {
            db_pool,
            llm_backend,
        }
    }

    /// Generate a suggested menu, optionally as a variation of `previous`.
    pub async fn generate_menu(
        &self,
        request: &MenuRequest,
        previous: Option<&[MenuEntry]>,
    ) -> Result<WorkoutMenu, ActionError> {
        menu::generate_workout_menu(self.llm_backend.as_ref(), request, previous)
            .await
            .map_err(|e| match e {
                menu::MenuError::InvalidRequest(msg) => ActionError::Validation(msg),
                other => ActionError::Generation(other.to_string()),
            })
    }
}
