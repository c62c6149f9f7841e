//! Session module: the request-scoped handle over the datastore and the
//! text-generation backend, with one impl block per concern.

mod exercises;
mod lifecycle;
mod session;
mod sets;

pub use lifecycle::{ExerciseState, PLACEHOLDER_USER, WorkoutState};
pub use session::Session;

#[cfg(test)]
pub(crate) async fn test_session() -> Session {
    use std::sync::Arc;

    use crate::db;
    use crate::llm::LlmInterface;

    let pool = db::test_pool().await;
    let llm = Arc::new(LlmInterface::new_mock_fn(|_, _| String::new()));
    Session::from_parts(pool, llm)
}
