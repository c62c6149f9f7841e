use log::{error, info};

use crate::db::operations::{get_session, insert_exercise, insert_set, max_order_index};
use crate::error::ActionError;
use crate::session::Session;

impl Session {
    /// Append an exercise to a session at order index = current max + 1 and
    /// give it `initial_set_count` blank sets numbered 1..N. One transaction.
    pub async fn create_exercise(
        &self,
        session_id: i64,
        name: &str,
        is_bodyweight: bool,
        initial_set_count: i64,
    ) -> Result<i64, ActionError> {
        if name.trim().is_empty() {
            return Err(ActionError::validation(
                "invalid session id or exercise name",
            ));
        }
        if initial_set_count < 0 {
            return Err(ActionError::validation("invalid initial set count"));
        }

        get_session(&self.db_pool, session_id).await.map_err(|e| {
            error!("create_exercise: session fetch failed: {}", e);
            ActionError::lookup("failed to fetch the workout session")
        })?;

        let mut tx = self.db_pool.begin().await.map_err(|e| {
            error!("create_exercise: begin failed: {}", e);
            ActionError::write("failed to create the exercise")
        })?;

        let max = max_order_index(&mut tx, session_id).await.map_err(|e| {
            error!("create_exercise: order index fetch failed: {}", e);
            ActionError::lookup("failed to fetch the previous exercise")
        })?;
        let next_order_index = max.unwrap_or(0) + 1;

        let exercise_id = insert_exercise(&mut tx, session_id, name, is_bodyweight, next_order_index)
            .await
            .map_err(|e| {
                error!("create_exercise: insert failed: {}", e);
                ActionError::write("failed to create the exercise")
            })?;

        for set_number in 1..=initial_set_count {
            insert_set(&mut tx, exercise_id, set_number, None, None)
                .await
                .map_err(|e| {
                    error!("create_exercise: set insert failed: {}", e);
                    ActionError::write("failed to create the sets")
                })?;
        }

        tx.commit().await.map_err(|e| {
            error!("create_exercise: commit failed: {}", e);
            ActionError::write("failed to create the exercise")
        })?;

        info!(
            "created exercise {} in session {} with {} sets",
            exercise_id, session_id, initial_set_count
        );
        Ok(exercise_id)
    }
}

#[cfg(test)]
mod tests {
    use crate::session::test_session;

    #[tokio::test]
    async fn order_index_grows_from_one() {
        let session = test_session().await;
        let session_id = session.start_workout(&[]).await.unwrap();

        session
            .create_exercise(session_id, "Deadlift", false, 3)
            .await
            .unwrap();
        session
            .create_exercise(session_id, "Chin-up", true, 2)
            .await
            .unwrap();

        let state = session.load_workout(session_id).await.unwrap();
        assert_eq!(
            state
                .exercises
                .iter()
                .map(|e| e.exercise.order_index)
                .collect::<Vec<_>>(),
            vec![1, 2]
        );
    }

    #[tokio::test]
    async fn initial_sets_are_blank_and_numbered() {
        let session = test_session().await;
        let session_id = session.start_workout(&[]).await.unwrap();

        session
            .create_exercise(session_id, "Deadlift", false, 3)
            .await
            .unwrap();

        let state = session.load_workout(session_id).await.unwrap();
        let sets = &state.exercises[0].sets;
        assert_eq!(sets.len(), 3);
        assert_eq!(
            sets.iter().map(|s| s.set_number).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(sets.iter().all(|s| s.target_reps.is_none()));
        assert!(sets.iter().all(|s| s.target_weight.is_none()));
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let session = test_session().await;
        let session_id = session.start_workout(&[]).await.unwrap();
        assert!(
            session
                .create_exercise(session_id, "   ", false, 3)
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn unknown_session_is_a_lookup_failure() {
        let session = test_session().await;
        let err = session
            .create_exercise(4242, "Deadlift", false, 3)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "lookup");
    }
}
