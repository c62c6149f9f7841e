//! Set sequencing: append with carry-forward, delete with renumbering,
//! in-place target updates. Set numbers per exercise stay a contiguous
//! 1..N run.

use log::{error, info};

use crate::db::operations::{
    delete_set_row, exercise_bodyweight_flag, fetch_set, insert_set, last_set_for_exercise,
    set_ids_in_number_order, update_set_number, update_set_targets,
};
use crate::error::ActionError;
use crate::session::Session;

const DEFAULT_REPS: i64 = 10;

impl Session {
    /// Append a set to an exercise: number = current max + 1 (1 when none),
    /// reps carried from the previous set (10 when none), weight carried
    /// unless the exercise is bodyweight. Returns the new set's id.
    pub async fn add_set(&self, exercise_id: i64) -> Result<i64, ActionError> {
        let mut tx = self.db_pool.begin().await.map_err(|e| {
            error!("add_set: begin failed: {}", e);
            ActionError::write("failed to add the set")
        })?;

        let is_bodyweight = exercise_bodyweight_flag(&mut tx, exercise_id)
            .await
            .map_err(|e| {
                error!("add_set: exercise fetch failed: {}", e);
                ActionError::lookup("failed to fetch the exercise")
            })?
            .ok_or_else(|| ActionError::lookup("failed to fetch the exercise"))?;

        let last = last_set_for_exercise(&mut tx, exercise_id)
            .await
            .map_err(|e| {
                error!("add_set: previous set fetch failed: {}", e);
                ActionError::lookup("failed to fetch the previous set")
            })?;

        let next_number = last.as_ref().map(|s| s.set_number + 1).unwrap_or(1);
        let next_reps = last
            .as_ref()
            .and_then(|s| s.target_reps)
            .unwrap_or(DEFAULT_REPS);
        let next_weight = if is_bodyweight {
            None
        } else {
            last.as_ref().and_then(|s| s.target_weight)
        };

        let set_id = insert_set(&mut tx, exercise_id, next_number, Some(next_reps), next_weight)
            .await
            .map_err(|e| {
                error!("add_set: insert failed: {}", e);
                ActionError::write("failed to add the set")
            })?;

        tx.commit().await.map_err(|e| {
            error!("add_set: commit failed: {}", e);
            ActionError::write("failed to add the set")
        })?;

        info!("added set {} (#{}) to exercise {}", set_id, next_number, exercise_id);
        Ok(set_id)
    }

    /// Delete a set, then rewrite the remaining sets of the same exercise to
    /// their 1-based positions in ascending set-number order. One transaction.
    pub async fn delete_set(&self, set_id: i64) -> Result<(), ActionError> {
        let mut tx = self.db_pool.begin().await.map_err(|e| {
            error!("delete_set: begin failed: {}", e);
            ActionError::write("failed to delete the set")
        })?;

        let set = fetch_set(&mut tx, set_id)
            .await
            .map_err(|e| {
                error!("delete_set: set fetch failed: {}", e);
                ActionError::lookup("failed to fetch the set")
            })?
            .ok_or_else(|| ActionError::lookup("failed to fetch the set"))?;

        delete_set_row(&mut tx, set_id).await.map_err(|e| {
            error!("delete_set: delete failed: {}", e);
            ActionError::write("failed to delete the set")
        })?;

        let remaining = set_ids_in_number_order(&mut tx, set.session_exercise_id)
            .await
            .map_err(|e| {
                error!("delete_set: remaining set fetch failed: {}", e);
                ActionError::lookup("failed to fetch the remaining sets")
            })?;

        for (idx, remaining_id) in remaining.iter().enumerate() {
            update_set_number(&mut tx, *remaining_id, idx as i64 + 1)
                .await
                .map_err(|e| {
                    error!("delete_set: renumber failed: {}", e);
                    ActionError::write("failed to renumber the remaining sets")
                })?;
        }

        tx.commit().await.map_err(|e| {
            error!("delete_set: commit failed: {}", e);
            ActionError::write("failed to delete the set")
        })?;

        info!(
            "deleted set {} from exercise {}, {} sets renumbered",
            set_id,
            set.session_exercise_id,
            remaining.len()
        );
        Ok(())
    }

    /// Persist reps/weight/memo for a set and bump its update timestamp.
    /// Reps are validated here; the bodyweight invariant is the caller's
    /// responsibility.
    pub async fn update_set(
        &self,
        set_id: i64,
        target_reps: i64,
        target_weight: Option<f64>,
        memo: Option<&str>,
    ) -> Result<(), ActionError> {
        if target_reps < 1 {
            return Err(ActionError::validation("reps must be at least 1"));
        }

        update_set_targets(&self.db_pool, set_id, target_reps, target_weight, memo)
            .await
            .map_err(|e| {
                error!("update_set: update failed: {}", e);
                ActionError::write("failed to update the set")
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::db::operations::insert_set;
    use crate::session::{Session, test_session};

    async fn exercise_with_no_sets(session: &Session, is_bodyweight: bool) -> i64 {
        let session_id = session.start_workout(&[]).await.unwrap();
        session
            .create_exercise(session_id, "Movement", is_bodyweight, 0)
            .await
            .unwrap()
    }

    async fn set_rows(session: &Session, exercise_id: i64) -> Vec<(i64, Option<i64>, Option<f64>)> {
        crate::db::operations::get_sets_for_exercise(&session.db_pool, exercise_id)
            .await
            .unwrap()
            .into_iter()
            .map(|s| (s.set_number, s.target_reps, s.target_weight))
            .collect()
    }

    #[tokio::test]
    async fn appended_sets_are_numbered_contiguously() {
        let session = test_session().await;
        let exercise_id = exercise_with_no_sets(&session, false).await;

        for _ in 0..4 {
            session.add_set(exercise_id).await.unwrap();
        }

        let numbers: Vec<i64> = set_rows(&session, exercise_id)
            .await
            .into_iter()
            .map(|(n, _, _)| n)
            .collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn first_set_defaults_to_ten_reps_and_no_weight() {
        let session = test_session().await;
        let exercise_id = exercise_with_no_sets(&session, false).await;

        session.add_set(exercise_id).await.unwrap();

        assert_eq!(set_rows(&session, exercise_id).await, vec![(1, Some(10), None)]);
    }

    #[tokio::test]
    async fn append_carries_the_previous_targets_forward() {
        let session = test_session().await;
        let exercise_id = exercise_with_no_sets(&session, false).await;

        let first = session.add_set(exercise_id).await.unwrap();
        session.update_set(first, 8, Some(62.5), None).await.unwrap();
        session.add_set(exercise_id).await.unwrap();

        assert_eq!(
            set_rows(&session, exercise_id).await,
            vec![(1, Some(8), Some(62.5)), (2, Some(8), Some(62.5))]
        );
    }

    #[tokio::test]
    async fn bodyweight_append_never_carries_a_weight() {
        let session = test_session().await;
        let exercise_id = exercise_with_no_sets(&session, true).await;

        // Force a weighted row in despite the flag; append must still yield NULL.
        let mut conn = session.db_pool.acquire().await.unwrap();
        insert_set(&mut conn, exercise_id, 1, Some(12), Some(40.0))
            .await
            .unwrap();
        drop(conn);

        session.add_set(exercise_id).await.unwrap();

        assert_eq!(
            set_rows(&session, exercise_id).await,
            vec![(1, Some(12), Some(40.0)), (2, Some(12), None)]
        );
    }

    #[tokio::test]
    async fn deleting_a_middle_set_renumbers_the_rest() {
        let session = test_session().await;
        let exercise_id = exercise_with_no_sets(&session, false).await;

        let mut ids = Vec::new();
        for reps in [5, 6, 7] {
            let id = session.add_set(exercise_id).await.unwrap();
            session.update_set(id, reps, None, None).await.unwrap();
            ids.push(id);
        }

        session.delete_set(ids[1]).await.unwrap();

        assert_eq!(
            set_rows(&session, exercise_id).await,
            vec![(1, Some(5), None), (2, Some(7), None)]
        );
    }

    #[tokio::test]
    async fn deleting_an_unknown_set_is_a_lookup_failure() {
        let session = test_session().await;
        let err = session.delete_set(777).await.unwrap_err();
        assert_eq!(err.kind(), "lookup");
    }

    #[tokio::test]
    async fn zero_reps_update_is_rejected() {
        let session = test_session().await;
        let exercise_id = exercise_with_no_sets(&session, false).await;
        let set_id = session.add_set(exercise_id).await.unwrap();

        let err = session.update_set(set_id, 0, None, None).await.unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[tokio::test]
    async fn update_persists_memo_and_targets() {
        let session = test_session().await;
        let exercise_id = exercise_with_no_sets(&session, false).await;
        let set_id = session.add_set(exercise_id).await.unwrap();

        session
            .update_set(set_id, 12, Some(55.0), Some("felt easy"))
            .await
            .unwrap();

        let sets = crate::db::operations::get_sets_for_exercise(&session.db_pool, exercise_id)
            .await
            .unwrap();
        assert_eq!(sets[0].target_reps, Some(12));
        assert_eq!(sets[0].target_weight, Some(55.0));
        assert_eq!(sets[0].memo.as_deref(), Some("felt easy"));
    }
}
