//! Workout session lifecycle: start from a menu, complete with pruning,
//! status checks, and list-view loading.

use chrono::Utc;
use log::{debug, error, info};
use serde::Serialize;

use crate::db::models::{SessionExercise, SessionSet, WorkoutSession};
use crate::db::operations::{
    count_exercises, delete_empty_exercises, delete_empty_sets, get_exercises_for_session,
    get_session, get_sets_for_exercise, insert_exercise, insert_session, insert_set,
    mark_session_completed,
};
use crate::error::ActionError;
use crate::menu::MenuEntry;
use crate::session::Session;

/// Fixed owner identity until authentication lands.
pub const PLACEHOLDER_USER: &str = "anonymous";

#[derive(Debug, Serialize)]
pub struct ExerciseState {
    pub exercise: SessionExercise,
    pub sets: Vec<SessionSet>,
}

#[derive(Debug, Serialize)]
pub struct WorkoutState {
    pub session: WorkoutSession,
    pub exercises: Vec<ExerciseState>,
}

impl Session {
    /// Create a session and populate it from a menu: one exercise row per
    /// entry (order index = list position), `entry.sets` set rows per
    /// exercise with targets from the entry. Weight is forced to NULL for
    /// bodyweight entries. Runs as one transaction.
    pub async fn start_workout(&self, menu: &[MenuEntry]) -> Result<i64, ActionError> {
        let mut tx = self.db_pool.begin().await.map_err(|e| {
            error!("start_workout: begin failed: {}", e);
            ActionError::write("failed to create the workout session")
        })?;

        let session_id = insert_session(&mut tx, PLACEHOLDER_USER).await.map_err(|e| {
            error!("start_workout: session insert failed: {}", e);
            ActionError::write("failed to create the workout session")
        })?;

        for (idx, entry) in menu.iter().enumerate() {
            let exercise_id = insert_exercise(
                &mut tx,
                session_id,
                &entry.exercise,
                entry.weight.is_bodyweight,
                idx as i64,
            )
            .await
            .map_err(|e| {
                error!("start_workout: exercise insert failed: {}", e);
                ActionError::write("failed to save the exercises")
            })?;

            let target_weight = if entry.weight.is_bodyweight {
                None
            } else {
                entry.weight.value
            };
            for set_number in 1..=entry.sets {
                insert_set(&mut tx, exercise_id, set_number, Some(entry.reps), target_weight)
                    .await
                    .map_err(|e| {
                        error!("start_workout: set insert failed: {}", e);
                        ActionError::write("failed to save the sets")
                    })?;
            }
        }

        tx.commit().await.map_err(|e| {
            error!("start_workout: commit failed: {}", e);
            ActionError::write("failed to create the workout session")
        })?;

        info!(
            "started workout session {} with {} exercises",
            session_id,
            menu.len()
        );
        Ok(session_id)
    }

    /// Complete a session: prune sets whose reps and weight are both NULL,
    /// then prune exercises left with zero sets, then flip the status. A
    /// session with no exercises skips straight to the status flip. Runs as
    /// one transaction; the flip happens at most once per session.
    pub async fn complete_workout(&self, session_id: i64) -> Result<(), ActionError> {
        let mut tx = self.db_pool.begin().await.map_err(|e| {
            error!("complete_workout: begin failed: {}", e);
            ActionError::write("failed to complete the workout")
        })?;

        let exercise_count = count_exercises(&mut tx, session_id).await.map_err(|e| {
            error!("complete_workout: exercise fetch failed: {}", e);
            ActionError::lookup("failed to fetch the session's exercises")
        })?;

        if exercise_count > 0 {
            let pruned_sets = delete_empty_sets(&mut tx, session_id).await.map_err(|e| {
                error!("complete_workout: empty-set delete failed: {}", e);
                ActionError::write("failed to delete empty sets")
            })?;
            let pruned_exercises =
                delete_empty_exercises(&mut tx, session_id).await.map_err(|e| {
                    error!("complete_workout: empty-exercise delete failed: {}", e);
                    ActionError::write("failed to delete empty exercises")
                })?;
            debug!(
                "complete_workout: pruned {} sets and {} exercises from session {}",
                pruned_sets, pruned_exercises, session_id
            );
        }

        let updated = mark_session_completed(&mut tx, session_id, Utc::now())
            .await
            .map_err(|e| {
                error!("complete_workout: status update failed: {}", e);
                ActionError::write("failed to complete the workout")
            })?;
        if updated == 0 {
            return Err(ActionError::lookup(
                "the workout session was not found or is already completed",
            ));
        }

        tx.commit().await.map_err(|e| {
            error!("complete_workout: commit failed: {}", e);
            ActionError::write("failed to complete the workout")
        })?;

        info!("completed workout session {}", session_id);
        Ok(())
    }

    /// True iff the session exists and is still in progress. Any failure
    /// reads as false.
    pub async fn is_session_active(&self, session_id: i64) -> bool {
        match get_session(&self.db_pool, session_id).await {
            Ok(session) => session.is_in_progress(),
            Err(e) => {
                debug!("session {} status check failed: {}", session_id, e);
                false
            }
        }
    }

    /// Load the session with its exercises (by order index) and their sets
    /// (by set number) for rendering.
    pub async fn load_workout(&self, session_id: i64) -> Result<WorkoutState, ActionError> {
        let session = get_session(&self.db_pool, session_id).await.map_err(|e| {
            error!("load_workout: session fetch failed: {}", e);
            ActionError::lookup("failed to fetch the workout session")
        })?;

        let exercises = get_exercises_for_session(&self.db_pool, session_id)
            .await
            .map_err(|e| {
                error!("load_workout: exercise fetch failed: {}", e);
                ActionError::lookup("failed to fetch the session's exercises")
            })?;

        let mut states = Vec::with_capacity(exercises.len());
        for exercise in exercises {
            let sets = get_sets_for_exercise(&self.db_pool, exercise.id)
                .await
                .map_err(|e| {
                    error!("load_workout: set fetch failed: {}", e);
                    ActionError::lookup("failed to fetch the sets")
                })?;
            states.push(ExerciseState { exercise, sets });
        }

        Ok(WorkoutState {
            session,
            exercises: states,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::db::models::STATUS_COMPLETED;
    use crate::menu::{MenuEntry, MenuWeight};
    use crate::session::test_session;

    fn menu_entry(exercise: &str, sets: i64, reps: i64, weight: Option<f64>) -> MenuEntry {
        MenuEntry {
            exercise: exercise.to_string(),
            sets,
            reps,
            rest_sec: 90,
            weight: MenuWeight {
                is_bodyweight: weight.is_none(),
                value: weight,
            },
        }
    }

    #[tokio::test]
    async fn start_workout_populates_exercises_and_sets() {
        let session = test_session().await;
        let menu = vec![
            menu_entry("Bench Press", 3, 8, Some(60.0)),
            menu_entry("Pull-up", 2, 10, None),
        ];

        let session_id = session.start_workout(&menu).await.unwrap();
        assert!(session.is_session_active(session_id).await);

        let state = session.load_workout(session_id).await.unwrap();
        assert_eq!(state.exercises.len(), 2);

        let bench = &state.exercises[0];
        assert_eq!(bench.exercise.name, "Bench Press");
        assert_eq!(bench.exercise.order_index, 0);
        assert!(!bench.exercise.is_bodyweight);
        assert_eq!(bench.sets.len(), 3);
        assert_eq!(
            bench.sets.iter().map(|s| s.set_number).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(bench.sets.iter().all(|s| s.target_reps == Some(8)));
        assert!(bench.sets.iter().all(|s| s.target_weight == Some(60.0)));

        let pullup = &state.exercises[1];
        assert!(pullup.exercise.is_bodyweight);
        assert_eq!(pullup.sets.len(), 2);
        assert!(pullup.sets.iter().all(|s| s.target_weight.is_none()));
    }

    #[tokio::test]
    async fn completion_prunes_blank_rows_then_flips_status() {
        let session = test_session().await;
        let menu = vec![menu_entry("Squat", 1, 5, Some(100.0))];
        let session_id = session.start_workout(&menu).await.unwrap();

        // An extra exercise whose sets stay blank should vanish at completion.
        session
            .create_exercise(session_id, "Leg Press", false, 3)
            .await
            .unwrap();

        session.complete_workout(session_id).await.unwrap();

        let state = session.load_workout(session_id).await.unwrap();
        assert_eq!(state.session.status, STATUS_COMPLETED);
        assert!(state.session.completed_at.is_some());
        assert_eq!(state.exercises.len(), 1);
        assert_eq!(state.exercises[0].exercise.name, "Squat");
        assert_eq!(state.exercises[0].sets.len(), 1);
    }

    #[tokio::test]
    async fn empty_session_completes_directly() {
        let session = test_session().await;
        let session_id = session.start_workout(&[]).await.unwrap();

        session.complete_workout(session_id).await.unwrap();

        let state = session.load_workout(session_id).await.unwrap();
        assert_eq!(state.session.status, STATUS_COMPLETED);
        assert!(state.session.completed_at.is_some());
        assert!(state.exercises.is_empty());
    }

    #[tokio::test]
    async fn completion_happens_exactly_once() {
        let session = test_session().await;
        let session_id = session.start_workout(&[]).await.unwrap();

        session.complete_workout(session_id).await.unwrap();
        assert!(!session.is_session_active(session_id).await);
        assert!(session.complete_workout(session_id).await.is_err());
    }

    #[tokio::test]
    async fn unknown_session_reads_as_inactive() {
        let session = test_session().await;
        assert!(!session.is_session_active(9999).await);
    }
}
