use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use crate::db::models::{STATUS_COMPLETED, STATUS_IN_PROGRESS, SessionExercise, SessionSet, WorkoutSession};

// Pool-level reads used by list views and single-statement updates.

pub async fn get_session(pool: &SqlitePool, session_id: i64) -> Result<WorkoutSession> {
    sqlx::query_as::<_, WorkoutSession>("SELECT * FROM workout_sessions WHERE id = ?1")
        .bind(session_id)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
}

pub async fn get_exercises_for_session(
    pool: &SqlitePool,
    session_id: i64,
) -> Result<Vec<SessionExercise>> {
    sqlx::query_as::<_, SessionExercise>(
        "SELECT * FROM session_exercises WHERE session_id = ?1 ORDER BY order_index ASC",
    )
    .bind(session_id)
    .fetch_all(pool)
    .await
    .map_err(Into::into)
}

pub async fn get_sets_for_exercise(
    pool: &SqlitePool,
    exercise_id: i64,
) -> Result<Vec<SessionSet>> {
    sqlx::query_as::<_, SessionSet>(
        "SELECT * FROM session_sets WHERE session_exercise_id = ?1 ORDER BY set_number ASC",
    )
    .bind(exercise_id)
    .fetch_all(pool)
    .await
    .map_err(Into::into)
}

pub async fn update_set_targets(
    pool: &SqlitePool,
    set_id: i64,
    target_reps: i64,
    target_weight: Option<f64>,
    memo: Option<&str>,
) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE session_sets
         SET target_reps = ?1, target_weight = ?2, memo = ?3, updated_at = ?4
         WHERE id = ?5",
    )
    .bind(target_reps)
    .bind(target_weight)
    .bind(memo)
    .bind(Utc::now())
    .bind(set_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

// Connection-level operations, composed into transactions by the session layer.

pub async fn insert_session(conn: &mut SqliteConnection, user_id: &str) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO workout_sessions (user_id, status, created_at) VALUES (?1, ?2, ?3)",
    )
    .bind(user_id)
    .bind(STATUS_IN_PROGRESS)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn insert_exercise(
    conn: &mut SqliteConnection,
    session_id: i64,
    name: &str,
    is_bodyweight: bool,
    order_index: i64,
) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO session_exercises (session_id, name, is_bodyweight, order_index, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(session_id)
    .bind(name)
    .bind(is_bodyweight)
    .bind(order_index)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn insert_set(
    conn: &mut SqliteConnection,
    exercise_id: i64,
    set_number: i64,
    target_reps: Option<i64>,
    target_weight: Option<f64>,
) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO session_sets (session_exercise_id, set_number, target_reps, target_weight, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(exercise_id)
    .bind(set_number)
    .bind(target_reps)
    .bind(target_weight)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn exercise_bodyweight_flag(
    conn: &mut SqliteConnection,
    exercise_id: i64,
) -> Result<Option<bool>> {
    sqlx::query_scalar("SELECT is_bodyweight FROM session_exercises WHERE id = ?1")
        .bind(exercise_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(Into::into)
}

pub async fn max_order_index(
    conn: &mut SqliteConnection,
    session_id: i64,
) -> Result<Option<i64>> {
    sqlx::query_scalar("SELECT MAX(order_index) FROM session_exercises WHERE session_id = ?1")
        .bind(session_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(Into::into)
}

pub async fn last_set_for_exercise(
    conn: &mut SqliteConnection,
    exercise_id: i64,
) -> Result<Option<SessionSet>> {
    sqlx::query_as::<_, SessionSet>(
        "SELECT * FROM session_sets WHERE session_exercise_id = ?1
         ORDER BY set_number DESC LIMIT 1",
    )
    .bind(exercise_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(Into::into)
}

pub async fn fetch_set(conn: &mut SqliteConnection, set_id: i64) -> Result<Option<SessionSet>> {
    sqlx::query_as::<_, SessionSet>("SELECT * FROM session_sets WHERE id = ?1")
        .bind(set_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(Into::into)
}

pub async fn delete_set_row(conn: &mut SqliteConnection, set_id: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM session_sets WHERE id = ?1")
        .bind(set_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

pub async fn set_ids_in_number_order(
    conn: &mut SqliteConnection,
    exercise_id: i64,
) -> Result<Vec<i64>> {
    sqlx::query_scalar(
        "SELECT id FROM session_sets WHERE session_exercise_id = ?1 ORDER BY set_number ASC",
    )
    .bind(exercise_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(Into::into)
}

pub async fn update_set_number(
    conn: &mut SqliteConnection,
    set_id: i64,
    set_number: i64,
) -> Result<()> {
    sqlx::query("UPDATE session_sets SET set_number = ?1 WHERE id = ?2")
        .bind(set_number)
        .bind(set_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn count_exercises(conn: &mut SqliteConnection, session_id: i64) -> Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM session_exercises WHERE session_id = ?1")
        .bind(session_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(Into::into)
}

/// Delete every set under the session's exercises where reps and weight are
/// both NULL.
pub async fn delete_empty_sets(conn: &mut SqliteConnection, session_id: i64) -> Result<u64> {
    let result = sqlx::query(
        "DELETE FROM session_sets
         WHERE session_exercise_id IN
               (SELECT id FROM session_exercises WHERE session_id = ?1)
           AND target_reps IS NULL
           AND target_weight IS NULL",
    )
    .bind(session_id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected())
}

/// Delete the session's exercises that no longer have any sets.
pub async fn delete_empty_exercises(conn: &mut SqliteConnection, session_id: i64) -> Result<u64> {
    let result = sqlx::query(
        "DELETE FROM session_exercises
         WHERE session_id = ?1
           AND NOT EXISTS
               (SELECT 1 FROM session_sets
                WHERE session_sets.session_exercise_id = session_exercises.id)",
    )
    .bind(session_id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected())
}

/// Flip an in-progress session to completed. Returns 0 when the session is
/// missing or already completed.
pub async fn mark_session_completed(
    conn: &mut SqliteConnection,
    session_id: i64,
    completed_at: DateTime<Utc>,
) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE workout_sessions SET status = ?1, completed_at = ?2
         WHERE id = ?3 AND status = ?4",
    )
    .bind(STATUS_COMPLETED)
    .bind(completed_at)
    .bind(session_id)
    .bind(STATUS_IN_PROGRESS)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected())
}
