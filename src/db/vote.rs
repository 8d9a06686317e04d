use super::DBClient;
use crate::models::{Target, VoteOutcome, VoteType};
use chrono::Utc;

pub trait VoteExt {
    /// Owner of a live thread or comment, `None` if it does not exist.
    async fn get_target_owner(&self, target: Target) -> Result<Option<i64>, sqlx::Error>;

    /// Applies a vote and returns the outcome with the target's new score.
    ///
    /// Repeating the same vote removes it, the opposite vote replaces it.
    /// The lookup, the write and the score recompute share one transaction.
    async fn toggle_vote(
        &self,
        user_id: i64,
        target: Target,
        vote_type: VoteType,
    ) -> Result<(VoteOutcome, i64), sqlx::Error>;
}

impl VoteExt for DBClient {
    async fn get_target_owner(&self, target: Target) -> Result<Option<i64>, sqlx::Error> {
        let query = match target {
            Target::Thread(_) => "SELECT user_id FROM threads WHERE id = ?",
            Target::Comment(_) => "SELECT user_id FROM comments WHERE id = ? AND is_deleted = 0",
        };

        sqlx::query_scalar(query)
            .bind(target.id())
            .fetch_optional(&self.pool)
            .await
    }

    async fn toggle_vote(
        &self,
        user_id: i64,
        target: Target,
        vote_type: VoteType,
    ) -> Result<(VoteOutcome, i64), sqlx::Error> {
        let column = target.column();
        let table = target.table();
        let mut tx = self.pool.begin().await?;

        // Looked up by the exact target column: a thread vote and a comment
        // vote with the same numeric id are different rows.
        let existing: Option<(i64, i64)> = sqlx::query_as(&format!(
            "SELECT id, vote_type FROM votes WHERE user_id = ? AND {column} = ?"
        ))
        .bind(user_id)
        .bind(target.id())
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = match existing {
            Some((vote_id, current)) if current == vote_type.value() => {
                sqlx::query("DELETE FROM votes WHERE id = ?")
                    .bind(vote_id)
                    .execute(&mut *tx)
                    .await?;
                VoteOutcome::Removed
            }
            Some((vote_id, _)) => {
                sqlx::query("UPDATE votes SET vote_type = ? WHERE id = ?")
                    .bind(vote_type.value())
                    .bind(vote_id)
                    .execute(&mut *tx)
                    .await?;
                VoteOutcome::Recorded
            }
            None => {
                sqlx::query(&format!(
                    "INSERT INTO votes (user_id, {column}, vote_type, created_at) VALUES (?, ?, ?, ?)"
                ))
                .bind(user_id)
                .bind(target.id())
                .bind(vote_type.value())
                .bind(Utc::now())
                .execute(&mut *tx)
                .await?;
                VoteOutcome::Recorded
            }
        };

        let score: i64 = sqlx::query_scalar(&format!(
            "UPDATE {table} \
             SET score = (SELECT COALESCE(SUM(vote_type), 0) FROM votes WHERE {column} = ?) \
             WHERE id = ? \
             RETURNING score"
        ))
        .bind(target.id())
        .bind(target.id())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((outcome, score))
    }
}
