use std::collections::HashMap;

use super::DBClient;
use crate::dtos::ReactionCounts;
use crate::models::{ReactionOutcome, ReactionType, Target};
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite};

pub trait ReactionExt {
    /// Adds the reaction, or removes it if the user already left the same one.
    async fn toggle_reaction(
        &self,
        user_id: i64,
        target: Target,
        reaction_type: ReactionType,
    ) -> Result<ReactionOutcome, sqlx::Error>;

    /// Per-type reaction totals for each id in `ids`. `column` is the
    /// target column, `thread_id` or `comment_id`.
    async fn get_reaction_counts(
        &self,
        column: &'static str,
        ids: &[i64],
    ) -> Result<HashMap<i64, ReactionCounts>, sqlx::Error>;
}

impl ReactionExt for DBClient {
    async fn toggle_reaction(
        &self,
        user_id: i64,
        target: Target,
        reaction_type: ReactionType,
    ) -> Result<ReactionOutcome, sqlx::Error> {
        let column = target.column();
        let mut tx = self.pool.begin().await?;

        let existing: Option<i64> = sqlx::query_scalar(&format!(
            "SELECT id FROM reactions WHERE user_id = ? AND {column} = ? AND reaction_type = ?"
        ))
        .bind(user_id)
        .bind(target.id())
        .bind(reaction_type.to_str())
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = match existing {
            Some(id) => {
                sqlx::query("DELETE FROM reactions WHERE id = ?")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                ReactionOutcome::Removed
            }
            None => {
                sqlx::query(&format!(
                    "INSERT INTO reactions (user_id, {column}, reaction_type, created_at) VALUES (?, ?, ?, ?)"
                ))
                .bind(user_id)
                .bind(target.id())
                .bind(reaction_type.to_str())
                .bind(Utc::now())
                .execute(&mut *tx)
                .await?;
                ReactionOutcome::Added
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }

    async fn get_reaction_counts(
        &self,
        column: &'static str,
        ids: &[i64],
    ) -> Result<HashMap<i64, ReactionCounts>, sqlx::Error> {
        let mut counts: HashMap<i64, ReactionCounts> = HashMap::new();
        if ids.is_empty() {
            return Ok(counts);
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {column}, reaction_type, COUNT(*) FROM reactions WHERE {column} IN ("
        ));
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(format!(") GROUP BY {column}, reaction_type"));

        let rows: Vec<(i64, String, i64)> = builder.build_query_as().fetch_all(&self.pool).await?;
        for (target_id, reaction_type, total) in rows {
            counts
                .entry(target_id)
                .or_default()
                .insert(reaction_type, total);
        }

        Ok(counts)
    }
}
