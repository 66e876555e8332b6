use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Row};

use crate::models::{Collection, Record};
use crate::store::{DataSourceError, RecordQuery, RecordStore};
use crate::widget::{self, WidgetDefinition};

/// Reads collections from Postgres tables named after each [`Collection`].
/// Rows come back as `to_jsonb` objects so columns beyond `created_at` do
/// not need to be known up front.
#[derive(Debug, Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn record_query(collection: Collection, approved_only: bool) -> String {
    let mut query = format!(
        "SELECT to_jsonb(t) AS record FROM {} t \
         WHERE t.created_at >= $1 AND t.created_at <= $2",
        collection.table_name()
    );

    if approved_only {
        query.push_str(" AND t.is_approved = true");
    }

    query.push_str(" ORDER BY t.created_at");
    query
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn fetch(
        &self,
        collection: Collection,
        query: RecordQuery,
    ) -> Result<Vec<Record>, DataSourceError> {
        let sql = record_query(collection, query.approved_only);
        let rows = sqlx::query(&sql)
            .bind(query.window.start)
            .bind(query.window.end)
            .fetch_all(&self.pool)
            .await
            .map_err(|source| DataSourceError::Query { collection, source })?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let value: Value = row
                .try_get("record")
                .map_err(|source| DataSourceError::Query { collection, source })?;
            let record = serde_json::from_value(value)
                .map_err(|source| DataSourceError::Decode { collection, source })?;
            records.push(record);
        }

        Ok(records)
    }
}

pub async fn fetch_widgets(pool: &PgPool) -> anyhow::Result<Vec<WidgetDefinition>> {
    let rows = sqlx::query(
        r#"
        SELECT to_jsonb(w) AS widget
        FROM custom_widgets w
        WHERE w.is_active = true
        ORDER BY w.position
        "#,
    )
    .fetch_all(pool)
    .await
    .context("failed to load custom widgets")?;

    let mut values = Vec::with_capacity(rows.len());
    for row in rows {
        let value: Value = row.try_get("widget")?;
        values.push(value);
    }

    Ok(widget::decode_widgets(values))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_query_targets_the_collection_table() {
        let sql = record_query(Collection::Volunteers, false);
        assert!(sql.contains("FROM volunteers t"));
        assert!(sql.contains("t.created_at >= $1 AND t.created_at <= $2"));
        assert!(!sql.contains("is_approved"));
    }

    #[test]
    fn approved_query_adds_the_flag_filter() {
        let sql = record_query(Collection::Donations, true);
        assert!(sql.contains("FROM donations t"));
        assert!(sql.contains("AND t.is_approved = true"));
        assert!(sql.ends_with("ORDER BY t.created_at"));
    }
}
