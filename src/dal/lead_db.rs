use chrono::Utc;
use sqlx::{types::Json, PgPool, Row};
use uuid::Uuid;

use crate::domain::lead::Lead;

/// Every historical lead the user owns, flattened across all of their
/// persisted sessions. Rows whose lead_data no longer decodes are skipped
/// so one bad batch cannot poison the whole history.
pub async fn fetch_lead_history(pool: &PgPool, user_id: &str) -> Result<Vec<Lead>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        select
            lead_data
        from
            search_results
        where
            user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let mut leads: Vec<Lead> = vec![];
    for row in rows {
        match row.try_get::<Json<Vec<Lead>>, _>("lead_data") {
            Ok(Json(batch)) => leads.extend(batch),
            Err(e) => log::error!("Skipping lead_data row that failed to decode: {:?}", e),
        }
    }

    Ok(leads)
}

pub async fn insert_search_results(
    pool: &PgPool,
    user_id: &str,
    session_id: &str,
    platform: &str,
    query: &str,
    leads: &[Lead],
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        insert into search_results
            (id, user_id, session_id, platform, query, lead_data, created_at)
        values
            ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(session_id)
    .bind(platform)
    .bind(query)
    .bind(Json(leads))
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}
