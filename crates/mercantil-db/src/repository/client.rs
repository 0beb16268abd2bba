//! # Client Repository
//!
//! Natural and legal clients live in separate tables with their own id
//! spaces. They are only unified here, at query time.

use mercantil_core::{ClientKind, ClientRef, ClientSummary};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use super::{contains_pattern, first_token};
use crate::error::DbResult;

#[derive(Debug, sqlx::FromRow)]
struct ClientRow {
    id: String,
    name: String,
    kind: ClientKind,
    is_active: bool,
}

/// Repository for client lookups.
#[derive(Debug, Clone)]
pub struct ClientRepository {
    pool: SqlitePool,
}

impl ClientRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ClientRepository { pool }
    }

    /// Every client record whose id is `id`, across both tables.
    ///
    /// The sale workflow requires exactly one match.
    pub async fn matching(conn: &mut SqliteConnection, id: &str) -> DbResult<Vec<ClientRef>> {
        let kinds: Vec<ClientKind> = sqlx::query_scalar(
            r#"
            SELECT 'natural' FROM natural_clients WHERE id = ?1
            UNION ALL
            SELECT 'legal' FROM legal_clients WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(kinds
            .into_iter()
            .map(|kind| match kind {
                ClientKind::Natural => ClientRef::Natural(id.to_string()),
                ClientKind::Legal => ClientRef::Legal(id.to_string()),
            })
            .collect())
    }

    /// Searches active clients of both kinds, ordered by display name.
    ///
    /// A client matches when one of its name columns (or the composed name)
    /// contains `query`, or its id contains `query` or the first token of
    /// `query`.
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<ClientSummary>> {
        debug!(query = %query, limit = %limit, "Searching clients");

        let rows: Vec<ClientRow> = sqlx::query_as(
            r#"
            SELECT id, name, kind, is_active FROM (
                SELECT id,
                       first_names || ' ' || last_names AS name,
                       'natural' AS kind,
                       is_active
                FROM natural_clients
                WHERE is_active = 1
                  AND (
                        first_names LIKE ?1 ESCAPE '\'
                     OR last_names LIKE ?1 ESCAPE '\'
                     OR first_names || ' ' || last_names LIKE ?1 ESCAPE '\'
                     OR id LIKE ?1 ESCAPE '\'
                     OR id LIKE ?2 ESCAPE '\'
                  )
                UNION ALL
                SELECT id,
                       company_name AS name,
                       'legal' AS kind,
                       is_active
                FROM legal_clients
                WHERE is_active = 1
                  AND (
                        company_name LIKE ?1 ESCAPE '\'
                     OR id LIKE ?1 ESCAPE '\'
                     OR id LIKE ?2 ESCAPE '\'
                  )
            )
            ORDER BY name ASC, id ASC
            LIMIT ?3
            "#,
        )
        .bind(contains_pattern(query))
        .bind(contains_pattern(first_token(query)))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = rows.len(), "Client search complete");

        Ok(rows
            .into_iter()
            .map(|row| ClientSummary {
                id: row.id,
                name: row.name,
                kind: row.kind,
                is_active: row.is_active,
            })
            .collect())
    }
}
