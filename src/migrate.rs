use anyhow::Result;
use sqlx::SqlitePool;

/// Create the index tables on a fresh database.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS manifest (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // `position` preserves insertion order, which breaks score ties.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunks (
            position INTEGER PRIMARY KEY,
            source TEXT NOT NULL,
            specialty TEXT NOT NULL,
            description TEXT NOT NULL,
            document_index INTEGER NOT NULL,
            chunk_index INTEGER NOT NULL,
            start_char INTEGER NOT NULL,
            text TEXT NOT NULL,
            hash TEXT NOT NULL,
            vector BLOB NOT NULL,
            UNIQUE(document_index, chunk_index)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
