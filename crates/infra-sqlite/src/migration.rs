// Migration Runner
//
// Migrations are whole-file SQL batches registered in MIGRATIONS and
// executed through sqlx::raw_sql, which handles multi-statement scripts
// natively. The runner owns the schema_version bookkeeping; migration
// files contain schema only.

use sqlx::SqlitePool;
use tracing::info;

const MIGRATIONS: &[(i64, &str, &str)] = &[(
    1,
    "initial schema",
    include_str!("../migrations/001_initial_schema.sql"),
)];

/// Apply any migrations newer than the recorded schema version.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), Box<dyn std::error::Error>> {
    sqlx::query("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY)")
        .execute(pool)
        .await?;

    let current: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM schema_version")
        .fetch_one(pool)
        .await?;

    info!(schema_version = current, "Checking database migrations");

    for (version, name, sql) in MIGRATIONS {
        if *version <= current {
            continue;
        }
        info!(version = *version, name = *name, "Applying migration");

        // Batch and version stamp commit together or not at all.
        let mut tx = pool.begin().await?;
        sqlx::raw_sql(sql).execute(&mut *tx).await?;
        sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
            .bind(*version)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create_memory_pool;

    #[tokio::test]
    async fn test_run_migrations() {
        let pool = create_memory_pool().await.unwrap();
        let result = run_migrations(&pool).await;

        if let Err(e) = &result {
            eprintln!("Migration error: {:?}", e);
        }
        assert!(result.is_ok());

        // All tables exist and are empty
        for table in ["jobs", "tasks", "chunks", "agent_logs", "queue_messages"] {
            let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
                .fetch_one(&pool)
                .await
                .unwrap();
            assert_eq!(count, 0, "table {} should be empty", table);
        }
    }

    #[tokio::test]
    async fn test_migrations_are_rerunnable() {
        let pool = create_memory_pool().await.unwrap();
        run_migrations(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let version: i64 = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(version, 1);
    }

    #[tokio::test]
    async fn test_version_is_recorded_per_migration() {
        let pool = create_memory_pool().await.unwrap();
        run_migrations(&pool).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_version")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, MIGRATIONS.len() as i64);
    }
}
