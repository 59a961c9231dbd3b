use anyhow::{bail, Context, Result};
use rusqlite::Connection;

/// Schema scripts in order; `user_version` records how many have been applied.
const MIGRATIONS: &[&str] = &[include_str!("schemas/schema_v1.sql")];

pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    let applied: usize = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .context("failed to read user_version pragma")?;

    if applied > MIGRATIONS.len() {
        bail!(
            "database schema v{applied} is newer than this build supports (v{})",
            MIGRATIONS.len()
        );
    }

    let pending = &MIGRATIONS[applied..];
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn
        .transaction()
        .context("failed to open migration transaction")?;
    for (offset, script) in pending.iter().enumerate() {
        let version = applied + offset + 1;
        tx.execute_batch(script)
            .with_context(|| format!("migration to v{version} failed"))?;
    }
    tx.pragma_update(None, "user_version", MIGRATIONS.len())
        .context("failed to update user_version pragma")?;
    tx.commit().context("failed to commit migrations")
}
