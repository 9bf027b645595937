use crate::config::Config;
use crate::model::{SaveOutcome, ToggleOutcome, WordEntry};
use anyhow::Result;
use libsql::{Builder, Connection, Database as LibsqlDatabase};
use std::path::Path;
use std::time::Duration;

const SYSTEM_MIGRATIONS: &[(&str, &str)] = &[(
    "system/000_migrations_table.sql",
    include_str!("migrations/system/000_migrations_table.sql"),
)];

const MIGRATIONS: &[(&str, &str)] = &[("001_schema.sql", include_str!("migrations/001_schema.sql"))];

pub struct Database {
    db: LibsqlDatabase,
    conn: Connection,
    turso_url: Option<String>,
    turso_auth_token: Option<String>,
}

impl Database {
    pub fn is_replica(turso_url: &Option<String>, turso_auth_token: &Option<String>) -> bool {
        turso_url.is_some() && turso_auth_token.is_some()
    }

    /// Force a replica sync. A no-op for local databases.
    pub async fn sync(&self) -> Result<()> {
        if Self::is_replica(&self.turso_url, &self.turso_auth_token) {
            self.db
                .sync()
                .await
                .map_err(|e| anyhow::anyhow!("sync failed: {}", e))?;
        }
        Ok(())
    }

    async fn is_migration_applied(conn: &Connection, name: &str) -> Result<bool> {
        let query = "SELECT 1 FROM _migrations WHERE name = ?";
        match conn.query(query, libsql::params![name]).await {
            Ok(mut rows) => Ok(rows.next().await?.is_some()),
            Err(e) => {
                if e.to_string().contains("no such table") {
                    Ok(false)
                } else {
                    Err(e.into())
                }
            }
        }
    }

    async fn record_migration(conn: &Connection, name: &str) -> Result<()> {
        let query = r#"
            INSERT INTO _migrations (name, applied_at)
            VALUES (?, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        "#;
        match conn.execute(query, libsql::params![name]).await {
            Ok(_) => Ok(()),
            Err(e) => {
                if e.to_string().contains("no such table") {
                    Ok(())
                } else {
                    Err(e.into())
                }
            }
        }
    }

    async fn run_migration(conn: &Connection, name: &str, sql: &str) -> Result<()> {
        if Self::is_migration_applied(conn, name).await? {
            tracing::debug!("migration {} already applied, skipping", name);
            return Ok(());
        }

        tracing::info!("applying migration: {}", name);
        conn.execute_batch(sql)
            .await
            .map_err(|e| anyhow::anyhow!("failed to execute migration {name}: {e}"))?;

        Self::record_migration(conn, name).await?;
        Ok(())
    }

    async fn migrate(conn: &Connection) -> Result<()> {
        for (filename, sql) in SYSTEM_MIGRATIONS {
            Self::run_migration(conn, filename, sql).await?;
        }

        for (filename, sql) in MIGRATIONS {
            Self::run_migration(conn, filename, sql).await?;
        }

        Ok(())
    }

    pub async fn new(cfg: &Config, data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(cfg.app.get_db());
        let turso_url = cfg.app.turso_url.clone();
        let turso_auth_token = cfg.app.turso_auth_token.clone();

        let db = match (&turso_url, &turso_auth_token) {
            (Some(url), Some(token)) => {
                tracing::info!("[db] running in synced database mode (offline writes)");
                let sync_interval = Duration::from_secs(cfg.app.sync_interval_seconds);
                Builder::new_synced_database(&path, url.clone(), token.clone())
                    .sync_interval(sync_interval)
                    .build()
                    .await?
            }
            _ => Builder::new_local(&path).build().await?,
        };

        let conn = db.connect()?;
        conn.query("SELECT 1", ()).await?;

        Self::migrate(&conn).await?;

        Ok(Database {
            db,
            conn,
            turso_url,
            turso_auth_token,
        })
    }

    #[cfg(test)]
    pub async fn in_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:").build().await?;
        let conn = db.connect()?;
        Self::migrate(&conn).await?;
        Ok(Database {
            db,
            conn,
            turso_url: None,
            turso_auth_token: None,
        })
    }

    /// All of an owner's entries, optionally narrowed to one familiarity
    /// state. No ordering is imposed on the result.
    pub async fn list_words(
        &self,
        owner_id: &str,
        unfamiliar: Option<bool>,
    ) -> Result<Vec<WordEntry>> {
        let mut words = Vec::new();

        if let Some(flag) = unfamiliar {
            let query = r#"
                SELECT id, owner_id, word, is_unfamiliar, created_at, updated_at
                FROM words
                WHERE owner_id = ? AND is_unfamiliar = ?
            "#;

            let mut rows = self
                .conn
                .query(query, libsql::params![owner_id, flag as i64])
                .await?;

            while let Some(row) = rows.next().await? {
                words.push(Self::row_to_word(&row)?);
            }
        } else {
            let query = r#"
                SELECT id, owner_id, word, is_unfamiliar, created_at, updated_at
                FROM words
                WHERE owner_id = ?
            "#;

            let mut rows = self.conn.query(query, libsql::params![owner_id]).await?;

            while let Some(row) = rows.next().await? {
                words.push(Self::row_to_word(&row)?);
            }
        }

        Ok(words)
    }

    /// Targeted single-match lookup. If duplicates exist, only one row is
    /// ever returned, so only one is ever affected by the caller.
    pub async fn find_word(&self, owner_id: &str, word: &str) -> Result<Option<WordEntry>> {
        let query = r#"
            SELECT id, owner_id, word, is_unfamiliar, created_at, updated_at
            FROM words
            WHERE owner_id = ? AND word = ?
            LIMIT 1
        "#;

        let mut rows = self
            .conn
            .query(query, libsql::params![owner_id, word])
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_word(&row)?))
        } else {
            Ok(None)
        }
    }

    /// Insert `word` for `owner_id` unless an identical entry already
    /// exists. The existence check and the insert are separate statements;
    /// two identical concurrent saves can both pass the check.
    pub async fn save_word(&self, owner_id: &str, word: &str) -> Result<SaveOutcome> {
        if self.find_word(owner_id, word).await?.is_some() {
            return Ok(SaveOutcome::Duplicate);
        }

        let query = r#"
            INSERT INTO words (owner_id, word, is_unfamiliar)
            VALUES (?, ?, 0)
            RETURNING id, owner_id, word, is_unfamiliar, created_at, updated_at
        "#;

        let mut rows = self
            .conn
            .query(query, libsql::params![owner_id, word])
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(SaveOutcome::Created(Self::row_to_word(&row)?))
        } else {
            anyhow::bail!("failed to save word")
        }
    }

    /// Delete the single matching entry. Returns whether a row was removed.
    pub async fn delete_word(&self, owner_id: &str, word: &str) -> Result<bool> {
        let entry = match self.find_word(owner_id, word).await? {
            Some(entry) => entry,
            None => return Ok(false),
        };

        let result = self
            .conn
            .execute("DELETE FROM words WHERE id = ?", libsql::params![entry.id])
            .await?;
        Ok(result > 0)
    }

    /// Set the familiarity flag on the owner's entry for `word`.
    pub async fn set_unfamiliar(
        &self,
        owner_id: &str,
        word: &str,
        flag: bool,
    ) -> Result<ToggleOutcome> {
        let entry = match self.find_word(owner_id, word).await? {
            Some(entry) => entry,
            None => return Ok(ToggleOutcome::NotFound),
        };

        if entry.is_unfamiliar == flag {
            return Ok(ToggleOutcome::AlreadySet);
        }

        let query = r#"
            UPDATE words
            SET is_unfamiliar = ?, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
            WHERE id = ?
        "#;

        self.conn
            .execute(query, libsql::params![flag as i64, entry.id])
            .await?;
        Ok(ToggleOutcome::Toggled)
    }

    fn row_to_word(row: &libsql::Row) -> Result<WordEntry> {
        let flag: i64 = row.get(3)?;

        Ok(WordEntry {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            word: row.get(2)?,
            is_unfamiliar: flag != 0,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: &str = "owner-1";

    #[tokio::test]
    async fn save_then_list_returns_single_entry() {
        let db = Database::in_memory().await.unwrap();

        let outcome = db.save_word(OWNER, "exam").await.unwrap();
        assert!(matches!(outcome, SaveOutcome::Created(_)));

        let words = db.list_words(OWNER, None).await.unwrap();
        assert_eq!(words.len(), 1);
        assert_eq!(words[0].word, "exam");
        assert!(!words[0].is_unfamiliar);
    }

    #[tokio::test]
    async fn duplicate_save_is_rejected_and_leaves_one_row() {
        let db = Database::in_memory().await.unwrap();

        assert!(matches!(
            db.save_word(OWNER, "exam").await.unwrap(),
            SaveOutcome::Created(_)
        ));
        assert!(matches!(
            db.save_word(OWNER, "exam").await.unwrap(),
            SaveOutcome::Duplicate
        ));

        let words = db.list_words(OWNER, None).await.unwrap();
        assert_eq!(words.len(), 1);
    }

    #[tokio::test]
    async fn owners_do_not_see_each_other() {
        let db = Database::in_memory().await.unwrap();

        db.save_word(OWNER, "exam").await.unwrap();
        db.save_word("owner-2", "apple").await.unwrap();

        let words = db.list_words(OWNER, None).await.unwrap();
        assert_eq!(words.len(), 1);
        assert_eq!(words[0].word, "exam");

        // same text is a fresh entry under another owner
        assert!(matches!(
            db.save_word("owner-2", "exam").await.unwrap(),
            SaveOutcome::Created(_)
        ));
    }

    #[tokio::test]
    async fn delete_removes_only_the_matching_entry() {
        let db = Database::in_memory().await.unwrap();

        db.save_word(OWNER, "exam").await.unwrap();
        db.save_word(OWNER, "apple").await.unwrap();

        assert!(db.delete_word(OWNER, "exam").await.unwrap());
        assert!(!db.delete_word(OWNER, "exam").await.unwrap());

        let words = db.list_words(OWNER, None).await.unwrap();
        assert_eq!(words.len(), 1);
        assert_eq!(words[0].word, "apple");
    }

    #[tokio::test]
    async fn toggle_distinguishes_all_three_outcomes() {
        let db = Database::in_memory().await.unwrap();
        db.save_word(OWNER, "exam").await.unwrap();

        assert_eq!(
            db.set_unfamiliar(OWNER, "exam", true).await.unwrap(),
            ToggleOutcome::Toggled
        );
        assert_eq!(
            db.set_unfamiliar(OWNER, "exam", true).await.unwrap(),
            ToggleOutcome::AlreadySet
        );
        assert_eq!(
            db.set_unfamiliar(OWNER, "missing", true).await.unwrap(),
            ToggleOutcome::NotFound
        );

        // flag survives the no-op second call
        let entry = db.find_word(OWNER, "exam").await.unwrap().unwrap();
        assert!(entry.is_unfamiliar);
    }

    #[tokio::test]
    async fn list_filters_by_familiarity_flag() {
        let db = Database::in_memory().await.unwrap();

        db.save_word(OWNER, "known").await.unwrap();
        db.save_word(OWNER, "unknown").await.unwrap();
        db.set_unfamiliar(OWNER, "unknown", true).await.unwrap();

        let unfamiliar = db.list_words(OWNER, Some(true)).await.unwrap();
        assert_eq!(unfamiliar.len(), 1);
        assert_eq!(unfamiliar[0].word, "unknown");

        let familiar = db.list_words(OWNER, Some(false)).await.unwrap();
        assert_eq!(familiar.len(), 1);
        assert_eq!(familiar[0].word, "known");

        let all = db.list_words(OWNER, None).await.unwrap();
        assert_eq!(all.len(), 2);
    }
}
