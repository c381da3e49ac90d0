use crate::models::{NewRecording, Recording};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions, sqlite::SqliteConnectOptions};
use std::str::FromStr;
use std::time::Duration;

pub const MAX_LIST_LIMIT: i64 = 1000;

#[derive(Clone)]
pub struct Db(pub SqlitePool);
impl Db {
    pub async fn connect_and_migrate(path: &str) -> anyhow::Result<Self> {
        let opts = SqliteConnectOptions::from_str(&format!("sqlite://{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(opts).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Db(pool))
    }

    pub async fn insert_recording(&self, new: NewRecording) -> Result<Recording, sqlx::Error> {
        let created_at = chrono::Utc::now();
        let id = sqlx::query("INSERT INTO recordings(filename, filepath, filesize, created_at) VALUES (?, ?, ?, ?)")
            .bind(&new.filename).bind(&new.filepath).bind(new.filesize).bind(created_at)
            .execute(&self.0).await?
            .last_insert_rowid();

        Ok(Recording {
            id,
            filename: new.filename,
            filepath: new.filepath,
            filesize: new.filesize,
            created_at,
        })
    }

    /// Newest first. `limit` is clamped to `1..=MAX_LIST_LIMIT`; `None` returns every row.
    pub async fn list_recordings(&self, limit: Option<i64>) -> Result<Vec<Recording>, sqlx::Error> {
        let limit = limit.map_or(-1, |l| l.clamp(1, MAX_LIST_LIMIT));
        sqlx::query_as::<_, Recording>(
            "SELECT id, filename, filepath, filesize, created_at FROM recordings
             ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.0)
        .await
    }

    pub async fn find_recording(&self, id: i64) -> Result<Option<Recording>, sqlx::Error> {
        sqlx::query_as::<_, Recording>(
            "SELECT id, filename, filepath, filesize, created_at FROM recordings WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.0)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_db(dir: &tempfile::TempDir) -> Db {
        let path = dir.path().join("test.db");
        Db::connect_and_migrate(path.to_str().unwrap()).await.unwrap()
    }

    fn new_recording(name: &str, size: i64) -> NewRecording {
        NewRecording {
            filename: name.to_string(),
            filepath: format!("uploads/1-{name}"),
            filesize: size,
        }
    }

    #[actix_web::test]
    async fn migrate_twice_is_harmless() {
        let dir = tempfile::tempdir().unwrap();
        let db = temp_db(&dir).await;
        db.insert_recording(new_recording("a.webm", 3)).await.unwrap();
        db.0.close().await;

        let db = temp_db(&dir).await;
        assert_eq!(db.list_recordings(None).await.unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn ids_increase_and_list_is_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let db = temp_db(&dir).await;

        let first = db.insert_recording(new_recording("first.webm", 10)).await.unwrap();
        let second = db.insert_recording(new_recording("second.webm", 20)).await.unwrap();
        assert!(second.id > first.id);

        let rows = db.list_recordings(None).await.unwrap();
        let names: Vec<_> = rows.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, ["second.webm", "first.webm"]);
        assert_eq!(rows[1].filesize, 10);
        assert_eq!(rows[1].filepath, "uploads/1-first.webm");
    }

    #[actix_web::test]
    async fn limit_is_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let db = temp_db(&dir).await;
        for i in 0..3 {
            db.insert_recording(new_recording(&format!("{i}.webm"), i)).await.unwrap();
        }

        assert_eq!(db.list_recordings(Some(2)).await.unwrap().len(), 2);
        assert_eq!(db.list_recordings(Some(0)).await.unwrap().len(), 1);
        assert_eq!(db.list_recordings(Some(-5)).await.unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn find_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let db = temp_db(&dir).await;
        let stored = db.insert_recording(new_recording("clip.webm", 42)).await.unwrap();

        let found = db.find_recording(stored.id).await.unwrap().unwrap();
        assert_eq!(found.filename, "clip.webm");
        assert_eq!(found.filesize, 42);
        assert!(db.find_recording(stored.id + 1).await.unwrap().is_none());
    }
}
