//! SQLite persistence for storage configuration.

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Row, params};
use yorozu_types::{Storage, StorageId};

use super::{RepoError, RepoResult, StorageRepository};

/// SQLite-backed [`StorageRepository`].
///
/// The table is named `{prefix}storages`; `mount_path` is unique so two
/// active storages can never claim the same registry key.
pub struct SqliteStorageRepository {
    conn: Mutex<Connection>,
    table: String,
}

impl std::fmt::Debug for SqliteStorageRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStorageRepository")
            .field("table", &self.table)
            .finish()
    }
}

fn schema(table: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {table} (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    mount_path TEXT NOT NULL UNIQUE,
    "index" INTEGER NOT NULL DEFAULT 0,
    driver TEXT NOT NULL,
    addition TEXT NOT NULL DEFAULT '',
    modified INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_{table}_index ON {table}("index");
"#
    )
}

fn row_to_storage(row: &Row<'_>) -> rusqlite::Result<Storage> {
    let id: i64 = row.get(0)?;
    let modified: i64 = row.get(5)?;
    Ok(Storage {
        id: StorageId::new(id as u64),
        mount_path: row.get(1)?,
        index: row.get(2)?,
        driver: row.get(3)?,
        addition: row.get(4)?,
        modified: modified as u64,
    })
}

impl SqliteStorageRepository {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P, table_prefix: &str) -> RepoResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::with_connection(Connection::open(path)?, table_prefix)
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory(table_prefix: &str) -> RepoResult<Self> {
        Self::with_connection(Connection::open_in_memory()?, table_prefix)
    }

    fn with_connection(conn: Connection, table_prefix: &str) -> RepoResult<Self> {
        let table = format!("{table_prefix}storages");
        conn.execute_batch(&schema(&table))?;
        Ok(Self {
            conn: Mutex::new(conn),
            table,
        })
    }

    /// Name of the backing table.
    pub fn table(&self) -> &str {
        &self.table
    }
}

impl StorageRepository for SqliteStorageRepository {
    fn create(&self, storage: &Storage) -> RepoResult<StorageId> {
        let conn = self.conn.lock();
        conn.execute(
            &format!(
                r#"INSERT INTO {} (mount_path, "index", driver, addition, modified)
                   VALUES (?1, ?2, ?3, ?4, ?5)"#,
                self.table
            ),
            params![
                storage.mount_path,
                storage.index,
                storage.driver,
                storage.addition,
                storage.modified as i64,
            ],
        )?;
        Ok(StorageId::new(conn.last_insert_rowid() as u64))
    }

    fn update(&self, storage: &Storage) -> RepoResult<()> {
        let changed = self.conn.lock().execute(
            &format!(
                r#"UPDATE {} SET mount_path = ?1, "index" = ?2, driver = ?3, addition = ?4, modified = ?5
                   WHERE id = ?6"#,
                self.table
            ),
            params![
                storage.mount_path,
                storage.index,
                storage.driver,
                storage.addition,
                storage.modified as i64,
                storage.id.get() as i64,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(storage.id));
        }
        Ok(())
    }

    fn delete_by_id(&self, id: StorageId) -> RepoResult<()> {
        let changed = self.conn.lock().execute(
            &format!("DELETE FROM {} WHERE id = ?1", self.table),
            params![id.get() as i64],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn get_by_id(&self, id: StorageId) -> RepoResult<Storage> {
        self.conn
            .lock()
            .query_row(
                &format!(
                    r#"SELECT id, mount_path, "index", driver, addition, modified
                       FROM {} WHERE id = ?1"#,
                    self.table
                ),
                params![id.get() as i64],
                row_to_storage,
            )
            .optional()?
            .ok_or(RepoError::NotFound(id))
    }

    fn list(&self, page_index: usize, page_size: usize) -> RepoResult<(Vec<Storage>, u64)> {
        let conn = self.conn.lock();
        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", self.table),
            [],
            |row| row.get(0),
        )?;

        let offset = page_index.saturating_sub(1) * page_size;
        let mut stmt = conn.prepare(&format!(
            r#"SELECT id, mount_path, "index", driver, addition, modified
               FROM {} ORDER BY "index", id LIMIT ?1 OFFSET ?2"#,
            self.table
        ))?;
        let rows = stmt.query_map(params![page_size as i64, offset as i64], row_to_storage)?;
        let storages = rows.collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((storages, total as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> SqliteStorageRepository {
        SqliteStorageRepository::in_memory("x_").unwrap()
    }

    #[test]
    fn test_storage_crud() {
        let repo = repo();
        let mut storage = Storage::new("/cloud", "local")
            .with_index(2)
            .with_addition(r#"{"root_folder":"/srv"}"#);
        storage.modified = 1_700_000_000_000;

        let id = repo.create(&storage).unwrap();
        assert!(id.is_assigned());

        let loaded = repo.get_by_id(id).unwrap();
        assert_eq!(loaded, storage.clone().with_id(id));

        let updated = loaded.with_index(5);
        repo.update(&updated).unwrap();
        assert_eq!(repo.get_by_id(id).unwrap().index, 5);

        repo.delete_by_id(id).unwrap();
        assert!(matches!(repo.get_by_id(id), Err(RepoError::NotFound(_))));
    }

    #[test]
    fn test_missing_rows() {
        let repo = repo();
        let ghost = Storage::new("/ghost", "local").with_id(StorageId::new(99));
        assert!(matches!(repo.update(&ghost), Err(RepoError::NotFound(_))));
        assert!(matches!(
            repo.delete_by_id(StorageId::new(99)),
            Err(RepoError::NotFound(_))
        ));
    }

    #[test]
    fn test_mount_path_unique() {
        let repo = repo();
        repo.create(&Storage::new("/same", "local")).unwrap();
        let result = repo.create(&Storage::new("/same", "memory"));
        assert!(matches!(result, Err(RepoError::Sqlite(_))));
    }

    #[test]
    fn test_list_orders_by_index_and_pages() {
        let repo = repo();
        repo.create(&Storage::new("/c", "memory").with_index(3)).unwrap();
        repo.create(&Storage::new("/a", "memory").with_index(1)).unwrap();
        repo.create(&Storage::new("/b", "memory").with_index(2)).unwrap();

        let (page, total) = repo.list(1, 2).unwrap();
        assert_eq!(total, 3);
        let paths: Vec<_> = page.iter().map(|s| s.mount_path.as_str()).collect();
        assert_eq!(paths, vec!["/a", "/b"]);

        let (page, _) = repo.list(2, 2).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].mount_path, "/c");

        let (page, _) = repo.list(3, 2).unwrap();
        assert!(page.is_empty());
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("data.db");

        let id = {
            let repo = SqliteStorageRepository::open(&path, "y_").unwrap();
            assert_eq!(repo.table(), "y_storages");
            repo.create(&Storage::new("/persisted", "memory")).unwrap()
        };

        let reopened = SqliteStorageRepository::open(&path, "y_").unwrap();
        assert_eq!(reopened.get_by_id(id).unwrap().mount_path, "/persisted");
    }
}
