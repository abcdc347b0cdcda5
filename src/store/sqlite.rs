use super::{Catalog, ResultStore};
use crate::domain::{
    NewTestResult, Project, ProjectId, Route, RouteId, StoredBody, Test, TestId, TestResult,
    UserId,
};
use crate::error::{EngineError, EngineResult};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  username TEXT NOT NULL,
  email TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS projects (
  project_id INTEGER PRIMARY KEY AUTOINCREMENT,
  project_name TEXT NOT NULL,
  business_logic TEXT NOT NULL DEFAULT '',
  project_url TEXT NOT NULL,
  user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE
);
CREATE TABLE IF NOT EXISTS routes (
  route_id INTEGER PRIMARY KEY AUTOINCREMENT,
  routename TEXT NOT NULL,
  method TEXT NOT NULL DEFAULT 'GET',
  project_id INTEGER NOT NULL REFERENCES projects(project_id) ON DELETE CASCADE
);
CREATE TABLE IF NOT EXISTS tests (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  body TEXT NOT NULL,
  user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
  project_id INTEGER NOT NULL REFERENCES projects(project_id) ON DELETE CASCADE,
  route_id INTEGER NOT NULL REFERENCES routes(route_id) ON DELETE CASCADE,
  created_at INTEGER NOT NULL DEFAULT (strftime('%s','now')),
  updated_at INTEGER NOT NULL DEFAULT (strftime('%s','now'))
);
CREATE TABLE IF NOT EXISTS test_results (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  test_id INTEGER NOT NULL REFERENCES tests(id) ON DELETE CASCADE,
  passed INTEGER NOT NULL,
  actual_status INTEGER,
  actual_body TEXT,
  created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_tests_route ON tests(route_id, id);
CREATE INDEX IF NOT EXISTS idx_tests_project ON tests(project_id, id);
CREATE INDEX IF NOT EXISTS idx_test_results_latest ON test_results(test_id, created_at, id);
";

/// SQLite-backed catalog and result history.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

impl SqliteStore {
    pub fn open(path: &Path) -> EngineResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> EngineResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> EngineResult<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> MutexGuard<'_, Connection> {
        self.lock()
    }

    // ─── Fixture / seeding helpers ───────────────────────────────────────────

    pub fn insert_user(&self, username: &str, email: &str) -> EngineResult<UserId> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO users (username, email) VALUES (?1, ?2);",
            params![username, email],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn insert_project(
        &self,
        user_id: UserId,
        name: &str,
        business_logic: &str,
        base_url: &str,
    ) -> EngineResult<ProjectId> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO projects (project_name, business_logic, project_url, user_id)
             VALUES (?1, ?2, ?3, ?4);",
            params![name, business_logic, base_url, user_id],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn insert_route(
        &self,
        project_id: ProjectId,
        routename: &str,
        method: &str,
    ) -> EngineResult<RouteId> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO routes (routename, method, project_id) VALUES (?1, ?2, ?3);",
            params![routename, method, project_id],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn insert_test(
        &self,
        user_id: UserId,
        project_id: ProjectId,
        route_id: RouteId,
        body: &str,
    ) -> EngineResult<TestId> {
        let conn = self.lock();
        let route_project: Option<ProjectId> = conn
            .query_row(
                "SELECT project_id FROM routes WHERE route_id = ?1;",
                params![route_id],
                |row| row.get(0),
            )
            .optional()?;
        if route_project != Some(project_id) {
            return Err(EngineError::not_found("route", route_id));
        }
        conn.execute(
            "INSERT INTO tests (body, user_id, project_id, route_id) VALUES (?1, ?2, ?3, ?4);",
            params![body, user_id, project_id, route_id],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Deleting a test drops its result history with it.
    pub fn delete_test(&self, test_id: TestId) -> EngineResult<bool> {
        let conn = self.lock();
        let deleted = conn.execute("DELETE FROM tests WHERE id = ?1;", params![test_id])?;
        Ok(deleted > 0)
    }
}

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        business_logic: row.get(2)?,
        base_url: row.get(3)?,
        user_id: row.get(4)?,
    })
}

fn route_from_row(row: &Row<'_>) -> rusqlite::Result<Route> {
    Ok(Route {
        id: row.get(0)?,
        name: row.get(1)?,
        method: row.get(2)?,
        project_id: row.get(3)?,
    })
}

fn test_from_row(row: &Row<'_>) -> rusqlite::Result<Test> {
    Ok(Test {
        id: row.get(0)?,
        body: StoredBody::Text(row.get(1)?),
        user_id: row.get(2)?,
        project_id: row.get(3)?,
        route_id: row.get(4)?,
    })
}

fn result_from_row(row: &Row<'_>) -> rusqlite::Result<TestResult> {
    let micros: i64 = row.get(5)?;
    let created_at = DateTime::<Utc>::from_timestamp_micros(micros).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(5, Type::Integer, "timestamp out of range".into())
    })?;
    Ok(TestResult {
        id: row.get(0)?,
        test_id: row.get(1)?,
        passed: row.get(2)?,
        actual_status: row.get(3)?,
        actual_body: row.get(4)?,
        created_at,
    })
}

const TEST_COLUMNS: &str = "id, body, user_id, project_id, route_id";

impl Catalog for SqliteStore {
    fn user_exists(&self, user_id: UserId) -> EngineResult<bool> {
        let found = self
            .lock()
            .query_row(
                "SELECT 1 FROM users WHERE id = ?1 LIMIT 1;",
                params![user_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn project(&self, project_id: ProjectId) -> EngineResult<Option<Project>> {
        Ok(self
            .lock()
            .query_row(
                "SELECT project_id, project_name, business_logic, project_url, user_id
                 FROM projects WHERE project_id = ?1;",
                params![project_id],
                project_from_row,
            )
            .optional()?)
    }

    fn route(&self, route_id: RouteId) -> EngineResult<Option<Route>> {
        Ok(self
            .lock()
            .query_row(
                "SELECT route_id, routename, method, project_id FROM routes WHERE route_id = ?1;",
                params![route_id],
                route_from_row,
            )
            .optional()?)
    }

    fn test(&self, test_id: TestId) -> EngineResult<Option<Test>> {
        Ok(self
            .lock()
            .query_row(
                &format!("SELECT {TEST_COLUMNS} FROM tests WHERE id = ?1;"),
                params![test_id],
                test_from_row,
            )
            .optional()?)
    }

    fn routes_in_project(&self, project_id: ProjectId) -> EngineResult<Vec<Route>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT route_id, routename, method, project_id FROM routes
             WHERE project_id = ?1 ORDER BY route_id ASC;",
        )?;
        let rows = stmt
            .query_map(params![project_id], route_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn tests_in_route(&self, route_id: RouteId) -> EngineResult<Vec<Test>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TEST_COLUMNS} FROM tests WHERE route_id = ?1 ORDER BY id ASC;"
        ))?;
        let rows = stmt
            .query_map(params![route_id], test_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

impl ResultStore for SqliteStore {
    fn append_results(&self, batch: &[NewTestResult]) -> EngineResult<Vec<TestResult>> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let mut stored = Vec::with_capacity(batch.len());
        {
            let mut stmt = tx.prepare(
                "INSERT INTO test_results (test_id, passed, actual_status, actual_body, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5);",
            )?;
            for row in batch {
                stmt.execute(params![
                    row.test_id,
                    row.passed,
                    row.actual_status,
                    row.actual_body,
                    row.created_at.timestamp_micros(),
                ])?;
                stored.push(TestResult {
                    id: tx.last_insert_rowid(),
                    test_id: row.test_id,
                    passed: row.passed,
                    actual_status: row.actual_status,
                    actual_body: row.actual_body.clone(),
                    created_at: row.created_at,
                });
            }
        }
        tx.commit()?;
        Ok(stored)
    }

    fn history(&self, test_id: TestId) -> EngineResult<Vec<TestResult>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, test_id, passed, actual_status, actual_body, created_at
             FROM test_results WHERE test_id = ?1
             ORDER BY created_at ASC, id ASC;",
        )?;
        let rows = stmt
            .query_map(params![test_id], result_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn seeded() -> (SqliteStore, UserId, ProjectId, RouteId) {
        let store = SqliteStore::open_in_memory().expect("open store");
        let user = store.insert_user("ada", "ada@example.com").expect("user");
        let project = store
            .insert_project(user, "shop", "sells things", "http://shop.test")
            .expect("project");
        let route = store.insert_route(project, "/login", "POST").expect("route");
        (store, user, project, route)
    }

    fn new_result(test_id: TestId, micros: i64, passed: bool) -> NewTestResult {
        NewTestResult {
            test_id,
            passed,
            actual_status: Some(200),
            actual_body: Some("{}".to_string()),
            created_at: Utc.timestamp_micros(micros).single().expect("timestamp"),
        }
    }

    #[test]
    fn catalog_lookups_follow_ownership() {
        let (store, user, project, route) = seeded();
        let first = store.insert_test(user, project, route, "{}").expect("test");
        let second = store.insert_test(user, project, route, "[]").expect("test");

        assert!(store.user_exists(user).unwrap());
        assert!(!store.user_exists(user + 100).unwrap());
        assert_eq!(store.project(project).unwrap().unwrap().base_url, "http://shop.test");
        assert_eq!(store.route(route).unwrap().unwrap().method, "POST");
        assert_eq!(store.routes_in_project(project).unwrap().len(), 1);

        let ids: Vec<TestId> = store
            .tests_in_route(route)
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![first, second]);
        assert_eq!(store.tests_in_project(project).unwrap().len(), 2);
        assert_eq!(
            store.test(first).unwrap().unwrap().body,
            StoredBody::Text("{}".to_string())
        );
        assert!(store.test(999).unwrap().is_none());
    }

    #[test]
    fn insert_test_requires_route_of_same_project() {
        let (store, user, project, route) = seeded();
        let other = store
            .insert_project(user, "blog", "", "http://blog.test")
            .expect("project");

        let err = store.insert_test(user, other, route, "{}").unwrap_err();
        assert!(matches!(err, EngineError::NotFound { entity: "route", .. }));
        let err = store.insert_test(user, project, 9_999, "{}").unwrap_err();
        assert!(matches!(err, EngineError::NotFound { entity: "route", .. }));
        assert!(store.tests_in_route(route).unwrap().is_empty());
    }

    #[test]
    fn append_assigns_ids_and_history_is_ordered() {
        let (store, user, project, route) = seeded();
        let test = store.insert_test(user, project, route, "{}").expect("test");

        store
            .append_results(&[new_result(test, 2_000, false)])
            .expect("append");
        let stored = store
            .append_results(&[new_result(test, 1_000, true)])
            .expect("append");
        assert_eq!(stored.len(), 1);

        let history = store.history(test).expect("history");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].created_at.timestamp_micros(), 1_000);
        assert!(history[0].passed);
        assert_eq!(history[1].created_at.timestamp_micros(), 2_000);
    }

    #[test]
    fn failed_batch_writes_nothing() {
        let (store, user, project, route) = seeded();
        let test = store.insert_test(user, project, route, "{}").expect("test");

        // Second row violates the foreign key, so the whole batch rolls back.
        let result = store.append_results(&[new_result(test, 1, true), new_result(9_999, 2, true)]);
        assert!(result.is_err());
        assert!(store.history(test).expect("history").is_empty());
    }

    #[test]
    fn deleting_a_test_cascades_to_results() {
        let (store, user, project, route) = seeded();
        let test = store.insert_test(user, project, route, "{}").expect("test");
        store
            .append_results(&[new_result(test, 1, true)])
            .expect("append");

        assert!(store.delete_test(test).expect("delete"));
        assert!(store.history(test).expect("history").is_empty());
    }

    #[test]
    fn open_creates_file_backed_database() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("routecheck.db");
        let store = SqliteStore::open(&path).expect("open");
        store.insert_user("bob", "bob@example.com").expect("user");
        assert!(path.exists());
    }
}
