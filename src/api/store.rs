//! SQLite persistence for users and todos.
//!
//! One connection behind a mutex. Every query is parameterised and every
//! todo query is scoped to its owner, so one user can never see, toggle or
//! delete another user's rows.

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{Connection, ErrorCode, OptionalExtension, params};
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to create database directory: {0}")]
    Io(#[from] std::io::Error),
}

/// A user as returned to clients.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct User {
    pub id: i64,
    pub email: String,
}

/// A user row including the password digest. Never serialised.
#[derive(Clone, Debug)]
pub struct Credentials {
    pub user: User,
    pub password_hash: String,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Todo {
    pub id: i64,
    pub title: String,
    pub done: bool,
}

pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Opens (creating if needed) the database at `path` and runs the schema.
    /// `":memory:"` opens a private in-memory database.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            Connection::open(path)?
        };

        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS users (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                email         TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS todos (
                id      INTEGER PRIMARY KEY AUTOINCREMENT,
                title   TEXT NOT NULL,
                done    INTEGER NOT NULL DEFAULT 0,
                user_id INTEGER NOT NULL REFERENCES users(id)
            );

            CREATE INDEX IF NOT EXISTS todos_user_id ON todos(user_id);
            ",
        )?;

        info!(path, "database ready");
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn find_credentials(&self, email: &str) -> Result<Option<Credentials>, StoreError> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT id, email, password_hash FROM users WHERE email = ?1",
                params![email],
                |row| {
                    Ok(Credentials {
                        user: User { id: row.get(0)?, email: row.get(1)? },
                        password_hash: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Inserts a user. Returns `None` when the email is already taken.
    pub fn insert_user(&self, email: &str, password_hash: &str) -> Result<Option<User>, StoreError> {
        let conn = self.conn.lock();
        match conn.execute(
            "INSERT INTO users (email, password_hash) VALUES (?1, ?2)",
            params![email, password_hash],
        ) {
            Ok(_) => Ok(Some(User { id: conn.last_insert_rowid(), email: email.to_owned() })),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                debug!(email, "email already registered");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// A page of the owner's todos, newest first, plus the owner's total count.
    pub fn list_todos(&self, owner: i64, limit: u32, offset: u64) -> Result<(Vec<Todo>, i64), StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, title, done FROM todos WHERE user_id = ?1 ORDER BY id DESC LIMIT ?2 OFFSET ?3",
        )?;
        let items = stmt
            .query_map(params![owner, limit, offset], todo_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        let total = conn.query_row(
            "SELECT COUNT(*) FROM todos WHERE user_id = ?1",
            params![owner],
            |row| row.get(0),
        )?;
        Ok((items, total))
    }

    pub fn create_todo(&self, owner: i64, title: &str) -> Result<Todo, StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO todos (title, done, user_id) VALUES (?1, 0, ?2)",
            params![title, owner],
        )?;
        Ok(Todo { id: conn.last_insert_rowid(), title: title.to_owned(), done: false })
    }

    /// Flips `done` on the owner's todo. `None` when no such todo exists for them.
    pub fn toggle_todo(&self, owner: i64, id: i64) -> Result<Option<Todo>, StoreError> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE todos SET done = 1 - done WHERE id = ?1 AND user_id = ?2",
            params![id, owner],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        let todo = conn.query_row(
            "SELECT id, title, done FROM todos WHERE id = ?1 AND user_id = ?2",
            params![id, owner],
            todo_from_row,
        )?;
        Ok(Some(todo))
    }

    /// Deletes the owner's todo. `false` when no such todo exists for them.
    pub fn delete_todo(&self, owner: i64, id: i64) -> Result<bool, StoreError> {
        let conn = self.conn.lock();
        let deleted = conn.execute(
            "DELETE FROM todos WHERE id = ?1 AND user_id = ?2",
            params![id, owner],
        )?;
        Ok(deleted > 0)
    }
}

fn todo_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Todo> {
    Ok(Todo {
        id: row.get(0)?,
        title: row.get(1)?,
        done: row.get::<_, i64>(2)? != 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_user(email: &str) -> (Store, User) {
        let store = Store::open(":memory:").unwrap();
        let user = store.insert_user(email, "digest").unwrap().unwrap();
        (store, user)
    }

    #[test]
    fn duplicate_email_is_none() {
        let (store, user) = store_with_user("a@b.com");
        assert_eq!(user.email, "a@b.com");
        assert!(store.insert_user("a@b.com", "other").unwrap().is_none());

        let creds = store.find_credentials("a@b.com").unwrap().unwrap();
        assert_eq!(creds.user, user);
        assert_eq!(creds.password_hash, "digest");
        assert!(store.find_credentials("nobody@b.com").unwrap().is_none());
    }

    #[test]
    fn todos_are_scoped_to_their_owner() {
        let (store, alice) = store_with_user("alice@x.io");
        let bob = store.insert_user("bob@x.io", "d").unwrap().unwrap();

        let todo = store.create_todo(alice.id, "buy milk").unwrap();
        assert!(!todo.done);

        assert!(store.toggle_todo(bob.id, todo.id).unwrap().is_none());
        assert!(!store.delete_todo(bob.id, todo.id).unwrap());
        assert_eq!(store.list_todos(bob.id, 10, 0).unwrap(), (vec![], 0));

        let toggled = store.toggle_todo(alice.id, todo.id).unwrap().unwrap();
        assert!(toggled.done);
        let toggled = store.toggle_todo(alice.id, todo.id).unwrap().unwrap();
        assert!(!toggled.done);

        assert!(store.delete_todo(alice.id, todo.id).unwrap());
        assert!(store.toggle_todo(alice.id, todo.id).unwrap().is_none());
    }

    #[test]
    fn listing_is_newest_first_and_paged() {
        let (store, user) = store_with_user("p@x.io");
        for i in 1..=5 {
            store.create_todo(user.id, &format!("t{i}")).unwrap();
        }

        let (page, total) = store.list_todos(user.id, 2, 0).unwrap();
        assert_eq!(total, 5);
        assert_eq!(page.iter().map(|t| t.title.as_str()).collect::<Vec<_>>(), ["t5", "t4"]);

        let (page, _) = store.list_todos(user.id, 2, 4).unwrap();
        assert_eq!(page.iter().map(|t| t.title.as_str()).collect::<Vec<_>>(), ["t1"]);
    }
}
