//! SQLite archive for mazekeeper
//!
//! Keeps mazes, the knowledge gathered about each maze across sessions, and
//! the event history of every recorded session.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use crate::config::MazePaths;
use crate::grid::Grid;
use crate::knowledge::{export, Knowledge};
use crate::session::Session;
use crate::validation::validate_maze_id;

/// Summary row for a stored maze
#[derive(Debug, Clone)]
pub struct MazeRow {
    pub id: String,
    pub rows: usize,
    pub cols: usize,
    pub keys: usize,
    pub known_cells: Option<usize>,
    pub updated_at: i64,
    pub created_at: i64,
}

/// A recorded session
#[derive(Debug, Clone)]
pub struct SessionRow {
    pub id: String,
    pub maze_id: String,
    pub policy: String,
    pub outcome: String,
    pub moves: usize,
    pub recorded_at: i64,
}

/// Database wrapper
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open an existing database
    pub fn open(paths: &MazePaths) -> Result<Self> {
        let conn =
            Connection::open(&paths.db_file).context("Failed to open mazekeeper database")?;
        Ok(Self { conn })
    }

    /// Initialize a new database with schema
    pub fn init(paths: &MazePaths) -> Result<Self> {
        let conn =
            Connection::open(&paths.db_file).context("Failed to create mazekeeper database")?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS mazes (
                id            TEXT PRIMARY KEY,
                rows          INTEGER NOT NULL,
                cols          INTEGER NOT NULL,
                keys          INTEGER NOT NULL,
                data          TEXT NOT NULL,
                updated_at    INTEGER NOT NULL,
                created_at    INTEGER NOT NULL
            )
            "#,
            [],
        )
        .context("Failed to create mazes table")?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS knowledge (
                maze_id       TEXT PRIMARY KEY,
                data          TEXT NOT NULL,
                known_cells   INTEGER NOT NULL,
                updated_at    INTEGER NOT NULL,
                FOREIGN KEY (maze_id) REFERENCES mazes(id)
            )
            "#,
            [],
        )
        .context("Failed to create knowledge table")?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id            TEXT PRIMARY KEY,
                maze_id       TEXT NOT NULL,
                policy        TEXT NOT NULL,
                outcome       TEXT NOT NULL,
                moves         INTEGER NOT NULL,
                recorded_at   INTEGER NOT NULL,
                FOREIGN KEY (maze_id) REFERENCES mazes(id)
            )
            "#,
            [],
        )
        .context("Failed to create sessions table")?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS session_events (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id  TEXT NOT NULL,
                seq         INTEGER NOT NULL,
                event       TEXT NOT NULL,
                FOREIGN KEY (session_id) REFERENCES sessions(id)
            )
            "#,
            [],
        )
        .context("Failed to create session_events table")?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_sessions_maze ON sessions(maze_id)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_events_session ON session_events(session_id)",
            [],
        )?;

        Ok(Self { conn })
    }

    /// Store a maze under `id`, replacing any maze with the same id.
    /// Replacing a maze discards the knowledge gathered about the old one.
    pub fn save_maze(&self, id: &str, grid: &Grid) -> Result<()> {
        validate_maze_id(id)?;
        let now = chrono::Utc::now().timestamp();
        let data = serde_json::to_string(grid).context("Failed to serialize maze")?;

        let existing: Option<String> = self
            .conn
            .query_row("SELECT data FROM mazes WHERE id = ?1", params![id], |row| row.get(0))
            .optional()?;
        if existing.as_deref().is_some_and(|old| old != data) {
            self.conn
                .execute("DELETE FROM knowledge WHERE maze_id = ?1", params![id])
                .context("Failed to drop stale knowledge")?;
            tracing::info!(maze = id, "maze replaced, stale knowledge dropped");
        }

        self.conn
            .execute(
                r#"
                INSERT INTO mazes (id, rows, cols, keys, data, updated_at, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                ON CONFLICT(id) DO UPDATE SET
                    rows = excluded.rows,
                    cols = excluded.cols,
                    keys = excluded.keys,
                    data = excluded.data,
                    updated_at = excluded.updated_at
                "#,
                params![
                    id,
                    grid.rows() as i64,
                    grid.cols() as i64,
                    grid.keys().len() as i64,
                    data,
                    now
                ],
            )
            .context("Failed to save maze")?;

        Ok(())
    }

    /// Get a maze by ID
    pub fn get_maze(&self, id: &str) -> Result<Option<Grid>> {
        let data: Option<String> = self
            .conn
            .query_row("SELECT data FROM mazes WHERE id = ?1", params![id], |row| row.get(0))
            .optional()?;

        data.map(|d| serde_json::from_str(&d).with_context(|| format!("Maze {} is corrupt", id)))
            .transpose()
    }

    /// List all mazes, most recently updated first
    pub fn list_mazes(&self) -> Result<Vec<MazeRow>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT m.id, m.rows, m.cols, m.keys, k.known_cells, m.updated_at, m.created_at
            FROM mazes m
            LEFT JOIN knowledge k ON k.maze_id = m.id
            ORDER BY m.updated_at DESC, m.id
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(MazeRow {
                id: row.get(0)?,
                rows: row.get::<_, i64>(1)? as usize,
                cols: row.get::<_, i64>(2)? as usize,
                keys: row.get::<_, i64>(3)? as usize,
                known_cells: row.get::<_, Option<i64>>(4)?.map(|n| n as usize),
                updated_at: row.get(5)?,
                created_at: row.get(6)?,
            })
        })?;

        let mut mazes = Vec::new();
        for row in rows {
            mazes.push(row?);
        }
        Ok(mazes)
    }

    /// Store the latest knowledge about a maze
    pub fn save_knowledge(&self, maze_id: &str, knowledge: &Knowledge) -> Result<()> {
        let data = export::export(knowledge).context("Failed to export knowledge")?;
        let now = chrono::Utc::now().timestamp();

        self.conn
            .execute(
                r#"
                INSERT INTO knowledge (maze_id, data, known_cells, updated_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(maze_id) DO UPDATE SET
                    data = excluded.data,
                    known_cells = excluded.known_cells,
                    updated_at = excluded.updated_at
                "#,
                params![maze_id, data, knowledge.len() as i64, now],
            )
            .context("Failed to save knowledge")?;

        tracing::info!(maze = maze_id, known = knowledge.len(), "knowledge saved");
        Ok(())
    }

    /// Knowledge gathered about a maze in earlier sessions
    pub fn load_knowledge(&self, maze_id: &str) -> Result<Option<Knowledge>> {
        let data: Option<String> = self
            .conn
            .query_row(
                "SELECT data FROM knowledge WHERE maze_id = ?1",
                params![maze_id],
                |row| row.get(0),
            )
            .optional()?;

        data.map(|d| {
            export::import(&d).with_context(|| format!("Knowledge for {} is corrupt", maze_id))
        })
        .transpose()
    }

    /// Record a session's outcome and its event history
    pub fn record_session(&mut self, maze_id: &str, session: &Session) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let tx = self.conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO sessions (id, maze_id, policy, outcome, moves, recorded_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                session.id().to_string(),
                maze_id,
                session.policy().to_string(),
                session.state().to_string(),
                session.moves() as i64,
                now
            ],
        )
        .context("Failed to record session")?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO session_events (session_id, seq, event) VALUES (?1, ?2, ?3)",
            )?;
            for (seq, event) in session.events().iter().enumerate() {
                stmt.execute(params![session.id().to_string(), seq as i64, event.as_string()])
                    .context("Failed to record session event")?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Sessions recorded for a maze, newest first
    pub fn list_sessions(&self, maze_id: &str) -> Result<Vec<SessionRow>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, maze_id, policy, outcome, moves, recorded_at
            FROM sessions WHERE maze_id = ?1
            ORDER BY recorded_at DESC, rowid DESC
            "#,
        )?;

        let rows = stmt.query_map(params![maze_id], |row| {
            Ok(SessionRow {
                id: row.get(0)?,
                maze_id: row.get(1)?,
                policy: row.get(2)?,
                outcome: row.get(3)?,
                moves: row.get::<_, i64>(4)? as usize,
                recorded_at: row.get(5)?,
            })
        })?;

        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row?);
        }
        Ok(sessions)
    }

    /// Events of one session in the order they happened
    pub fn session_events(&self, session_id: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT event FROM session_events WHERE session_id = ?1 ORDER BY seq",
        )?;
        let rows = stmt.query_map(params![session_id], |row| row.get::<_, String>(0))?;

        let mut events = Vec::new();
        for row in rows {
            events.push(row?);
        }
        Ok(events)
    }
}
