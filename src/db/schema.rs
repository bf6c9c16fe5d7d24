use rusqlite::{Connection, Result};

pub fn run_migrations(conn: &Connection) -> Result<()> {
  // Complete schema for new databases; upgrades for older ones follow below
  conn.execute_batch(
    r#"
    CREATE TABLE IF NOT EXISTS card_studies (
      user_id TEXT NOT NULL,
      phrase_id INTEGER NOT NULL,
      due_date TEXT NOT NULL,
      stability REAL NOT NULL DEFAULT 0,
      difficulty REAL NOT NULL DEFAULT 0,
      elapsed_days REAL NOT NULL DEFAULT 0,
      scheduled_days REAL NOT NULL DEFAULT 0,
      reps INTEGER NOT NULL DEFAULT 0,
      lapses INTEGER NOT NULL DEFAULT 0,
      state TEXT NOT NULL DEFAULT 'New',
      last_review TEXT,
      last_rating INTEGER,
      PRIMARY KEY (user_id, phrase_id)
    );

    CREATE TABLE IF NOT EXISTS review_logs (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      user_id TEXT NOT NULL,
      phrase_id INTEGER NOT NULL,
      rating INTEGER NOT NULL,
      previous_state TEXT NOT NULL,
      state TEXT NOT NULL,
      elapsed_days REAL NOT NULL,
      scheduled_days REAL NOT NULL,
      stability REAL NOT NULL,
      difficulty REAL NOT NULL,
      reviewed_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_card_studies_due ON card_studies(user_id, due_date);
    CREATE INDEX IF NOT EXISTS idx_review_logs_card ON review_logs(user_id, phrase_id);
    CREATE INDEX IF NOT EXISTS idx_review_logs_reviewed_at ON review_logs(reviewed_at);
    "#,
  )?;

  // ============================================================
  // MIGRATIONS FOR EXISTING DATABASES
  // No-ops for new databases (columns already exist)
  // ============================================================

  // Early card_studies tables only stored the outcome, not the rating that produced it
  add_column_if_missing(conn, "card_studies", "last_rating", "INTEGER")?;
  add_column_if_missing(conn, "card_studies", "elapsed_days", "REAL NOT NULL DEFAULT 0")?;

  Ok(())
}

/// Check if a column exists in a table
fn column_exists(conn: &Connection, table: &str, column: &str) -> bool {
  conn
    .prepare(&format!("SELECT {} FROM {} LIMIT 1", column, table))
    .is_ok()
}

/// Add a column if it doesn't already exist
fn add_column_if_missing(conn: &Connection, table: &str, column: &str, column_def: &str) -> Result<()> {
  if !column_exists(conn, table, column) {
    conn.execute(
      &format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, column_def),
      [],
    )?;
  }
  Ok(())
}
