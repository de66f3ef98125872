// Schema and migrations

use super::*;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS files (
    id             INTEGER PRIMARY KEY,
    path           TEXT NOT NULL UNIQUE,
    language       TEXT NOT NULL,
    hash           TEXT NOT NULL,
    size           INTEGER NOT NULL DEFAULT 0,
    token_estimate INTEGER NOT NULL DEFAULT 0,
    class          TEXT NOT NULL DEFAULT 'code',
    indexed_at     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS symbols (
    id         INTEGER PRIMARY KEY,
    file_id    INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
    name       TEXT NOT NULL,
    kind       TEXT NOT NULL,
    signature  TEXT NOT NULL DEFAULT '',
    start_line INTEGER NOT NULL,
    end_line   INTEGER NOT NULL,
    exported   INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS dependencies (
    id           INTEGER PRIMARY KEY,
    from_file_id INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
    to_file_id   INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
    symbol_name  TEXT NOT NULL DEFAULT '',
    UNIQUE(from_file_id, to_file_id, symbol_name)
);

CREATE TABLE IF NOT EXISTS chunks (
    id          INTEGER PRIMARY KEY,
    file_id     INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
    chunk_index INTEGER NOT NULL,
    heading     TEXT,
    start_line  INTEGER NOT NULL,
    end_line    INTEGER NOT NULL,
    text        TEXT NOT NULL,
    UNIQUE(file_id, chunk_index)
);

CREATE TABLE IF NOT EXISTS ast_snapshot_files (
    file_path TEXT PRIMARY KEY,
    taken_at  INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS ast_snapshots (
    file_path   TEXT NOT NULL REFERENCES ast_snapshot_files(file_path) ON DELETE CASCADE,
    symbol_name TEXT NOT NULL,
    kind        TEXT NOT NULL,
    signature   TEXT NOT NULL,
    sig_hash    TEXT NOT NULL,
    PRIMARY KEY (file_path, symbol_name)
);

CREATE TABLE IF NOT EXISTS sessions (
    id            TEXT PRIMARY KEY,
    mode          TEXT NOT NULL,
    label         TEXT,
    started_at    INTEGER NOT NULL,
    tokens_served INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS session_events (
    id          INTEGER PRIMARY KEY,
    session_id  TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
    event_type  TEXT NOT NULL,
    file_path   TEXT,
    symbol_name TEXT,
    extra       TEXT,
    created_at  INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS observations (
    id           INTEGER PRIMARY KEY,
    session_id   TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
    obs_type     TEXT NOT NULL,
    file_path    TEXT,
    symbol_name  TEXT,
    text         TEXT NOT NULL,
    stale        INTEGER NOT NULL DEFAULT 0,
    stale_reason TEXT,
    created_at   INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_symbols_file       ON symbols(file_id);
CREATE INDEX IF NOT EXISTS idx_symbols_name       ON symbols(name);
CREATE INDEX IF NOT EXISTS idx_deps_from          ON dependencies(from_file_id);
CREATE INDEX IF NOT EXISTS idx_deps_to            ON dependencies(to_file_id);
CREATE INDEX IF NOT EXISTS idx_chunks_file        ON chunks(file_id);
CREATE INDEX IF NOT EXISTS idx_events_session     ON session_events(session_id, event_type);
CREATE INDEX IF NOT EXISTS idx_events_file        ON session_events(session_id, file_path, created_at);
CREATE INDEX IF NOT EXISTS idx_observations_subj  ON observations(file_path, symbol_name);
CREATE INDEX IF NOT EXISTS idx_observations_sess  ON observations(session_id);

CREATE VIRTUAL TABLE IF NOT EXISTS symbols_fts
    USING fts5(name, signature, content=symbols, content_rowid=id);
CREATE TRIGGER IF NOT EXISTS symbols_ai AFTER INSERT ON symbols BEGIN
    INSERT INTO symbols_fts(rowid, name, signature) VALUES (new.id, new.name, new.signature);
END;
CREATE TRIGGER IF NOT EXISTS symbols_ad AFTER DELETE ON symbols BEGIN
    INSERT INTO symbols_fts(symbols_fts, rowid, name, signature)
    VALUES ('delete', old.id, old.name, old.signature);
END;

CREATE VIRTUAL TABLE IF NOT EXISTS chunks_fts
    USING fts5(heading, text, content=chunks, content_rowid=id);
CREATE TRIGGER IF NOT EXISTS chunks_ai AFTER INSERT ON chunks BEGIN
    INSERT INTO chunks_fts(rowid, heading, text) VALUES (new.id, new.heading, new.text);
END;
CREATE TRIGGER IF NOT EXISTS chunks_ad AFTER DELETE ON chunks BEGIN
    INSERT INTO chunks_fts(chunks_fts, rowid, heading, text)
    VALUES ('delete', old.id, old.heading, old.text);
END;

CREATE VIRTUAL TABLE IF NOT EXISTS observations_fts
    USING fts5(text, file_path, symbol_name, content=observations, content_rowid=id);
CREATE TRIGGER IF NOT EXISTS observations_ai AFTER INSERT ON observations BEGIN
    INSERT INTO observations_fts(rowid, text, file_path, symbol_name)
    VALUES (new.id, new.text, new.file_path, new.symbol_name);
END;
CREATE TRIGGER IF NOT EXISTS observations_ad AFTER DELETE ON observations BEGIN
    INSERT INTO observations_fts(observations_fts, rowid, text, file_path, symbol_name)
    VALUES ('delete', old.id, old.text, old.file_path, old.symbol_name);
END;
";

impl Store {
    pub(super) fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }
}
