/// Schema for the response cache and the key-value store.
pub const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

-- One row per cache namespace (e.g. static-v1, dynamic-v1)
CREATE TABLE IF NOT EXISTS cache_namespaces (
    name TEXT PRIMARY KEY,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Stored response snapshots keyed by request identity hash
CREATE TABLE IF NOT EXISTS cache_entries (
    namespace TEXT NOT NULL,
    request_hash TEXT NOT NULL,
    request_description TEXT NOT NULL,
    status INTEGER NOT NULL,
    headers TEXT NOT NULL,
    body BLOB NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (namespace, request_hash),
    FOREIGN KEY (namespace) REFERENCES cache_namespaces(name) ON DELETE CASCADE
);

-- Small string blobs (catalog, theme, worker registration)
CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;
