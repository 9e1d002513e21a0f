/// Inline SQL migrations for the traffic analytics schema.
///
/// We use simple inline migrations rather than sqlx migration files
/// because the schema is small and self-contained.

pub const MIGRATIONS: &[&str] = &[
    // Migration 1: page_views, the append-only request log.
    // Rows are written once per tracked request and never updated.
    // country/city are reserved for future geo enrichment.
    r#"
CREATE TABLE IF NOT EXISTS page_views (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ip_address TEXT NOT NULL,
    user_agent TEXT NOT NULL DEFAULT '',
    path TEXT NOT NULL,
    method TEXT NOT NULL,
    referrer TEXT,
    timestamp INTEGER NOT NULL,
    response_time REAL NOT NULL DEFAULT 0,
    status_code INTEGER NOT NULL,
    country TEXT,
    city TEXT,
    session_id TEXT NOT NULL
);
"#,
    // Migration 2: page_views indexes
    r#"CREATE INDEX IF NOT EXISTS idx_page_views_ip ON page_views(ip_address);"#,
    r#"CREATE INDEX IF NOT EXISTS idx_page_views_path ON page_views(path);"#,
    r#"CREATE INDEX IF NOT EXISTS idx_page_views_timestamp ON page_views(timestamp);"#,
    r#"CREATE INDEX IF NOT EXISTS idx_page_views_status ON page_views(status_code);"#,
    r#"CREATE INDEX IF NOT EXISTS idx_page_views_session ON page_views(session_id);"#,
    // Migration 3: unique_visitors, one row per (ip, user-agent hash) identity.
    r#"
CREATE TABLE IF NOT EXISTS unique_visitors (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ip_address TEXT NOT NULL,
    user_agent_hash TEXT NOT NULL,
    first_visit INTEGER NOT NULL,
    last_visit INTEGER NOT NULL,
    visit_count INTEGER NOT NULL DEFAULT 1,
    country TEXT,
    city TEXT
);
"#,
    // Migration 4: uniqueness on the identity pair. The upsert relies on
    // this constraint so concurrent identical-identity requests settle as
    // updates instead of racing a read-check-then-write.
    r#"CREATE UNIQUE INDEX IF NOT EXISTS idx_visitor_identity ON unique_visitors(ip_address, user_agent_hash);"#,
];
