//! Database migrations

/// SQL for creating the database schema
pub const INIT_SCHEMA: &str = r#"
-- One row per finished batch run
CREATE TABLE IF NOT EXISTS batch_runs (
    id TEXT PRIMARY KEY,
    job TEXT NOT NULL CHECK(job IN ('hierarchy', 'drops')),
    started_at TEXT NOT NULL,
    finished_at TEXT NOT NULL,
    total INTEGER NOT NULL,
    succeeded INTEGER NOT NULL DEFAULT 0,
    failed INTEGER NOT NULL DEFAULT 0,
    skipped INTEGER NOT NULL DEFAULT 0,
    cancelled INTEGER NOT NULL DEFAULT 0
);

-- Final status of every item of a run, in run order
CREATE TABLE IF NOT EXISTS batch_run_items (
    run_id TEXT NOT NULL,
    position INTEGER NOT NULL,
    item_id TEXT NOT NULL,
    label TEXT NOT NULL,
    source_ref TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL CHECK(status IN ('pending', 'running', 'success', 'failure')),
    reason TEXT,
    metrics TEXT,

    PRIMARY KEY (run_id, position),
    FOREIGN KEY (run_id) REFERENCES batch_runs(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_batch_runs_job ON batch_runs(job, finished_at DESC);
CREATE INDEX IF NOT EXISTS idx_batch_run_items_status ON batch_run_items(run_id, status);
"#;
