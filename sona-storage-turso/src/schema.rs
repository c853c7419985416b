//! Database schema definitions for Turso pattern storage

/// SQL to create the patterns table
pub const CREATE_PATTERNS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS patterns (
    pattern_id TEXT PRIMARY KEY NOT NULL,
    context_embedding BLOB NOT NULL,
    skill_id TEXT NOT NULL,
    skill_features TEXT NOT NULL,
    context_data TEXT NOT NULL,
    outcome_type TEXT NOT NULL,
    outcome_reward REAL NOT NULL,
    importance REAL NOT NULL,
    original_score REAL NOT NULL,
    source TEXT NOT NULL,
    access_count INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    last_accessed_at INTEGER NOT NULL
)
"#;

/// SQL to create the Fisher matrix singleton table
pub const CREATE_FISHER_INFO_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS fisher_info (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    matrix_data BLOB NOT NULL,
    update_count INTEGER NOT NULL,
    last_decay_at INTEGER,
    updated_at INTEGER NOT NULL
)
"#;

/// SQL to create the consolidation history table
pub const CREATE_CONSOLIDATION_HISTORY_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS consolidation_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp INTEGER NOT NULL,
    patterns_processed INTEGER NOT NULL,
    patterns_preserved INTEGER NOT NULL,
    patterns_pruned INTEGER NOT NULL,
    preservation_rate REAL NOT NULL,
    duration_ms INTEGER NOT NULL,
    average_importance REAL NOT NULL
)
"#;

/// Index on patterns skill for dedup probes and filtered retrieval
pub const CREATE_PATTERNS_SKILL_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_patterns_skill_id
ON patterns(skill_id)
"#;

/// Index on patterns outcome for outcome-filtered retrieval
pub const CREATE_PATTERNS_OUTCOME_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_patterns_outcome_type
ON patterns(outcome_type)
"#;

/// Index on patterns importance for consolidation pruning order
pub const CREATE_PATTERNS_IMPORTANCE_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_patterns_importance
ON patterns(importance DESC)
"#;

/// Index on patterns creation time for recency windows
pub const CREATE_PATTERNS_CREATED_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_patterns_created_at
ON patterns(created_at DESC)
"#;

/// All statements required to initialize a fresh database
pub const ALL_STATEMENTS: &[&str] = &[
    CREATE_PATTERNS_TABLE,
    CREATE_FISHER_INFO_TABLE,
    CREATE_CONSOLIDATION_HISTORY_TABLE,
    CREATE_PATTERNS_SKILL_INDEX,
    CREATE_PATTERNS_OUTCOME_INDEX,
    CREATE_PATTERNS_IMPORTANCE_INDEX,
    CREATE_PATTERNS_CREATED_INDEX,
];
