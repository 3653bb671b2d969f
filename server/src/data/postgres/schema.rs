//! Schema definitions for the SQL store
//!
//! Array columns hold `members` and `tags`; document-shaped fields
//! (metrics, parameters, summaries, results) are JSONB.

pub const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS organizations (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        subscription TEXT NOT NULL DEFAULT 'free',
        members TEXT[] NOT NULL DEFAULT '{}',
        rate_limit_per_hour BIGINT,
        retention_days BIGINT,
        max_members BIGINT,
        max_datasets BIGINT,
        experiment_retention_days BIGINT,
        max_examples_per_dataset BIGINT,
        created BIGINT NOT NULL,
        updated BIGINT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS api_keys (
        id TEXT PRIMARY KEY,
        organisation TEXT NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
        key_hash TEXT NOT NULL UNIQUE,
        key_suffix TEXT NOT NULL,
        role TEXT NOT NULL,
        name TEXT,
        created BIGINT NOT NULL,
        updated BIGINT NOT NULL
    )"#,
    r#"CREATE INDEX IF NOT EXISTS idx_api_keys_org ON api_keys(organisation)"#,
    r#"CREATE TABLE IF NOT EXISTS datasets (
        id TEXT PRIMARY KEY,
        organisation TEXT NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        description TEXT,
        tags TEXT[] NOT NULL DEFAULT '{}',
        input_schema JSONB,
        output_schema JSONB,
        metrics JSONB NOT NULL DEFAULT '[]',
        created BIGINT NOT NULL,
        updated BIGINT NOT NULL
    )"#,
    r#"CREATE INDEX IF NOT EXISTS idx_datasets_org ON datasets(organisation)"#,
    r#"CREATE TABLE IF NOT EXISTS models (
        id TEXT PRIMARY KEY,
        organisation TEXT NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        provider TEXT NOT NULL,
        model TEXT NOT NULL,
        api_key TEXT,
        base_url TEXT,
        created BIGINT NOT NULL,
        updated BIGINT NOT NULL
    )"#,
    r#"CREATE INDEX IF NOT EXISTS idx_models_org ON models(organisation)"#,
    r#"CREATE TABLE IF NOT EXISTS experiments (
        id TEXT PRIMARY KEY,
        dataset TEXT NOT NULL,
        organisation TEXT NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
        batch TEXT,
        name TEXT NOT NULL,
        parameters JSONB NOT NULL DEFAULT '{}',
        status TEXT NOT NULL DEFAULT 'open',
        summaries JSONB NOT NULL DEFAULT '{}',
        results JSONB NOT NULL DEFAULT '[]',
        traces TEXT[] NOT NULL DEFAULT '{}',
        created BIGINT NOT NULL,
        updated BIGINT NOT NULL
    )"#,
    r#"CREATE INDEX IF NOT EXISTS idx_experiments_org ON experiments(organisation)"#,
    r#"CREATE INDEX IF NOT EXISTS idx_experiments_dataset ON experiments(dataset)"#,
];
