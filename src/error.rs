use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `judgebench`.
///
/// Each subsystem defines its own error variant. The gateway matches on these
/// to pick an HTTP status and a user-visible message; internal code continues
/// to use `anyhow::Result` for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum BenchError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Completion provider ─────────────────────────────────────────────
    #[error("provider: {0}")]
    Provider(#[from] ProviderError),

    // ── Store ───────────────────────────────────────────────────────────
    #[error("store: {0}")]
    Store(#[from] StoreError),

    // ── Taxonomy automation ─────────────────────────────────────────────
    #[error("taxonomy: {0}")]
    Taxonomy(#[from] TaxonomyError),

    // ── Judge ───────────────────────────────────────────────────────────
    #[error("judge: {0}")]
    Judge(#[from] JudgeError),

    // ── Judge-prompt optimizer ──────────────────────────────────────────
    #[error("optimize: {0}")]
    Optimize(#[from] OptimizeError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Completion provider errors ─────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider} credentials not set")]
    MissingCredentials { provider: String },

    #[error("{provider} request failed: {message}")]
    Request { provider: String, message: String },
}

// ─── Store errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open database: {0}")]
    Open(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
}

// ─── Taxonomy errors ────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum TaxonomyError {
    #[error("response is not valid taxonomy JSON: {0}")]
    Parse(String),

    #[error("invalid taxonomy: {0}")]
    Validation(String),
}

// ─── Judge errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("evaluation {0} not found")]
    EvaluationNotFound(i64),

    #[error("project {0} not found")]
    ProjectNotFound(i64),

    #[error("synthetic input {0} not found")]
    SyntheticInputNotFound(i64),

    /// The judge response could not be parsed as a structured verdict.
    /// Distinct from a legitimate "fail" verdict.
    #[error("judge response is not a valid verdict: {0}")]
    MalformedVerdict(String),
}

// ─── Optimizer errors ───────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum OptimizeError {
    #[error("project {0} not found")]
    ProjectNotFound(i64),

    #[error("optimizer response contains no <prompt> block")]
    MissingPromptMarker,
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, BenchError>;
