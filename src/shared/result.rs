/// Crate-wide Result alias backed by `anyhow::Error`.
/// Typed failures are `RemediationError` values carried inside the anyhow error.
pub type Result<T> = std::result::Result<T, anyhow::Error>;
