use async_trait::async_trait;

/// Remote source of Node.js release versions, consulted only after the
/// local tool could not list them.
///
/// Implementations never fail: transport and decoding problems are logged
/// and yield an empty list, so the caller can surface the local failure
/// instead of a network error.
#[async_trait]
pub trait ReleaseIndex: Send + Sync {
    /// Where the versions come from, for log lines.
    fn source(&self) -> &str;

    /// `v`-prefixed versions in the order the index lists them.
    async fn fetch_available_versions(&self) -> Vec<String>;
}

/// Index used when remote lookups are switched off.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledIndex;

#[async_trait]
impl ReleaseIndex for DisabledIndex {
    fn source(&self) -> &'static str {
        "disabled"
    }

    async fn fetch_available_versions(&self) -> Vec<String> {
        Vec::new()
    }
}
