//! Harness configuration
//!
//! Defaults mirror how the demo notebooks are run in CI: a three minute budget per execution call, a fixed seed and
//! fixtures under the user's home directory unless `INPUT_DATA_DIR` says otherwise.

use std::env;
use std::time::Duration;

use indexmap::IndexMap;

/// Environment variable overriding the per-call timeout, in whole seconds.
pub const TIMEOUT_ENV: &str = "CELLBOOK_TIMEOUT_SECS";
/// Environment variable overriding the RNG seed.
pub const SEED_ENV: &str = "CELLBOOK_SEED";

/// Configuration shared by every execution call of one [`crate::Testbook`].
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Wall-clock budget for each execution call (range, cell or fragment run)
    pub timeout: Duration,
    /// Seed for the session RNG; the only randomness source cells can reach
    pub seed: u64,
    /// Name of the variable injected setup code reads the fixture directory from
    pub input_dir_var: String,
    /// Fallback fixture directory, `~`-relative
    pub default_input_dir: String,
    /// Documents larger than this are rejected at load time
    pub max_document_size: u64,
    /// Variables visible to `os.environ` / `os.getenv` ahead of the process environment
    pub env_overrides: IndexMap<String, String>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(180),
            seed: 0x5EED,
            input_dir_var: "INPUT_DATA_DIR".to_string(),
            default_input_dir: "~/cellbook/movielens/".to_string(),
            max_document_size: 64 * 1024 * 1024,
            env_overrides: IndexMap::new(),
        }
    }
}

impl HarnessConfig {
    /// Create a new config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overlaid with `CELLBOOK_TIMEOUT_SECS` and `CELLBOOK_SEED` when they parse.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = env::var(TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.timeout = Duration::from_secs(secs),
                _ => tracing::warn!(var = TIMEOUT_ENV, value = %raw, "ignoring invalid timeout override"),
            }
        }
        if let Ok(raw) = env::var(SEED_ENV) {
            match parse_seed(&raw) {
                Some(seed) => config.seed = seed,
                None => tracing::warn!(var = SEED_ENV, value = %raw, "ignoring invalid seed override"),
            }
        }
        config
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_input_dir_var(mut self, name: impl Into<String>) -> Self {
        self.input_dir_var = name.into();
        self
    }

    pub fn with_default_input_dir(mut self, dir: impl Into<String>) -> Self {
        self.default_input_dir = dir.into();
        self
    }

    pub fn with_max_document_size(mut self, bytes: u64) -> Self {
        self.max_document_size = bytes;
        self
    }

    /// Make `name` visible to cell code without touching the process environment.
    pub fn with_env_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_overrides.insert(name.into(), value.into());
        self
    }

    /// Shorthand for pointing the input-directory variable at `dir`.
    pub fn with_input_dir(self, dir: impl Into<String>) -> Self {
        let var = self.input_dir_var.clone();
        self.with_env_var(var, dir)
    }

    /// Look up a variable, overrides first.
    pub fn env_var(&self, name: &str) -> Option<String> {
        self.env_overrides.get(name).cloned().or_else(|| env::var(name).ok())
    }
}

/// Accept decimal or `0x`-prefixed hex.
pub fn parse_seed(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => raw.parse().ok(),
    }
}

/// Options accepted by [`crate::Testbook::open`], the `open(path, execute, timeout)` contract.
#[derive(Debug, Clone, Default)]
pub struct OpenOptions {
    /// Run every cell right after loading
    pub execute: bool,
    /// Overrides [`HarnessConfig::timeout`] when set
    pub timeout: Option<Duration>,
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn execute(mut self, execute: bool) -> Self {
        self.execute = execute;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HarnessConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(180));
        assert_eq!(config.seed, 0x5EED);
        assert_eq!(config.input_dir_var, "INPUT_DATA_DIR");
        assert_eq!(config.default_input_dir, "~/cellbook/movielens/");
        assert_eq!(config.max_document_size, 64 * 1024 * 1024);
    }

    #[test]
    fn test_builder_chain() {
        let config = HarnessConfig::new()
            .with_timeout(Duration::from_millis(250))
            .with_seed(7)
            .with_input_dir("/tmp/fixtures/");
        assert_eq!(config.timeout, Duration::from_millis(250));
        assert_eq!(config.seed, 7);
        assert_eq!(config.env_var("INPUT_DATA_DIR").as_deref(), Some("/tmp/fixtures/"));
    }

    #[test]
    fn test_input_dir_follows_renamed_var() {
        let config = HarnessConfig::new().with_input_dir_var("DATA_HOME").with_input_dir("/data/");
        assert_eq!(config.env_overrides.get("DATA_HOME").map(String::as_str), Some("/data/"));
        assert!(!config.env_overrides.contains_key("INPUT_DATA_DIR"));
    }

    #[test]
    fn test_builder_override() {
        let config = HarnessConfig::new().with_seed(1).with_seed(2);
        assert_eq!(config.seed, 2); // Last value wins
    }

    #[test]
    fn test_parse_seed() {
        assert_eq!(parse_seed("42"), Some(42));
        assert_eq!(parse_seed(" 0x5EED "), Some(0x5EED));
        assert_eq!(parse_seed("seed"), None);
    }

    #[test]
    fn test_open_options() {
        let opts = OpenOptions::new().timeout(Duration::from_secs(3));
        assert!(!opts.execute);
        assert_eq!(opts.timeout, Some(Duration::from_secs(3)));
    }
}
