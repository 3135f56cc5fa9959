use std::{env, fs, path::Path, time::Duration};

use serde::Deserialize;

use crate::poll::PollSchedule;

/// Overrides `api.token` when set, so the token doesn't have to live in the
/// config file.
pub const TOKEN_ENV_VAR: &str = "ARIELOPS_SEC_TOKEN";

#[derive(Deserialize, Clone, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub reference_set: ReferenceSetConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Read the config at `path`, or fall back to the defaults if there's no
    /// file there. The token from the environment (if any) always wins.
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let mut config: Config = if path.exists() {
            toml::from_str(&fs::read_to_string(path)?)?
        } else {
            Config::default()
        };

        if let Ok(token) = env::var(TOKEN_ENV_VAR) {
            config.api.token = token;
        }

        Ok(config)
    }
}

#[derive(Deserialize, Clone, Debug)]
#[serde(deny_unknown_fields, default)]
pub struct ApiConfig {
    /// Scheme and host of the console, like `https://localhost`. Paths are
    /// appended to this.
    pub host: String,
    /// Sent as the `SEC` header.
    pub token: String,
    /// Sent as the `Version` header.
    pub version: String,
    /// Per-request timeout. Defaults to 30 seconds.
    pub timeout_secs: u64,
    /// Disables TLS certificate verification. Only for consoles with
    /// self-signed certificates, a warning is logged every run while this is
    /// on.
    pub insecure_skip_verify: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "https://localhost".to_string(),
            token: "sec".to_string(),
            version: "20.0".to_string(),
            timeout_secs: 30,
            insecure_skip_verify: false,
        }
    }
}

#[derive(Deserialize, Clone, Copy, Debug, Default, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum SearchReadiness {
    /// Poll the search status until it's completed before fetching results.
    #[default]
    Poll,
    /// Sleep for `initial_delay_secs` and then fetch once, whether or not the
    /// search has finished.
    FixedDelay,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(deny_unknown_fields, default)]
pub struct SearchConfig {
    /// JSON file with an `available_ips` array, the destination watchlist.
    pub input_file: String,
    pub json_output: String,
    pub txt_output: String,

    pub readiness: SearchReadiness,
    /// How long to wait after starting the search before the first status
    /// check (or the fetch, with `fixed_delay`).
    pub initial_delay_secs: u64,
    pub poll_interval_secs: u64,
    pub max_attempts: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            input_file: "available_ips.json".to_string(),
            json_output: "output.json".to_string(),
            txt_output: "output.txt".to_string(),
            readiness: SearchReadiness::Poll,
            initial_delay_secs: 3,
            poll_interval_secs: 3,
            max_attempts: 5,
        }
    }
}

impl SearchConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_secs)
    }

    pub fn schedule(&self) -> PollSchedule {
        PollSchedule {
            interval: Duration::from_secs(self.poll_interval_secs),
            max_attempts: self.max_attempts,
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
#[serde(deny_unknown_fields, default)]
pub struct ReferenceSetConfig {
    pub collection_id: u64,
    /// Plain text, one IP per line.
    pub input_file: String,
    /// Pause between clearing the set and adding the new entries.
    pub clear_settle_secs: u64,
    pub poll_interval_secs: u64,
    pub max_retries: u32,

    /// If true, a failed clear stops the run before anything is added.
    ///
    /// Defaults to false, which means the new entries get added on top of
    /// whatever was already in the set.
    pub abort_on_clear_failure: bool,
}

impl Default for ReferenceSetConfig {
    fn default() -> Self {
        Self {
            collection_id: 1000,
            input_file: "available_ips.txt".to_string(),
            clear_settle_secs: 3,
            poll_interval_secs: 5,
            max_retries: 5,
            abort_on_clear_failure: false,
        }
    }
}

impl ReferenceSetConfig {
    pub fn clear_settle(&self) -> Duration {
        Duration::from_secs(self.clear_settle_secs)
    }

    pub fn schedule(&self) -> PollSchedule {
        PollSchedule {
            interval: Duration::from_secs(self.poll_interval_secs),
            max_attempts: self.max_retries,
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
#[serde(deny_unknown_fields, default)]
pub struct LoggingConfig {
    pub dir: String,
    /// Appended to, never rotated.
    pub file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: ".".to_string(),
            file: "arielops.log".to_string(),
        }
    }
}
