#![forbid(unsafe_code)]

use crate::error::ConfigError;
use dash_core::groups::find_group;
use dash_core::{BUILTIN_GROUPS, DashboardConfig, DisplayOptions};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5050/dashboard/dashboard_stats";
const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Dashboard preferences, as stored by the web application.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Preferences {
    pub session_stats_refresh: u64,
    pub tps_stats_refresh: u64,
    pub ti_stats_refresh: u64,
    pub to_stats_refresh: u64,
    pub bio_stats_refresh: u64,
    pub graph_mouse_track: bool,
    pub graph_data_points: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            session_stats_refresh: 1,
            tps_stats_refresh: 1,
            ti_stats_refresh: 1,
            to_stats_refresh: 1,
            bio_stats_refresh: 1,
            graph_mouse_track: true,
            graph_data_points: false,
        }
    }
}

impl Preferences {
    /// Reads YAML (or JSON) preferences; missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadPreferences {
            path: path.to_path_buf(),
            source,
        })?;
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&text).map_err(|source| ConfigError::ParsePreferences {
            path: path.to_path_buf(),
            source,
        })
    }

    fn refresh_slot(&mut self, group: &str) -> Option<&mut u64> {
        match group {
            "session_stats" => Some(&mut self.session_stats_refresh),
            "tps_stats" => Some(&mut self.tps_stats_refresh),
            "ti_stats" => Some(&mut self.ti_stats_refresh),
            "to_stats" => Some(&mut self.to_stats_refresh),
            "bio_stats" => Some(&mut self.bio_stats_refresh),
            _ => None,
        }
    }

    pub fn refresh(&self, group: &str) -> Option<u64> {
        match group {
            "session_stats" => Some(self.session_stats_refresh),
            "tps_stats" => Some(self.tps_stats_refresh),
            "ti_stats" => Some(self.ti_stats_refresh),
            "to_stats" => Some(self.to_stats_refresh),
            "bio_stats" => Some(self.bio_stats_refresh),
            _ => None,
        }
    }

    pub fn dashboard_config(&self) -> DashboardConfig {
        DashboardConfig {
            intervals: BUILTIN_GROUPS
                .iter()
                .filter_map(|spec| {
                    self.refresh(spec.name)
                        .map(|secs| (spec.name.to_string(), secs))
                })
                .collect(),
            display: DisplayOptions {
                show_tooltip: self.graph_mouse_track,
                show_data_points: self.graph_data_points,
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PollerConfig {
    pub base_url: String,
    pub sid: i64,
    pub did: Option<i64>,
    pub preferences_path: Option<PathBuf>,
    pub preferences: Preferences,
    pub timeout: Duration,
    pub once: bool,
    pub start_hidden: bool,
}

impl PollerConfig {
    /// Preferences re-read from disk with command-line overrides applied again.
    pub fn reload_preferences(&self, overrides: &[(String, u64)]) -> Result<Preferences, ConfigError> {
        let path = self
            .preferences_path
            .as_deref()
            .ok_or(ConfigError::NoPreferencesFile)?;
        let mut prefs = Preferences::load(path)?;
        for (group, secs) in overrides {
            if let Some(slot) = prefs.refresh_slot(group) {
                *slot = *secs;
            }
        }
        Ok(prefs)
    }
}

pub fn usage() -> &'static str {
    "dash_poller: poll PostgreSQL dashboard statistics and print chart data\n\n\
USAGE:\n\
  dash_poller [--base-url URL] [--sid N] [--did N] [--prefs FILE]\n\
              [--session-stats-refresh S] [--tps-stats-refresh S]\n\
              [--ti-stats-refresh S] [--to-stats-refresh S] [--bio-stats-refresh S]\n\
              [--mouse-track | --no-mouse-track] [--data-points | --no-data-points]\n\
              [--timeout-ms MS] [--once] [--start-hidden]\n\n\
NOTES:\n\
  - prints one JSON line per dashboard update on stdout; logs go to stderr (RUST_LOG).\n\
  - stdin commands: show, hide, reload, quit.\n\
  - env fallbacks: DASH_BASE_URL, DASH_SID, DASH_DID, DASH_PREFS, DASH_TIMEOUT_MS.\n"
}

fn env_value(env: &dyn Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    env(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn parse_number<T: std::str::FromStr>(
    flag: &str,
    raw: &str,
    unit: &'static str,
) -> Result<T, ConfigError> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidNumber {
            flag: flag.to_string(),
            unit,
        })
}

/// `--tps-stats-refresh` -> `tps_stats`.
fn refresh_flag_group(flag: &str) -> Option<&'static str> {
    let name = flag.strip_prefix("--")?.strip_suffix("-refresh")?;
    find_group(&name.replace('-', "_")).map(|spec| spec.name)
}

/// Parsed command line plus the refresh overrides it carried.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedArgs {
    pub config: PollerConfig,
    pub refresh_overrides: Vec<(String, u64)>,
}

pub fn parse_args(
    args: &[String],
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<ParsedArgs, ConfigError> {
    if args.iter().any(|a| a == "-h" || a == "--help") {
        return Err(ConfigError::HelpRequested);
    }

    let mut base_url =
        env_value(env, "DASH_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let mut sid: i64 = match env_value(env, "DASH_SID") {
        Some(raw) => parse_number("DASH_SID", &raw, "server id")?,
        None => 1,
    };
    let mut did: Option<i64> = match env_value(env, "DASH_DID") {
        Some(raw) => Some(parse_number("DASH_DID", &raw, "database id")?),
        None => None,
    };
    let mut preferences_path: Option<PathBuf> = env_value(env, "DASH_PREFS").map(PathBuf::from);
    let mut timeout_ms: u64 = match env_value(env, "DASH_TIMEOUT_MS") {
        Some(raw) => parse_number("DASH_TIMEOUT_MS", &raw, "milliseconds")?,
        None => DEFAULT_TIMEOUT_MS,
    };
    let mut once = false;
    let mut start_hidden = false;
    let mut mouse_track: Option<bool> = None;
    let mut data_points: Option<bool> = None;
    let mut refresh_overrides: Vec<(String, u64)> = Vec::new();

    let mut i = 0usize;
    while i < args.len() {
        let a = args[i].as_str();
        let mut value = |what: &'static str| -> Result<String, ConfigError> {
            i += 1;
            args.get(i).cloned().ok_or_else(|| ConfigError::MissingValue {
                flag: a.to_string(),
                what,
            })
        };
        match a {
            "--base-url" => base_url = value("URL")?,
            "--sid" => sid = parse_number(a, &value("N")?, "server id")?,
            "--did" => did = Some(parse_number(a, &value("N")?, "database id")?),
            "--prefs" => preferences_path = Some(PathBuf::from(value("FILE")?)),
            "--timeout-ms" => timeout_ms = parse_number(a, &value("MS")?, "milliseconds")?,
            "--mouse-track" => mouse_track = Some(true),
            "--no-mouse-track" => mouse_track = Some(false),
            "--data-points" => data_points = Some(true),
            "--no-data-points" => data_points = Some(false),
            "--once" => once = true,
            "--start-hidden" => start_hidden = true,
            other => match refresh_flag_group(other) {
                Some(group) => {
                    let secs = parse_number(a, &value("S")?, "seconds")?;
                    refresh_overrides.push((group.to_string(), secs));
                }
                None => return Err(ConfigError::UnknownArg(other.to_string())),
            },
        }
        i += 1;
    }

    let base_url = base_url.trim().trim_end_matches('/').to_string();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(ConfigError::InvalidBaseUrl(base_url));
    }

    let mut preferences = match preferences_path.as_deref() {
        Some(path) => Preferences::load(path)?,
        None => Preferences::default(),
    };
    for (group, secs) in &refresh_overrides {
        if let Some(slot) = preferences.refresh_slot(group) {
            *slot = *secs;
        }
    }
    if let Some(flag) = mouse_track {
        preferences.graph_mouse_track = flag;
    }
    if let Some(flag) = data_points {
        preferences.graph_data_points = flag;
    }

    Ok(ParsedArgs {
        config: PollerConfig {
            base_url,
            sid,
            did: did.filter(|did| *did > 0),
            preferences_path,
            preferences,
            timeout: Duration::from_millis(timeout_ms.max(1)),
            once,
            start_hidden,
        },
        refresh_overrides,
    })
}
