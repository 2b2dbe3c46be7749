#![forbid(unsafe_code)]

use dash_core::render::stats_path;
use dash_core::{FetchFailure, RawSample, StatsResponse};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// One batched stats request for the named groups.
pub trait StatsFetcher: Send + Sync + 'static {
    fn fetch(&self, groups: &[String]) -> Result<StatsResponse, FetchFailure>;
}

pub struct HttpFetcher {
    agent: ureq::Agent,
    base_url: String,
    sid: i64,
    did: Option<i64>,
}

impl HttpFetcher {
    pub fn new(base_url: &str, sid: i64, did: Option<i64>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .build();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            sid,
            did,
        }
    }

    pub fn url_for(&self, groups: &[String]) -> String {
        format!("{}{}", self.base_url, stats_path(self.sid, self.did, groups))
    }
}

impl StatsFetcher for HttpFetcher {
    fn fetch(&self, groups: &[String]) -> Result<StatsResponse, FetchFailure> {
        let url = self.url_for(groups);
        debug!(%url, "fetching dashboard stats");
        let response = self.agent.get(&url).call().map_err(classify)?;
        let body: Value = response
            .into_json()
            .map_err(|e| FetchFailure::Unclassified(format!("decode stats body: {e}")))?;
        parse_stats_body(&body)
    }
}

fn classify(err: ureq::Error) -> FetchFailure {
    match err {
        ureq::Error::Status(status, _) => FetchFailure::Status(status),
        ureq::Error::Transport(transport) => FetchFailure::Transport(transport.to_string()),
    }
}

/// `{group: {label: number}}` -> typed response. Null groups are skipped;
/// non-numeric values inside a group are dropped.
pub fn parse_stats_body(body: &Value) -> Result<StatsResponse, FetchFailure> {
    let obj = body
        .as_object()
        .ok_or_else(|| FetchFailure::Unclassified("stats body is not an object".to_string()))?;
    let mut out = StatsResponse::new();
    for (group, series) in obj {
        if series.is_null() {
            continue;
        }
        let series = series.as_object().ok_or_else(|| {
            FetchFailure::Unclassified(format!("stats for {group} is not an object"))
        })?;
        let sample: RawSample = series
            .iter()
            .filter_map(|(label, value)| value.as_f64().map(|v| (label.clone(), v)))
            .collect();
        out.insert(group.clone(), sample);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_groups_and_skips_nulls() {
        let body = json!({
            "session_stats": {"Total": 4, "Active": 1, "Idle": 3},
            "tps_stats": null,
            "bio_stats": {"Reads": 10.5, "Hits": "n/a"}
        });
        let parsed = parse_stats_body(&body).expect("parse");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed["session_stats"]["Total"], 4.0);
        assert_eq!(parsed["bio_stats"].get("Reads"), Some(&10.5));
        assert!(parsed["bio_stats"].get("Hits").is_none());
    }

    #[test]
    fn rejects_malformed_bodies() {
        assert!(matches!(
            parse_stats_body(&json!([1, 2])),
            Err(FetchFailure::Unclassified(_))
        ));
        assert!(matches!(
            parse_stats_body(&json!({"session_stats": 3})),
            Err(FetchFailure::Unclassified(_))
        ));
    }

    #[test]
    fn url_names_only_requested_groups() {
        let fetcher = HttpFetcher::new(
            "http://localhost:5050/dashboard/dashboard_stats/",
            2,
            Some(13000),
            Duration::from_secs(1),
        );
        let groups = vec!["tps_stats".to_string(), "bio_stats".to_string()];
        assert_eq!(
            fetcher.url_for(&groups),
            "http://localhost:5050/dashboard/dashboard_stats/2/13000?chart_names=tps_stats,bio_stats"
        );
    }
}
