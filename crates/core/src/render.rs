#![forbid(unsafe_code)]

use crate::groups::{GroupWindows, POINT_SIZE, X_AXIS_LENGTH};

pub const SERIES_COLORS: [&str; 3] = ["#00BCD4", "#9CCC65", "#E64A19"];

#[derive(Clone, Debug, PartialEq)]
pub struct Dataset {
    pub label: String,
    pub data: Vec<f64>,
    pub color: Option<&'static str>,
    pub point_hit_radius: u32,
}

/// Chart input for one group.
#[derive(Clone, Debug, PartialEq)]
pub struct ChartData {
    pub labels: Vec<usize>,
    pub datasets: Vec<Dataset>,
    pub refresh_rate: u64,
}

pub fn chart_data(windows: &GroupWindows, refresh_rate: u64) -> ChartData {
    let datasets = windows
        .iter()
        .enumerate()
        .map(|(i, (label, window))| Dataset {
            label: label.to_string(),
            data: window.to_vec(),
            color: SERIES_COLORS.get(i).copied(),
            point_hit_radius: POINT_SIZE,
        })
        .collect();
    ChartData {
        labels: (0..X_AXIS_LENGTH).collect(),
        datasets,
        refresh_rate,
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DisplayOptions {
    pub show_tooltip: bool,
    pub show_data_points: bool,
}

impl DisplayOptions {
    pub fn point_radius(self) -> u32 {
        if self.show_data_points { POINT_SIZE } else { 0 }
    }
}

/// Tooltip title for the sample at x-axis `index`.
pub fn tooltip_title(index: usize, refresh_rate: u64) -> String {
    let seconds = (index as u64).saturating_mul(refresh_rate);
    format!("{seconds} seconds ago")
}

/// HTML legend for a chart: one colored swatch per dataset.
pub fn legend_html(chart_id: &str, datasets: &[Dataset]) -> String {
    let mut out = String::new();
    out.push_str(&format!("<div class=\"{chart_id}-legend d-flex\">"));
    for dataset in datasets {
        let color = dataset.color.unwrap_or("");
        out.push_str(&format!(
            "<div class=\"legend-value\"><span style=\"background-color:{color}\">&nbsp;&nbsp;&nbsp;&nbsp;</span>"
        ));
        if !dataset.label.is_empty() {
            out.push_str(&format!(
                "<span class=\"legend-label\">{}</span>",
                escape_html(&dataset.label)
            ));
        }
        out.push_str("</div>");
    }
    out.push_str("</div>");
    out
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Path and query of the stats endpoint, relative to the dashboard base.
pub fn stats_path(sid: i64, did: Option<i64>, groups: &[String]) -> String {
    let mut out = format!("/{sid}");
    if let Some(did) = did.filter(|did| *did > 0) {
        out.push_str(&format!("/{did}"));
    }
    out.push_str("?chart_names=");
    out.push_str(&groups.join(","));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::groups::{BIO_STATS, SESSION_STATS};

    #[test]
    fn chart_data_has_fixed_axis_and_colors() {
        let mut windows = SESSION_STATS.defaults();
        windows.entry("Active").push_front(4.0);
        let chart = chart_data(&windows, 5);
        assert_eq!(chart.labels.len(), X_AXIS_LENGTH);
        assert_eq!(chart.labels.first(), Some(&0));
        assert_eq!(chart.labels.last(), Some(&(X_AXIS_LENGTH - 1)));
        assert_eq!(chart.refresh_rate, 5);
        let colors = chart.datasets.iter().map(|d| d.color).collect::<Vec<_>>();
        assert_eq!(
            colors,
            vec![Some("#00BCD4"), Some("#9CCC65"), Some("#E64A19")]
        );
        assert_eq!(chart.datasets[1].data, vec![4.0]);
        assert!(chart.datasets[0].data.is_empty());
    }

    #[test]
    fn tooltip_title_scales_by_refresh_rate() {
        assert_eq!(tooltip_title(0, 10), "0 seconds ago");
        assert_eq!(tooltip_title(3, 10), "30 seconds ago");
    }

    #[test]
    fn point_radius_follows_toggle() {
        let on = DisplayOptions {
            show_tooltip: false,
            show_data_points: true,
        };
        assert_eq!(on.point_radius(), POINT_SIZE);
        assert_eq!(DisplayOptions::default().point_radius(), 0);
    }

    #[test]
    fn legend_lists_each_dataset() {
        let chart = chart_data(&BIO_STATS.defaults(), 1);
        let html = legend_html("bio-graph", &chart.datasets);
        assert!(html.starts_with("<div class=\"bio-graph-legend d-flex\">"));
        assert!(html.contains("<span class=\"legend-label\">Reads</span>"));
        assert!(html.contains("background-color:#9CCC65"));
        assert_eq!(html.matches("legend-value").count(), 2);
    }

    #[test]
    fn stats_path_includes_database_only_when_positive() {
        let groups = vec!["session_stats".to_string(), "bio_stats".to_string()];
        assert_eq!(
            stats_path(1, None, &groups),
            "/1?chart_names=session_stats,bio_stats"
        );
        assert_eq!(
            stats_path(1, Some(0), &groups),
            "/1?chart_names=session_stats,bio_stats"
        );
        assert_eq!(
            stats_path(3, Some(16384), &groups[..1]),
            "/3/16384?chart_names=session_stats"
        );
    }
}
