#![forbid(unsafe_code)]

use dash_core::render::{Dataset, legend_html};
use dash_core::{ChartPanel, DashboardView};
use serde::Serialize;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetDto {
    pub label: String,
    pub data: Vec<f64>,
    pub border_color: Option<&'static str>,
    pub background_color: Option<&'static str>,
    pub point_hit_radius: u32,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDto {
    pub id: &'static str,
    pub title: &'static str,
    pub labels: Vec<usize>,
    pub datasets: Vec<DatasetDto>,
    pub refresh_rate: u64,
    pub legend_html: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardDto {
    pub ts: String,
    pub cause: &'static str,
    pub poll_delay: u64,
    pub error_msg: Option<&'static str>,
    pub show_tooltip: bool,
    pub point_radius: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charts: Option<Vec<ChartDto>>,
}

fn dataset_dto(dataset: &Dataset) -> DatasetDto {
    DatasetDto {
        label: dataset.label.clone(),
        data: dataset.data.clone(),
        border_color: dataset.color,
        background_color: dataset.color,
        point_hit_radius: dataset.point_hit_radius,
    }
}

fn chart_dto(panel: &ChartPanel) -> ChartDto {
    ChartDto {
        id: panel.chart_id,
        title: panel.title,
        labels: panel.data.labels.clone(),
        datasets: panel.data.datasets.iter().map(dataset_dto).collect(),
        refresh_rate: panel.data.refresh_rate,
        legend_html: legend_html(panel.chart_id, &panel.data.datasets),
    }
}

pub fn dashboard_dto(view: &DashboardView, cause: &'static str, ts: String) -> DashboardDto {
    DashboardDto {
        ts,
        cause,
        poll_delay: view.poll_delay_ms,
        error_msg: view.error,
        show_tooltip: view.display.show_tooltip,
        point_radius: view.display.point_radius(),
        charts: view
            .charts
            .as_ref()
            .map(|panels| panels.iter().map(chart_dto).collect()),
    }
}
