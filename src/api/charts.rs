use rocket::serde::json::Json;
use rocket::{get, State};

use crate::api::videos::VideoQueryParams;
use crate::models::{ChartBundle, MetricPoint};
use crate::services::charts::{self, MetricField};
use crate::services::pipeline;
use crate::AppState;

/// Scatter, pie and bar data over the filtered set.
#[get("/?<params..>")]
pub async fn chart_data(state: &State<AppState>, params: VideoQueryParams) -> Json<ChartBundle> {
    let (records, _) = state.dataset.snapshot();
    let query = params.to_pipeline_query();
    let rows = pipeline::run(&records, &query);
    Json(charts::chart_bundle(&rows))
}

#[get("/metric?<metric>&<params..>")]
pub async fn metric_chart(
    state: &State<AppState>,
    metric: Option<String>,
    params: VideoQueryParams,
) -> Json<Vec<MetricPoint>> {
    let (records, _) = state.dataset.snapshot();
    let query = params.to_pipeline_query();
    let rows = pipeline::run(&records, &query);

    let selected = metric
        .as_deref()
        .and_then(MetricField::parse)
        .unwrap_or(MetricField::ViewCount);

    Json(charts::metric_ranking(&rows, &query.secondary, selected))
}
