use rocket::serde::json::Json;
use rocket::{get, FromForm, State};

use crate::api::videos::CsvExport;
use crate::models::{CreatorQueryResponse, SortOrder};
use crate::services::creators::{self, CreatorSortField};
use crate::services::{dataset, pipeline};
use crate::AppState;

const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Debug, FromForm, Default)]
pub struct CreatorQueryParams {
    /// "all", "valuable", "normal", "low" or "unknown".
    pub level: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub page: Option<usize>,
    #[field(name = "pageSize")]
    pub page_size: Option<usize>,
}

#[get("/?<params..>")]
pub async fn list_creators(
    state: &State<AppState>,
    params: CreatorQueryParams,
) -> Json<CreatorQueryResponse> {
    let (records, _) = state.dataset.snapshot();
    let thresholds = state.learning.latest_analysis();

    let all = creators::group_by_channel(&records);

    let mut filtered = creators::filter_creators(
        all.clone(),
        params.level.as_deref().unwrap_or("all"),
        params.search.as_deref().unwrap_or(""),
        thresholds.as_ref(),
    );

    if let Some(field) = params.sort.as_deref() {
        creators::sort_creators(
            &mut filtered,
            CreatorSortField::parse(field),
            SortOrder::parse(params.order.as_deref().unwrap_or("desc")),
        );
    }

    let stats = creators::creator_stats(&all, filtered.len(), thresholds.as_ref());
    let (items, pagination) = pipeline::paginate(
        &filtered,
        params.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        params.page.unwrap_or(1),
    );

    Json(CreatorQueryResponse {
        creators: items,
        pagination,
        stats,
    })
}

/// Exports the whole filtered creator table, ignoring pagination.
#[get("/export?<level>&<search>")]
pub async fn export_creators(
    state: &State<AppState>,
    level: Option<String>,
    search: Option<String>,
) -> CsvExport {
    let (records, _) = state.dataset.snapshot();
    let thresholds = state.learning.latest_analysis();

    let all = creators::group_by_channel(&records);
    let filtered = creators::filter_creators(
        all,
        level.as_deref().unwrap_or("all"),
        search.as_deref().unwrap_or(""),
        thresholds.as_ref(),
    );

    let body = dataset::write_csv(
        creators::CREATOR_EXPORT_HEADERS,
        &filtered
            .iter()
            .map(|c| creators::creator_export_row(c, thresholds.as_ref()))
            .collect::<Vec<_>>(),
    );
    CsvExport::new(body, "creators")
}
