use rocket::http::Header;
use rocket::serde::json::Json;
use rocket::{get, FromForm, Responder, State};

use crate::constants;
use crate::models::{
    CategoryFacet, DurationCategory, DurationFilter, FacetsResponse, FilterState, RangeFilter,
    SecondaryFilters, SortField, SortOrder, SortState, TableSortState, VideoQueryResponse,
    VideoRecord,
};
use crate::services::pipeline::{self, PipelineQuery};
use crate::services::{dataset, stats};
use crate::AppState;

const DEFAULT_PAGE_SIZE: usize = 20;

/// Wire form of one pipeline query. Every field is optional; an absent field
/// leaves that stage at its default.
#[derive(Debug, FromForm, Default)]
pub struct VideoQueryParams {
    pub category: Option<String>,
    pub channel: Option<String>,
    /// "all", a duration bucket key, or "custom" with the minute bounds below.
    pub duration: Option<String>,
    #[field(name = "durationMin")]
    pub duration_min: Option<f64>,
    #[field(name = "durationMax")]
    pub duration_max: Option<f64>,
    #[field(name = "channelSubscribersMin")]
    pub channel_subscribers_min: Option<f64>,
    #[field(name = "channelSubscribersMax")]
    pub channel_subscribers_max: Option<f64>,
    #[field(name = "channelTotalViewsMin")]
    pub channel_total_views_min: Option<f64>,
    #[field(name = "channelTotalViewsMax")]
    pub channel_total_views_max: Option<f64>,
    #[field(name = "channelVideoCountMin")]
    pub channel_video_count_min: Option<f64>,
    #[field(name = "channelVideoCountMax")]
    pub channel_video_count_max: Option<f64>,
    #[field(name = "viewCountMin")]
    pub view_count_min: Option<f64>,
    #[field(name = "viewCountMax")]
    pub view_count_max: Option<f64>,
    #[field(name = "likeCountMin")]
    pub like_count_min: Option<f64>,
    #[field(name = "likeCountMax")]
    pub like_count_max: Option<f64>,
    #[field(name = "commentCountMin")]
    pub comment_count_min: Option<f64>,
    #[field(name = "commentCountMax")]
    pub comment_count_max: Option<f64>,
    #[field(name = "opportunityScoreMin")]
    pub opportunity_score_min: Option<f64>,
    #[field(name = "opportunityScoreMax")]
    pub opportunity_score_max: Option<f64>,
    #[field(name = "explosionMin")]
    pub explosion_min: Option<f64>,
    #[field(name = "explosionMax")]
    pub explosion_max: Option<f64>,
    #[field(name = "engagementMin")]
    pub engagement_min: Option<f64>,
    #[field(name = "engagementMax")]
    pub engagement_max: Option<f64>,
    pub search: Option<String>,
    #[field(name = "sortField")]
    pub sort_field: Option<String>,
    #[field(name = "sortOrder")]
    pub sort_order: Option<String>,
    #[field(name = "customMin")]
    pub custom_min: Option<f64>,
    #[field(name = "customMax")]
    pub custom_max: Option<f64>,
    #[field(name = "tableSortField")]
    pub table_sort_field: Option<String>,
    #[field(name = "tableSortOrder")]
    pub table_sort_order: Option<String>,
    pub page: Option<usize>,
    #[field(name = "pageSize")]
    pub page_size: Option<usize>,
}

impl VideoQueryParams {
    pub fn to_pipeline_query(&self) -> PipelineQuery {
        let duration = match self.duration.as_deref() {
            None | Some("all") => DurationFilter::All,
            Some("custom") => DurationFilter::Custom {
                min: self.duration_min,
                max: self.duration_max,
            },
            Some(key) => DurationFilter::Bucket(DurationCategory::parse(key)),
        };

        let filter = FilterState {
            category: self.category.clone().unwrap_or_else(|| "all".to_string()),
            channel: self.channel.clone().unwrap_or_else(|| "all".to_string()),
            duration,
        };

        let secondary = SecondaryFilters {
            channel_subscribers: RangeFilter::new(
                self.channel_subscribers_min,
                self.channel_subscribers_max,
            ),
            channel_total_views: RangeFilter::new(
                self.channel_total_views_min,
                self.channel_total_views_max,
            ),
            channel_video_count: RangeFilter::new(
                self.channel_video_count_min,
                self.channel_video_count_max,
            ),
            view_count: RangeFilter::new(self.view_count_min, self.view_count_max),
            like_count: RangeFilter::new(self.like_count_min, self.like_count_max),
            comment_count: RangeFilter::new(self.comment_count_min, self.comment_count_max),
            opportunity_score: RangeFilter::new(
                self.opportunity_score_min,
                self.opportunity_score_max,
            ),
            explosion: RangeFilter::new(self.explosion_min, self.explosion_max),
            engagement: RangeFilter::new(self.engagement_min, self.engagement_max),
            search_keyword: self.search.clone().unwrap_or_default(),
        };

        let sort = SortState {
            field: self
                .sort_field
                .as_deref()
                .and_then(SortField::parse)
                .unwrap_or(SortField::OpportunityScore),
            order: self
                .sort_order
                .as_deref()
                .map(SortOrder::parse)
                .unwrap_or(SortOrder::Desc),
            custom_min: self.custom_min,
            custom_max: self.custom_max,
        };

        let table_sort = TableSortState {
            field: self.table_sort_field.as_deref().and_then(SortField::parse),
            order: self.table_sort_order.as_deref().map(SortOrder::parse),
        };

        PipelineQuery {
            filter,
            secondary,
            sort,
            table_sort,
        }
    }
}

#[get("/?<params..>")]
pub async fn list_videos(
    state: &State<AppState>,
    params: VideoQueryParams,
) -> Json<VideoQueryResponse> {
    let (records, _) = state.dataset.snapshot();
    let query = params.to_pipeline_query();
    let rows = pipeline::run(&records, &query);

    let statistics = stats::aggregate(records.len(), &rows);
    let page_size = params.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    let (page, pagination) = pipeline::paginate(&rows, page_size, params.page.unwrap_or(1));

    Json(VideoQueryResponse {
        videos: page.into_iter().cloned().collect(),
        pagination,
        statistics,
    })
}

#[derive(Responder)]
#[response(status = 200, content_type = "text/csv; charset=utf-8")]
pub struct CsvExport {
    pub body: String,
    pub disposition: Header<'static>,
}

impl CsvExport {
    pub fn new(body: String, base_name: &str) -> Self {
        CsvExport {
            body,
            disposition: Header::new(
                "Content-Disposition",
                format!(
                    "attachment; filename=\"{}\"",
                    dataset::export_filename(base_name)
                ),
            ),
        }
    }
}

/// Exports the whole filtered and sorted set, ignoring pagination.
#[get("/export?<params..>")]
pub async fn export_videos(state: &State<AppState>, params: VideoQueryParams) -> CsvExport {
    let (records, _) = state.dataset.snapshot();
    let query = params.to_pipeline_query();
    let rows = pipeline::run(&records, &query);

    let body = dataset::write_csv(
        dataset::VIDEO_EXPORT_HEADERS,
        &rows
            .iter()
            .map(|v| dataset::video_export_row(v))
            .collect::<Vec<_>>(),
    );
    CsvExport::new(body, "videos")
}

/// Filter options present in the current dataset: categories in table order
/// plus an "unknown" entry for unmapped ids, channels alphabetically.
#[get("/facets")]
pub async fn video_facets(state: &State<AppState>) -> Json<FacetsResponse> {
    let (records, _) = state.dataset.snapshot();

    let categories = build_category_facets(&records);

    let mut channels: Vec<String> = records
        .iter()
        .map(|v| v.channel_title.clone())
        .collect::<std::collections::HashSet<_>>()
        .into_iter()
        .collect();
    channels.sort_by_key(|c| c.to_lowercase());

    Json(FacetsResponse {
        categories,
        channels,
    })
}

fn build_category_facets(records: &[VideoRecord]) -> Vec<CategoryFacet> {
    let mut facets: Vec<CategoryFacet> = constants::CATEGORY_MAPPING
        .iter()
        .filter(|(id, _)| records.iter().any(|v| v.category_id == *id))
        .map(|(id, name)| CategoryFacet {
            id: id.to_string(),
            name: name.to_string(),
        })
        .collect();

    if records
        .iter()
        .any(|v| constants::is_unclassified(&v.category_id))
    {
        facets.push(CategoryFacet {
            id: "unknown".to_string(),
            name: constants::UNCLASSIFIED_CATEGORY.to_string(),
        });
    }

    facets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DurationCategory;

    #[test]
    fn empty_params_map_to_defaults() {
        let query = VideoQueryParams::default().to_pipeline_query();
        assert_eq!(query.filter.category, "all");
        assert_eq!(query.filter.duration, DurationFilter::All);
        assert_eq!(query.sort.field, SortField::OpportunityScore);
        assert_eq!(query.sort.order, SortOrder::Desc);
        assert!(!query.table_sort.is_active());
    }

    #[test]
    fn custom_duration_carries_minute_bounds() {
        let params = VideoQueryParams {
            duration: Some("custom".to_string()),
            duration_min: Some(2.0),
            duration_max: Some(10.0),
            ..VideoQueryParams::default()
        };
        let query = params.to_pipeline_query();
        assert_eq!(
            query.filter.duration,
            DurationFilter::Custom {
                min: Some(2.0),
                max: Some(10.0)
            }
        );
    }

    #[test]
    fn bucket_duration_parses_the_key() {
        let params = VideoQueryParams {
            duration: Some("short".to_string()),
            ..VideoQueryParams::default()
        };
        assert_eq!(
            params.to_pipeline_query().filter.duration,
            DurationFilter::Bucket(DurationCategory::Short)
        );
    }

    #[test]
    fn unparsable_sort_field_falls_back_to_score() {
        let params = VideoQueryParams {
            sort_field: Some("bogus".to_string()),
            sort_order: Some("asc".to_string()),
            ..VideoQueryParams::default()
        };
        let query = params.to_pipeline_query();
        assert_eq!(query.sort.field, SortField::OpportunityScore);
        assert_eq!(query.sort.order, SortOrder::Asc);
    }
}
