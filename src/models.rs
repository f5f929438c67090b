use serde::{Deserialize, Serialize};

use crate::constants;

/// Coarse duration bucket assigned upstream in the export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationCategory {
    Short,
    Normal,
    Medium,
    Long,
    Movie,
    Unknown,
}

impl DurationCategory {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "short" => DurationCategory::Short,
            "normal" => DurationCategory::Normal,
            "medium" => DurationCategory::Medium,
            "long" => DurationCategory::Long,
            "movie" => DurationCategory::Movie,
            _ => DurationCategory::Unknown,
        }
    }

    pub fn as_key(&self) -> &'static str {
        match self {
            DurationCategory::Short => "short",
            DurationCategory::Normal => "normal",
            DurationCategory::Medium => "medium",
            DurationCategory::Long => "long",
            DurationCategory::Movie => "movie",
            DurationCategory::Unknown => "unknown",
        }
    }

    pub fn label(&self) -> &'static str {
        constants::duration_label(self.as_key())
    }
}

/// One normalized row of the uploaded dataset. Immutable after load; the
/// pipeline only selects and reorders views of these records.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    pub video_id: String,
    pub title: String,
    pub channel_id: String,
    pub channel_title: String,
    pub category_id: String,
    pub category_name: String,
    pub published_at: String,
    pub channel_published_at: String,
    pub duration_seconds: i64,
    pub duration_category: DurationCategory,
    pub duration_label: String,
    pub view_count: i64,
    pub like_count: i64,
    pub comment_count: i64,
    pub channel_subscribers: i64,
    pub channel_total_views: i64,
    pub channel_video_count: i64,
    #[serde(rename = "opportunity_score")]
    pub opportunity_score: f64,
    pub explosion: f64,
    pub engagement: f64,
    pub tags: String,
    pub video_url: String,
}

/// Primary filter selection: category, channel and duration.
#[derive(Debug, Clone)]
pub struct FilterState {
    /// "all", "unknown" (ids absent from the category table) or a category id.
    pub category: String,
    /// "all" or an exact channel title.
    pub channel: String,
    pub duration: DurationFilter,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DurationFilter {
    All,
    Bucket(DurationCategory),
    /// Minutes range; an absent bound is unbounded on that side.
    Custom {
        min: Option<f64>,
        max: Option<f64>,
    },
}

impl Default for FilterState {
    fn default() -> Self {
        FilterState {
            category: "all".to_string(),
            channel: "all".to_string(),
            duration: DurationFilter::All,
        }
    }
}

/// A numeric range constraint. Active iff at least one bound is set; an
/// inactive range imposes no constraint.
#[derive(Debug, Clone, Copy, Default)]
pub struct RangeFilter {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl RangeFilter {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        RangeFilter { min, max }
    }

    pub fn is_active(&self) -> bool {
        self.min.is_some() || self.max.is_some()
    }

    pub fn contains(&self, value: f64) -> bool {
        let min = self.min.unwrap_or(f64::NEG_INFINITY);
        let max = self.max.unwrap_or(f64::INFINITY);
        value >= min && value <= max
    }
}

/// Secondary filter set: nine independent numeric ranges plus a title keyword.
#[derive(Debug, Clone, Default)]
pub struct SecondaryFilters {
    pub channel_subscribers: RangeFilter,
    pub channel_total_views: RangeFilter,
    pub channel_video_count: RangeFilter,
    pub view_count: RangeFilter,
    pub like_count: RangeFilter,
    pub comment_count: RangeFilter,
    pub opportunity_score: RangeFilter,
    pub explosion: RangeFilter,
    pub engagement: RangeFilter,
    pub search_keyword: String,
}

/// Closed set of sortable fields, each with a fixed comparator policy.
/// `parse` owns the wire-name mapping; these values never travel in JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    OpportunityScore,
    ViewCount,
    LikeCount,
    CommentCount,
    Explosion,
    Engagement,
    ChannelSubscribers,
    ChannelTotalViews,
    ChannelVideoCount,
    PublishedAt,
    ChannelPublishedAt,
    Duration,
    Title,
    ChannelTitle,
    CategoryName,
}

impl SortField {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "opportunity_score" => Some(SortField::OpportunityScore),
            "viewCount" => Some(SortField::ViewCount),
            "likeCount" => Some(SortField::LikeCount),
            "commentCount" => Some(SortField::CommentCount),
            "explosion" => Some(SortField::Explosion),
            "engagement" => Some(SortField::Engagement),
            "channelSubscribers" => Some(SortField::ChannelSubscribers),
            "channelTotalViews" => Some(SortField::ChannelTotalViews),
            "channelVideoCount" => Some(SortField::ChannelVideoCount),
            "publishedAt" => Some(SortField::PublishedAt),
            "channelPublishedAt" => Some(SortField::ChannelPublishedAt),
            "duration" => Some(SortField::Duration),
            "title" => Some(SortField::Title),
            "channelTitle" => Some(SortField::ChannelTitle),
            "categoryName" => Some(SortField::CategoryName),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
    Custom,
}

impl SortOrder {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "asc" => SortOrder::Asc,
            "custom" => SortOrder::Custom,
            _ => SortOrder::Desc,
        }
    }
}

/// Primary sort. In `custom` order the field's own bounds additionally
/// restrict the result set: out-of-range rows are dropped, not reordered.
#[derive(Debug, Clone)]
pub struct SortState {
    pub field: SortField,
    pub order: SortOrder,
    pub custom_min: Option<f64>,
    pub custom_max: Option<f64>,
}

impl Default for SortState {
    fn default() -> Self {
        SortState {
            field: SortField::OpportunityScore,
            order: SortOrder::Desc,
            custom_min: None,
            custom_max: None,
        }
    }
}

/// Column-header sort. When set it takes precedence over the primary sort and
/// suppresses the custom range-drop.
#[derive(Debug, Clone, Default)]
pub struct TableSortState {
    pub field: Option<SortField>,
    pub order: Option<SortOrder>,
}

impl TableSortState {
    pub fn is_active(&self) -> bool {
        self.field.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub current_page: usize,
    pub total_pages: usize,
    pub page_size: usize,
    pub total_items: usize,
    /// 1-based index of the first item on the page, 0 when empty.
    pub start_index: usize,
    /// 1-based index of the last item on the page, 0 when empty.
    pub end_index: usize,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

/// Summary statistics over the filtered set (never the current page).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_videos: usize,
    pub filtered_videos: usize,
    pub total_views: i64,
    pub total_likes: i64,
    pub total_comments: i64,
    pub avg_views: f64,
    pub avg_opportunity_score: f64,
    pub top_score: f64,
    pub unique_channels: usize,
    pub filtering_active: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoQueryResponse {
    pub videos: Vec<VideoRecord>,
    pub pagination: PageInfo,
    pub statistics: Statistics,
}

#[derive(Debug, Serialize)]
pub struct CategoryFacet {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct FacetsResponse {
    pub categories: Vec<CategoryFacet>,
    pub channels: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSummary {
    pub loaded: bool,
    pub total_rows: usize,
    pub generation: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub total_rows: usize,
    pub generation: u64,
}

// --- chart shapes ---------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScatterPoint {
    pub x: i64,
    pub y: f64,
    /// Bubble size, proportional to interaction rate, floor of 10.
    pub z: f64,
    pub title: String,
    pub video_url: String,
    pub category: String,
    pub interaction_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PieSlice {
    pub name: String,
    pub value: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBar {
    pub category: String,
    pub avg_score: f64,
    pub avg_views: i64,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricPoint {
    pub index: usize,
    pub title: String,
    pub full_title: String,
    pub value: f64,
    pub channel_title: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartBundle {
    pub scatter: Vec<ScatterPoint>,
    pub pie: Vec<PieSlice>,
    pub bar: Vec<CategoryBar>,
}

// --- creator aggregation --------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatorMetrics {
    /// `max(0, 1 - stddev/avg)`, 1.0 when the average is zero.
    pub consistency: f64,
    pub std_dev: f64,
    pub score_min: f64,
    pub score_max: f64,
    pub score_avg: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatorAggregate {
    pub id: String,
    pub name: String,
    pub video_count: usize,
    pub max_score: f64,
    pub avg_score: f64,
    pub best_video_title: String,
    pub best_video_url: String,
    pub metrics: CreatorMetrics,
    /// Position in the max-score-descending ordering, starting at 1.
    pub rank: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreatorLevel {
    Valuable,
    Normal,
    Low,
    Unknown,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatorStats {
    pub total: usize,
    pub filtered: usize,
    pub avg_max_score: f64,
    pub valuable: usize,
    pub normal: usize,
    pub low: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatorQueryResponse {
    pub creators: Vec<CreatorAggregate>,
    pub pagination: PageInfo,
    pub stats: CreatorStats,
}

// --- Gemini analysis ------------------------------------------------------

/// Strict shape expected back from the model. Parsing this with serde is the
/// whole validation story: anything that does not fit is rejected.
#[derive(Debug, Clone, Deserialize)]
pub struct GeminiThresholds {
    pub valuable: GeminiThresholdBand,
    pub normal: GeminiRangeBand,
    pub low: GeminiThresholdBand,
    #[serde(rename = "analysisText", default)]
    pub analysis_text: String,
    #[serde(rename = "keyInsights", default)]
    pub key_insights: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiThresholdBand {
    pub threshold: f64,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(rename = "businessValue", default)]
    pub business_value: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiRangeBand {
    pub min: f64,
    pub max: f64,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(rename = "businessValue", default)]
    pub business_value: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BandReport {
    pub threshold: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub reason: String,
    pub confidence: Option<f64>,
    pub business_value: Option<String>,
    /// Share of creators falling in this band, whole percent.
    pub percentage: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdAnalysis {
    pub valuable: BandReport,
    pub normal: BandReport,
    pub low: BandReport,
    pub analysis_text: String,
    pub key_insights: Vec<String>,
    pub recommendations: Vec<String>,
    /// "full_dataset" or "summary_and_samples".
    pub data_type: String,
    pub total_analyzed: usize,
    /// Dataset generation the analysis was computed against.
    pub generation: u64,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub success: bool,
    pub reply: String,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    pub api_key_configured: bool,
    pub daily_requests_used: u32,
    pub remaining_requests: u32,
    pub request_limit_reached: bool,
    pub total_analyses: usize,
    pub total_feedback: usize,
    pub avg_feedback: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct ApiMessage {
    pub success: bool,
    pub message: String,
}

impl ApiMessage {
    pub fn ok(message: impl Into<String>) -> Self {
        ApiMessage {
            success: true,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ApiMessage {
            success: false,
            message: message.into(),
        }
    }
}

// --- learning feedback store ----------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LearningData {
    #[serde(default)]
    pub patterns: Vec<PatternRecord>,
    #[serde(default)]
    pub feedback: Vec<FeedbackRecord>,
    #[serde(default)]
    pub analysis_history: Vec<AnalysisRecord>,
    #[serde(default)]
    pub requests_today: u32,
    #[serde(default)]
    pub request_date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternRecord {
    pub timestamp: i64,
    pub high_performer_count: usize,
    pub top_title_keywords: Vec<(String, u32)>,
    pub avg_high_performer_score: f64,
    pub avg_low_performer_score: f64,
    pub top_creators: Vec<TopCreatorPattern>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopCreatorPattern {
    pub name: String,
    pub score: f64,
    pub video_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRecord {
    pub timestamp: i64,
    pub rating: u8,
    pub comment: String,
    pub valuable_threshold: Option<f64>,
    pub data_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub timestamp: i64,
    pub data_size: usize,
    pub data_type: String,
    pub valuable_threshold: f64,
    pub normal_min: f64,
    pub normal_max: f64,
    pub low_threshold: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_field_parses_every_wire_name() {
        let cases = [
            ("opportunity_score", SortField::OpportunityScore),
            ("viewCount", SortField::ViewCount),
            ("likeCount", SortField::LikeCount),
            ("commentCount", SortField::CommentCount),
            ("explosion", SortField::Explosion),
            ("engagement", SortField::Engagement),
            ("channelSubscribers", SortField::ChannelSubscribers),
            ("channelTotalViews", SortField::ChannelTotalViews),
            ("channelVideoCount", SortField::ChannelVideoCount),
            ("publishedAt", SortField::PublishedAt),
            ("channelPublishedAt", SortField::ChannelPublishedAt),
            ("duration", SortField::Duration),
            ("title", SortField::Title),
            ("channelTitle", SortField::ChannelTitle),
            ("categoryName", SortField::CategoryName),
        ];
        for (wire, field) in cases {
            assert_eq!(SortField::parse(wire), Some(field), "{wire}");
        }
        assert_eq!(SortField::parse("opportunityScore"), None);
        assert_eq!(SortField::parse(""), None);
    }

    #[test]
    fn sort_order_defaults_to_descending() {
        assert_eq!(SortOrder::parse("asc"), SortOrder::Asc);
        assert_eq!(SortOrder::parse("custom"), SortOrder::Custom);
        assert_eq!(SortOrder::parse("desc"), SortOrder::Desc);
        assert_eq!(SortOrder::parse("anything else"), SortOrder::Desc);
    }
}
