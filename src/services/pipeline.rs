use crate::constants;
use crate::models::{
    DurationFilter, FilterState, PageInfo, RangeFilter, SecondaryFilters, SortField, SortOrder,
    SortState, TableSortState, VideoRecord,
};
use crate::utils::{
    compare_with_order_float, compare_with_order_int, compare_with_order_str,
    parse_iso8601_to_timestamp,
};
use std::cmp::Ordering;

/// Everything the client controls about one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineQuery {
    pub filter: FilterState,
    pub secondary: SecondaryFilters,
    pub sort: SortState,
    pub table_sort: TableSortState,
}

/// Category / channel / duration predicates. Unmatched or empty state is a
/// no-op filter, never an error.
pub fn apply_primary_filter<'a>(
    records: &'a [VideoRecord],
    state: &FilterState,
) -> Vec<&'a VideoRecord> {
    records
        .iter()
        .filter(|video| match state.category.as_str() {
            "all" => true,
            // "unknown" selects rows whose id has no entry in the category
            // table, not rows literally equal to "unknown"
            "unknown" => constants::is_unclassified(&video.category_id),
            id => video.category_id == id,
        })
        .filter(|video| state.channel == "all" || video.channel_title == state.channel)
        .filter(|video| match &state.duration {
            DurationFilter::All => true,
            DurationFilter::Bucket(bucket) => video.duration_category == *bucket,
            DurationFilter::Custom { min, max } => {
                let minutes = video.duration_seconds as f64 / 60.0;
                minutes >= min.unwrap_or(0.0) && minutes <= max.unwrap_or(f64::INFINITY)
            }
        })
        .collect()
}

/// Conjunction over the active range filters plus the title keyword. The
/// closure returns on the first failing predicate.
pub fn apply_secondary_filters<'a>(
    rows: Vec<&'a VideoRecord>,
    filters: &SecondaryFilters,
) -> Vec<&'a VideoRecord> {
    let keyword = filters.search_keyword.trim().to_lowercase();

    rows.into_iter()
        .filter(|video| {
            if !keyword.is_empty() && !video.title.to_lowercase().contains(&keyword) {
                return false;
            }

            let checks: [(&RangeFilter, f64); 9] = [
                (&filters.channel_subscribers, video.channel_subscribers as f64),
                (&filters.channel_total_views, video.channel_total_views as f64),
                (&filters.channel_video_count, video.channel_video_count as f64),
                (&filters.view_count, video.view_count as f64),
                (&filters.like_count, video.like_count as f64),
                (&filters.comment_count, video.comment_count as f64),
                (&filters.opportunity_score, video.opportunity_score),
                (&filters.explosion, video.explosion),
                (&filters.engagement, video.engagement),
            ];

            for (range, value) in checks {
                if range.is_active() && !range.contains(value) {
                    return false;
                }
            }

            true
        })
        .collect()
}

/// Numeric key used by the custom-range restriction. Text fields have no
/// meaningful numeric value and collapse to 0.
fn sort_value(video: &VideoRecord, field: SortField) -> f64 {
    match field {
        SortField::OpportunityScore => video.opportunity_score,
        SortField::ViewCount => video.view_count as f64,
        SortField::LikeCount => video.like_count as f64,
        SortField::CommentCount => video.comment_count as f64,
        SortField::Explosion => video.explosion,
        SortField::Engagement => video.engagement,
        SortField::ChannelSubscribers => video.channel_subscribers as f64,
        SortField::ChannelTotalViews => video.channel_total_views as f64,
        SortField::ChannelVideoCount => video.channel_video_count as f64,
        SortField::PublishedAt => parse_iso8601_to_timestamp(&video.published_at) as f64,
        SortField::ChannelPublishedAt => {
            parse_iso8601_to_timestamp(&video.channel_published_at) as f64
        }
        SortField::Duration => video.duration_seconds as f64,
        SortField::Title | SortField::ChannelTitle | SortField::CategoryName => 0.0,
    }
}

/// Fixed field-to-comparator table: dates compare by parsed timestamp, counts
/// by integer value, scores by float, text case-folded.
fn compare_records(a: &VideoRecord, b: &VideoRecord, field: SortField, order: &SortOrder) -> Ordering {
    match field {
        SortField::PublishedAt => compare_with_order_int(
            parse_iso8601_to_timestamp(&a.published_at),
            parse_iso8601_to_timestamp(&b.published_at),
            order,
        ),
        SortField::ChannelPublishedAt => compare_with_order_int(
            parse_iso8601_to_timestamp(&a.channel_published_at),
            parse_iso8601_to_timestamp(&b.channel_published_at),
            order,
        ),
        SortField::ViewCount => compare_with_order_int(a.view_count, b.view_count, order),
        SortField::LikeCount => compare_with_order_int(a.like_count, b.like_count, order),
        SortField::CommentCount => compare_with_order_int(a.comment_count, b.comment_count, order),
        SortField::ChannelSubscribers => {
            compare_with_order_int(a.channel_subscribers, b.channel_subscribers, order)
        }
        SortField::ChannelTotalViews => {
            compare_with_order_int(a.channel_total_views, b.channel_total_views, order)
        }
        SortField::ChannelVideoCount => {
            compare_with_order_int(a.channel_video_count, b.channel_video_count, order)
        }
        SortField::Duration => compare_with_order_int(a.duration_seconds, b.duration_seconds, order),
        SortField::OpportunityScore => {
            compare_with_order_float(a.opportunity_score, b.opportunity_score, order)
        }
        SortField::Explosion => compare_with_order_float(a.explosion, b.explosion, order),
        SortField::Engagement => compare_with_order_float(a.engagement, b.engagement, order),
        SortField::Title => compare_with_order_str(&a.title, &b.title, order),
        SortField::ChannelTitle => compare_with_order_str(&a.channel_title, &b.channel_title, order),
        SortField::CategoryName => compare_with_order_str(&a.category_name, &b.category_name, order),
    }
}

/// Orders the filtered rows. An active table sort wins over the primary sort
/// and suppresses the custom range-drop; `custom` primary order restricts the
/// rows to the field's own bounds before ordering them descending.
pub fn sort_records(rows: &mut Vec<&VideoRecord>, sort: &SortState, table_sort: &TableSortState) {
    if let Some(field) = table_sort.field {
        let order = table_sort.order.unwrap_or(SortOrder::Desc);
        rows.sort_by(|a, b| compare_records(a, b, field, &order));
        return;
    }

    if sort.order == SortOrder::Custom {
        let range = RangeFilter::new(sort.custom_min, sort.custom_max);
        rows.retain(|video| range.contains(sort_value(video, sort.field)));
    }

    rows.sort_by(|a, b| compare_records(a, b, sort.field, &sort.order));
}

/// Slices an ordered collection into one page and computes page metadata.
/// `current_page` is clamped into `[1, total_pages]`, never 0 or negative.
pub fn paginate<T: Clone>(
    rows: &[T],
    page_size: usize,
    current_page: usize,
) -> (Vec<T>, PageInfo) {
    let page_size = page_size.max(1);
    let total_items = rows.len();
    let total_pages = (total_items.div_ceil(page_size)).max(1);
    let current_page = current_page.clamp(1, total_pages);

    let start = (current_page - 1) * page_size;
    let end = (start + page_size).min(total_items);
    let items: Vec<T> = if start < total_items {
        rows[start..end].to_vec()
    } else {
        Vec::new()
    };

    let info = PageInfo {
        current_page,
        total_pages,
        page_size,
        total_items,
        start_index: if total_items == 0 { 0 } else { start + 1 },
        end_index: end,
        has_next_page: current_page < total_pages && total_items > 0,
        has_prev_page: current_page > 1,
    };

    (items, info)
}

/// The whole derivation minus pagination: primary filter, secondary filter,
/// sort. Statistics, charts and exports all consume this output.
pub fn run<'a>(records: &'a [VideoRecord], query: &PipelineQuery) -> Vec<&'a VideoRecord> {
    let mut rows = apply_primary_filter(records, &query.filter);
    rows = apply_secondary_filters(rows, &query.secondary);
    sort_records(&mut rows, &query.sort, &query.table_sort);
    rows
}
