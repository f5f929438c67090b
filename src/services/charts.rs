use std::collections::HashMap;

use crate::models::{
    CategoryBar, ChartBundle, MetricPoint, PieSlice, ScatterPoint, SecondaryFilters, VideoRecord,
};

const PIE_TOP_CATEGORIES: usize = 10;
const BAR_TOP_CATEGORIES: usize = 10;
const METRIC_CHART_MAX_ITEMS: usize = 50;

/// The nine numeric columns the metric ranking chart can plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricField {
    ViewCount,
    LikeCount,
    CommentCount,
    ChannelSubscribers,
    ChannelTotalViews,
    ChannelVideoCount,
    OpportunityScore,
    Explosion,
    Engagement,
}

impl MetricField {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "viewCount" => Some(MetricField::ViewCount),
            "likeCount" => Some(MetricField::LikeCount),
            "commentCount" => Some(MetricField::CommentCount),
            "channelSubscribers" => Some(MetricField::ChannelSubscribers),
            "channelTotalViews" => Some(MetricField::ChannelTotalViews),
            "channelVideoCount" => Some(MetricField::ChannelVideoCount),
            "opportunity_score" => Some(MetricField::OpportunityScore),
            "explosion" => Some(MetricField::Explosion),
            "engagement" => Some(MetricField::Engagement),
            _ => None,
        }
    }

    pub fn value(&self, video: &VideoRecord) -> f64 {
        match self {
            MetricField::ViewCount => video.view_count as f64,
            MetricField::LikeCount => video.like_count as f64,
            MetricField::CommentCount => video.comment_count as f64,
            MetricField::ChannelSubscribers => video.channel_subscribers as f64,
            MetricField::ChannelTotalViews => video.channel_total_views as f64,
            MetricField::ChannelVideoCount => video.channel_video_count as f64,
            MetricField::OpportunityScore => video.opportunity_score,
            MetricField::Explosion => video.explosion,
            MetricField::Engagement => video.engagement,
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Views vs opportunity score, bubble size proportional to interaction rate.
pub fn scatter_data(rows: &[&VideoRecord]) -> Vec<ScatterPoint> {
    rows.iter()
        .map(|video| {
            let views = video.view_count;
            let interaction_rate = if views > 0 {
                (video.like_count + video.comment_count) as f64 / views as f64 * 100.0
            } else {
                0.0
            };

            ScatterPoint {
                x: views,
                y: video.opportunity_score,
                z: (interaction_rate * 100.0).max(10.0),
                title: video.title.clone(),
                video_url: video.video_url.clone(),
                category: video.category_name.clone(),
                interaction_rate: round2(interaction_rate),
            }
        })
        .collect()
}

/// Per-category groups in first-seen order, so repeated runs over the same
/// snapshot produce the same tie ordering.
fn group_by_category<'a>(rows: &[&'a VideoRecord]) -> Vec<(String, Vec<&'a VideoRecord>)> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<&VideoRecord>)> = Vec::new();

    for video in rows {
        match index.get(video.category_name.as_str()) {
            Some(&i) => groups[i].1.push(video),
            None => {
                index.insert(video.category_name.as_str(), groups.len());
                groups.push((video.category_name.clone(), vec![video]));
            }
        }
    }

    groups
}

/// Top-10 categories by video count.
pub fn pie_data(rows: &[&VideoRecord]) -> Vec<PieSlice> {
    let mut slices: Vec<PieSlice> = group_by_category(rows)
        .into_iter()
        .map(|(name, videos)| PieSlice {
            name,
            value: videos.len(),
        })
        .collect();

    slices.sort_by(|a, b| b.value.cmp(&a.value));
    slices.truncate(PIE_TOP_CATEGORIES);
    slices
}

/// Top-10 categories by average opportunity score.
pub fn bar_data(rows: &[&VideoRecord]) -> Vec<CategoryBar> {
    let mut bars: Vec<CategoryBar> = group_by_category(rows)
        .into_iter()
        .map(|(category, videos)| {
            let count = videos.len();
            let score_sum: f64 = videos.iter().map(|v| v.opportunity_score).sum();
            let view_sum: i64 = videos.iter().map(|v| v.view_count).sum();
            CategoryBar {
                category,
                avg_score: round1(score_sum / count as f64),
                avg_views: (view_sum as f64 / count as f64).round() as i64,
                count,
            }
        })
        .collect();

    bars.sort_by(|a, b| {
        b.avg_score
            .partial_cmp(&a.avg_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    bars.truncate(BAR_TOP_CATEGORIES);
    bars
}

pub fn chart_bundle(rows: &[&VideoRecord]) -> ChartBundle {
    ChartBundle {
        scatter: scatter_data(rows),
        pie: pie_data(rows),
        bar: bar_data(rows),
    }
}

/// Which metric the ranking chart orders by: the selected one if its range
/// filter is active, otherwise the first active range, otherwise view count.
pub fn active_metric(filters: &SecondaryFilters, selected: MetricField) -> MetricField {
    let candidates = [
        (MetricField::ChannelSubscribers, &filters.channel_subscribers),
        (MetricField::ChannelTotalViews, &filters.channel_total_views),
        (MetricField::ChannelVideoCount, &filters.channel_video_count),
        (MetricField::ViewCount, &filters.view_count),
        (MetricField::LikeCount, &filters.like_count),
        (MetricField::CommentCount, &filters.comment_count),
        (MetricField::OpportunityScore, &filters.opportunity_score),
        (MetricField::Explosion, &filters.explosion),
        (MetricField::Engagement, &filters.engagement),
    ];

    let active: Vec<MetricField> = candidates
        .iter()
        .filter(|(_, range)| range.is_active())
        .map(|(field, _)| *field)
        .collect();

    if active.contains(&selected) {
        selected
    } else {
        active.first().copied().unwrap_or(MetricField::ViewCount)
    }
}

fn truncate_title(title: &str, max_chars: usize) -> String {
    if title.chars().count() <= max_chars {
        title.to_string()
    } else {
        let prefix: String = title.chars().take(max_chars).collect();
        format!("{prefix}...")
    }
}

/// Descending ranking of the filtered rows by the active metric, capped for
/// chart readability; the plotted value is the selected metric.
pub fn metric_ranking(
    rows: &[&VideoRecord],
    filters: &SecondaryFilters,
    selected: MetricField,
) -> Vec<MetricPoint> {
    let ranking_field = active_metric(filters, selected);

    let mut sorted: Vec<&VideoRecord> = rows.to_vec();
    sorted.sort_by(|a, b| {
        ranking_field
            .value(b)
            .partial_cmp(&ranking_field.value(a))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    sorted
        .iter()
        .take(METRIC_CHART_MAX_ITEMS)
        .enumerate()
        .map(|(i, video)| MetricPoint {
            index: i + 1,
            title: truncate_title(&video.title, 30),
            full_title: video.title.clone(),
            value: selected.value(video),
            channel_title: video.channel_title.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DurationCategory, RangeFilter};

    fn record(category: &str, views: i64, likes: i64, score: f64) -> VideoRecord {
        VideoRecord {
            video_id: format!("{category}-{views}"),
            title: format!("{category} video"),
            channel_id: String::new(),
            channel_title: "ch".to_string(),
            category_id: String::new(),
            category_name: category.to_string(),
            published_at: String::new(),
            channel_published_at: String::new(),
            duration_seconds: 0,
            duration_category: DurationCategory::Unknown,
            duration_label: String::new(),
            view_count: views,
            like_count: likes,
            comment_count: 0,
            channel_subscribers: 0,
            channel_total_views: 0,
            channel_video_count: 0,
            opportunity_score: score,
            explosion: 0.0,
            engagement: 0.0,
            tags: String::new(),
            video_url: String::new(),
        }
    }

    #[test]
    fn scatter_bubble_has_minimum_size() {
        let records = vec![record("Gaming", 0, 0, 10.0)];
        let rows: Vec<&VideoRecord> = records.iter().collect();
        let points = scatter_data(&rows);
        assert_eq!(points[0].z, 10.0);
        assert_eq!(points[0].interaction_rate, 0.0);
    }

    #[test]
    fn scatter_interaction_rate_is_percent_of_views() {
        let records = vec![record("Gaming", 1000, 50, 10.0)];
        let rows: Vec<&VideoRecord> = records.iter().collect();
        let points = scatter_data(&rows);
        assert_eq!(points[0].interaction_rate, 5.0);
        assert_eq!(points[0].z, 500.0);
    }

    #[test]
    fn pie_sorts_by_count_descending() {
        let records = vec![
            record("Music", 1, 0, 0.0),
            record("Gaming", 1, 0, 0.0),
            record("Gaming", 2, 0, 0.0),
        ];
        let rows: Vec<&VideoRecord> = records.iter().collect();
        let slices = pie_data(&rows);
        assert_eq!(slices[0].name, "Gaming");
        assert_eq!(slices[0].value, 2);
    }

    #[test]
    fn bar_averages_per_category() {
        let records = vec![
            record("Gaming", 100, 0, 80.0),
            record("Gaming", 300, 0, 40.0),
            record("Music", 10, 0, 90.0),
        ];
        let rows: Vec<&VideoRecord> = records.iter().collect();
        let bars = bar_data(&rows);
        assert_eq!(bars[0].category, "Music");
        assert_eq!(bars[1].category, "Gaming");
        assert_eq!(bars[1].avg_score, 60.0);
        assert_eq!(bars[1].avg_views, 200);
        assert_eq!(bars[1].count, 2);
    }

    #[test]
    fn active_metric_prefers_the_selected_filter() {
        let filters = SecondaryFilters {
            like_count: RangeFilter::new(Some(1.0), None),
            engagement: RangeFilter::new(Some(0.5), None),
            ..SecondaryFilters::default()
        };
        assert_eq!(
            active_metric(&filters, MetricField::Engagement),
            MetricField::Engagement
        );
        // selected metric inactive: first active wins
        assert_eq!(
            active_metric(&filters, MetricField::ViewCount),
            MetricField::LikeCount
        );
    }

    #[test]
    fn metric_ranking_orders_descending_and_caps() {
        let records: Vec<VideoRecord> = (0..60)
            .map(|i| record("Gaming", i, 0, 0.0))
            .collect();
        let rows: Vec<&VideoRecord> = records.iter().collect();
        let points = metric_ranking(&rows, &SecondaryFilters::default(), MetricField::ViewCount);
        assert_eq!(points.len(), 50);
        assert_eq!(points[0].value, 59.0);
        assert_eq!(points[0].index, 1);
    }
}
