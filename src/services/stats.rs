use std::collections::HashSet;

use crate::models::{Statistics, VideoRecord};

/// Summary statistics over the filtered set. Zero-score rows stay in both the
/// count and the average denominator, matching the dashboard totals.
pub fn aggregate(total_videos: usize, filtered: &[&VideoRecord]) -> Statistics {
    let filtered_videos = filtered.len();

    let total_views: i64 = filtered.iter().map(|v| v.view_count).sum();
    let total_likes: i64 = filtered.iter().map(|v| v.like_count).sum();
    let total_comments: i64 = filtered.iter().map(|v| v.comment_count).sum();

    let (avg_views, avg_opportunity_score) = if filtered_videos > 0 {
        let score_sum: f64 = filtered.iter().map(|v| v.opportunity_score).sum();
        (
            total_views as f64 / filtered_videos as f64,
            score_sum / filtered_videos as f64,
        )
    } else {
        (0.0, 0.0)
    };

    let top_score = filtered
        .iter()
        .map(|v| v.opportunity_score)
        .fold(0.0_f64, f64::max);

    let unique_channels = filtered
        .iter()
        .map(|v| v.channel_title.as_str())
        .collect::<HashSet<_>>()
        .len();

    Statistics {
        total_videos,
        filtered_videos,
        total_views,
        total_likes,
        total_comments,
        avg_views,
        avg_opportunity_score,
        top_score,
        unique_channels,
        filtering_active: filtered_videos < total_videos,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DurationCategory;

    fn record(channel: &str, views: i64, score: f64) -> VideoRecord {
        VideoRecord {
            video_id: format!("{channel}-{views}"),
            title: String::new(),
            channel_id: channel.to_string(),
            channel_title: channel.to_string(),
            category_id: "20".to_string(),
            category_name: "Gaming".to_string(),
            published_at: String::new(),
            channel_published_at: String::new(),
            duration_seconds: 0,
            duration_category: DurationCategory::Unknown,
            duration_label: String::new(),
            view_count: views,
            like_count: views / 10,
            comment_count: views / 100,
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
    fn sums_and_averages_over_the_filtered_set() {
        let records = vec![
            record("alpha", 100, 50.0),
            record("alpha", 300, 0.0),
            record("beta", 200, 70.0),
        ];
        let rows: Vec<&VideoRecord> = records.iter().collect();
        let stats = aggregate(10, &rows);

        assert_eq!(stats.total_videos, 10);
        assert_eq!(stats.filtered_videos, 3);
        assert_eq!(stats.total_views, 600);
        assert_eq!(stats.avg_views, 200.0);
        // zero-score row stays in the denominator
        assert_eq!(stats.avg_opportunity_score, 40.0);
        assert_eq!(stats.top_score, 70.0);
        assert_eq!(stats.unique_channels, 2);
        assert!(stats.filtering_active);
    }

    #[test]
    fn empty_filtered_set_degrades_to_zeroes() {
        let stats = aggregate(0, &[]);
        assert_eq!(stats.filtered_videos, 0);
        assert_eq!(stats.avg_views, 0.0);
        assert_eq!(stats.avg_opportunity_score, 0.0);
        assert_eq!(stats.top_score, 0.0);
        assert!(!stats.filtering_active);
    }
}
