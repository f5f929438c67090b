use std::collections::HashMap;

use crate::models::{
    AnalysisRecord, CreatorAggregate, CreatorLevel, CreatorMetrics, CreatorStats, SortOrder,
    VideoRecord,
};
use crate::utils::{compare_with_order_float, compare_with_order_int, compare_with_order_str};

/// Columns the creator table can sort on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatorSortField {
    Name,
    VideoCount,
    Score,
}

impl CreatorSortField {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "name" => CreatorSortField::Name,
            "videoCount" => CreatorSortField::VideoCount,
            _ => CreatorSortField::Score,
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn metrics_from_scores(scores: &[f64]) -> CreatorMetrics {
    let count = scores.len().max(1) as f64;
    let avg = scores.iter().sum::<f64>() / count;
    let variance = scores.iter().map(|s| (s - avg).powi(2)).sum::<f64>() / count;
    let std_dev = variance.sqrt();

    // avg of 0 means every score is 0; call that perfectly consistent
    let consistency = if avg == 0.0 {
        1.0
    } else {
        (1.0 - std_dev / avg).max(0.0)
    };

    CreatorMetrics {
        consistency: round2(consistency),
        std_dev: round2(std_dev),
        score_min: scores.iter().copied().fold(f64::INFINITY, f64::min),
        score_max: scores.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        score_avg: round2(avg),
    }
}

struct CreatorAccumulator {
    id: String,
    name: String,
    scores: Vec<f64>,
    total_score: f64,
    max_score: f64,
    best_video_title: String,
    best_video_url: String,
}

/// Groups the record set by channel id (falling back to channel title),
/// tracking the best video and running totals per creator. Output is ordered
/// by max score descending with rank assigned by position; ties keep
/// first-seen order (the sort is stable).
pub fn group_by_channel(records: &[VideoRecord]) -> Vec<CreatorAggregate> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut accumulators: Vec<CreatorAccumulator> = Vec::new();

    for video in records {
        let name = if !video.channel_title.is_empty() {
            video.channel_title.clone()
        } else if !video.channel_id.is_empty() {
            video.channel_id.clone()
        } else {
            "Unknown creator".to_string()
        };
        let id = if !video.channel_id.is_empty() {
            video.channel_id.clone()
        } else {
            name.clone()
        };
        let score = video.opportunity_score;

        match index.get(&id) {
            Some(&i) => {
                let acc = &mut accumulators[i];
                acc.scores.push(score);
                acc.total_score += score;
                if score > acc.max_score {
                    acc.max_score = score;
                    acc.best_video_title = video.title.clone();
                    acc.best_video_url = video.video_url.clone();
                }
            }
            None => {
                index.insert(id.clone(), accumulators.len());
                accumulators.push(CreatorAccumulator {
                    id,
                    name,
                    scores: vec![score],
                    total_score: score,
                    max_score: score,
                    best_video_title: video.title.clone(),
                    best_video_url: video.video_url.clone(),
                });
            }
        }
    }

    let mut creators: Vec<CreatorAggregate> = accumulators
        .into_iter()
        .map(|acc| {
            let video_count = acc.scores.len();
            CreatorAggregate {
                metrics: metrics_from_scores(&acc.scores),
                id: acc.id,
                name: acc.name,
                video_count,
                max_score: acc.max_score,
                avg_score: acc.total_score / video_count as f64,
                best_video_title: acc.best_video_title,
                best_video_url: acc.best_video_url,
                rank: 0,
            }
        })
        .collect();

    creators.sort_by(|a, b| {
        b.max_score
            .partial_cmp(&a.max_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    for (i, creator) in creators.iter_mut().enumerate() {
        creator.rank = i + 1;
    }

    creators
}

/// Band assignment against the most recent threshold analysis; without one
/// every creator is unclassified.
pub fn creator_level(score: f64, thresholds: Option<&AnalysisRecord>) -> CreatorLevel {
    match thresholds {
        None => CreatorLevel::Unknown,
        Some(t) => {
            if score >= t.valuable_threshold {
                CreatorLevel::Valuable
            } else if score >= t.normal_min {
                CreatorLevel::Normal
            } else {
                CreatorLevel::Low
            }
        }
    }
}

pub fn level_label(level: CreatorLevel) -> &'static str {
    match level {
        CreatorLevel::Valuable => "valuable",
        CreatorLevel::Normal => "normal",
        CreatorLevel::Low => "low",
        CreatorLevel::Unknown => "unknown",
    }
}

pub fn sort_creators(creators: &mut [CreatorAggregate], field: CreatorSortField, order: SortOrder) {
    creators.sort_by(|a, b| match field {
        CreatorSortField::Name => compare_with_order_str(&a.name, &b.name, &order),
        CreatorSortField::VideoCount => {
            compare_with_order_int(a.video_count as i64, b.video_count as i64, &order)
        }
        CreatorSortField::Score => compare_with_order_float(a.max_score, b.max_score, &order),
    });
}

/// Level and name-substring filtering for the creator table.
pub fn filter_creators(
    creators: Vec<CreatorAggregate>,
    level: &str,
    search: &str,
    thresholds: Option<&AnalysisRecord>,
) -> Vec<CreatorAggregate> {
    let search = search.trim().to_lowercase();

    creators
        .into_iter()
        .filter(|creator| {
            level == "all" || level_label(creator_level(creator.max_score, thresholds)) == level
        })
        .filter(|creator| search.is_empty() || creator.name.to_lowercase().contains(&search))
        .collect()
}

pub fn creator_stats(
    creators: &[CreatorAggregate],
    filtered: usize,
    thresholds: Option<&AnalysisRecord>,
) -> CreatorStats {
    let total = creators.len();
    let avg_max_score = if total > 0 {
        creators.iter().map(|c| c.max_score).sum::<f64>() / total as f64
    } else {
        0.0
    };

    let mut valuable = 0;
    let mut normal = 0;
    let mut low = 0;
    if thresholds.is_some() {
        for creator in creators {
            match creator_level(creator.max_score, thresholds) {
                CreatorLevel::Valuable => valuable += 1,
                CreatorLevel::Normal => normal += 1,
                CreatorLevel::Low => low += 1,
                CreatorLevel::Unknown => {}
            }
        }
    }

    CreatorStats {
        total,
        filtered,
        avg_max_score: round2(avg_max_score),
        valuable,
        normal,
        low,
    }
}

pub const CREATOR_EXPORT_HEADERS: &[&str] = &[
    "rank",
    "creator",
    "channelId",
    "videoCount",
    "maxScore",
    "avgScore",
    "consistency",
    "bestVideoTitle",
    "bestVideoUrl",
    "level",
];

pub fn creator_export_row(
    creator: &CreatorAggregate,
    thresholds: Option<&AnalysisRecord>,
) -> Vec<String> {
    vec![
        creator.rank.to_string(),
        creator.name.clone(),
        creator.id.clone(),
        creator.video_count.to_string(),
        format!("{:.1}", creator.max_score),
        format!("{:.1}", creator.avg_score),
        format!("{:.2}", creator.metrics.consistency),
        creator.best_video_title.clone(),
        creator.best_video_url.clone(),
        level_label(creator_level(creator.max_score, thresholds)).to_string(),
    ]
}
