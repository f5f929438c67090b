use anyhow::{bail, Result};
use log::info;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::constants;
use crate::models::{DurationCategory, VideoRecord};
use crate::utils::{parse_count, parse_score, youtube_watch_url};

/// In-memory record store. A new upload fully replaces the previous dataset
/// and bumps the generation counter; async consumers capture the generation
/// at request start and discard stale completions.
pub struct DatasetStore {
    inner: RwLock<DatasetInner>,
}

struct DatasetInner {
    records: Arc<Vec<VideoRecord>>,
    generation: u64,
}

impl Default for DatasetStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetStore {
    pub fn new() -> Self {
        DatasetStore {
            inner: RwLock::new(DatasetInner {
                records: Arc::new(Vec::new()),
                generation: 0,
            }),
        }
    }

    /// Replaces the whole dataset. Returns the new generation.
    pub fn replace(&self, records: Vec<VideoRecord>) -> u64 {
        let mut inner = self.inner.write().expect("dataset lock poisoned");
        inner.records = Arc::new(records);
        inner.generation += 1;
        info!(
            "Dataset replaced: {} records, generation {}",
            inner.records.len(),
            inner.generation
        );
        inner.generation
    }

    pub fn clear(&self) -> u64 {
        self.replace(Vec::new())
    }

    /// Cheap snapshot: the record vector is shared, never copied.
    pub fn snapshot(&self) -> (Arc<Vec<VideoRecord>>, u64) {
        let inner = self.inner.read().expect("dataset lock poisoned");
        (Arc::clone(&inner.records), inner.generation)
    }

    pub fn generation(&self) -> u64 {
        self.inner.read().expect("dataset lock poisoned").generation
    }
}

/// Splits CSV text into rows of fields. Double quotes group fields and are
/// escaped by doubling; fields are trimmed like the dashboard export expects.
pub fn parse_csv(text: &str) -> Vec<Vec<String>> {
    let mut result = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut row = Vec::new();
        let mut current = String::new();
        let mut in_quotes = false;
        let mut chars = line.chars().peekable();

        while let Some(ch) = chars.next() {
            match ch {
                '"' => {
                    if in_quotes && chars.peek() == Some(&'"') {
                        current.push('"');
                        chars.next();
                    } else {
                        in_quotes = !in_quotes;
                    }
                }
                ',' if !in_quotes => {
                    row.push(current.trim().to_string());
                    current.clear();
                }
                _ => current.push(ch),
            }
        }
        row.push(current.trim().to_string());
        result.push(row);
    }

    result
}

/// Turns raw CSV rows into header-keyed string maps. Fails atomically: either
/// every row maps or the whole upload is rejected.
pub fn rows_to_maps(rows: Vec<Vec<String>>) -> Result<Vec<HashMap<String, String>>> {
    if rows.is_empty() {
        bail!("File is empty");
    }

    let headers: Vec<String> = rows[0]
        .iter()
        .map(|h| h.replace('"', "").trim().to_string())
        .collect();

    let maps = rows[1..]
        .iter()
        .map(|row| {
            headers
                .iter()
                .enumerate()
                .map(|(i, header)| (header.clone(), row.get(i).cloned().unwrap_or_default()))
                .collect()
        })
        .collect();

    Ok(maps)
}

fn field<'a>(row: &'a HashMap<String, String>, key: &str) -> &'a str {
    row.get(key).map(String::as_str).unwrap_or("")
}

/// Coerces one raw string map into a typed record. Pure; coercion failures
/// default to zero instead of rejecting the row.
pub fn normalize_row(row: &HashMap<String, String>) -> VideoRecord {
    let video_id = field(row, "videoId").to_string();
    let category_id = field(row, "categoryId").trim().to_string();
    let duration_category = DurationCategory::parse(field(row, "durationCategory"));

    VideoRecord {
        title: field(row, "title").to_string(),
        channel_id: field(row, "channelId").to_string(),
        channel_title: field(row, "channelTitle").to_string(),
        category_name: constants::category_display_name(&category_id).to_string(),
        category_id,
        published_at: field(row, "publishedAt").to_string(),
        channel_published_at: field(row, "channelPublishedAt").to_string(),
        duration_seconds: parse_count(field(row, "durationSeconds")),
        duration_label: duration_category.label().to_string(),
        duration_category,
        view_count: parse_count(field(row, "viewCount")),
        like_count: parse_count(field(row, "likeCount")),
        comment_count: parse_count(field(row, "commentCount")),
        channel_subscribers: parse_count(field(row, "channelSubscribers")),
        channel_total_views: parse_count(field(row, "channelTotalViews")),
        channel_video_count: parse_count(field(row, "channelVideoCount")),
        opportunity_score: parse_score(field(row, "opportunity_score")),
        explosion: parse_score(field(row, "explosion")),
        engagement: parse_score(field(row, "engagement")),
        tags: field(row, "tags").to_string(),
        video_url: youtube_watch_url(&video_id),
        video_id,
    }
}

/// Full load path: parse, map and normalize, all or nothing.
pub fn load_dataset(text: &str) -> Result<Vec<VideoRecord>> {
    let rows = parse_csv(text);
    let maps = rows_to_maps(rows)?;
    Ok(maps.iter().map(normalize_row).collect())
}

fn escape_csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Writes rows in the export dialect: UTF-8 with BOM, comma-delimited,
/// quoting only where required.
pub fn write_csv(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(
        headers
            .iter()
            .map(|h| escape_csv_field(h))
            .collect::<Vec<_>>()
            .join(","),
    );
    for row in rows {
        lines.push(
            row.iter()
                .map(|cell| escape_csv_field(cell))
                .collect::<Vec<_>>()
                .join(","),
        );
    }
    format!("\u{feff}{}", lines.join("\n"))
}

pub fn export_filename(name: &str) -> String {
    format!("{}_{}.csv", name, chrono::Utc::now().format("%Y-%m-%d"))
}

pub const VIDEO_EXPORT_HEADERS: &[&str] = &[
    "videoId",
    "title",
    "channelId",
    "channelTitle",
    "categoryId",
    "categoryName",
    "publishedAt",
    "channelPublishedAt",
    "durationSeconds",
    "durationCategory",
    "viewCount",
    "likeCount",
    "commentCount",
    "channelSubscribers",
    "channelTotalViews",
    "channelVideoCount",
    "opportunity_score",
    "explosion",
    "engagement",
    "tags",
    "videoUrl",
];

pub fn video_export_row(record: &VideoRecord) -> Vec<String> {
    vec![
        record.video_id.clone(),
        record.title.clone(),
        record.channel_id.clone(),
        record.channel_title.clone(),
        record.category_id.clone(),
        record.category_name.clone(),
        record.published_at.clone(),
        record.channel_published_at.clone(),
        record.duration_seconds.to_string(),
        record.duration_category.as_key().to_string(),
        record.view_count.to_string(),
        record.like_count.to_string(),
        record.comment_count.to_string(),
        record.channel_subscribers.to_string(),
        record.channel_total_views.to_string(),
        record.channel_video_count.to_string(),
        format!("{:.2}", record.opportunity_score),
        format!("{:.2}", record.explosion),
        format!("{:.2}", record.engagement),
        record.tags.clone(),
        record.video_url.clone(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parses_quoted_fields_with_escaped_quotes() {
        let rows = parse_csv("a,\"b, c\",\"say \"\"hi\"\"\"\nx,y,z");
        assert_eq!(rows[0], vec!["a", "b, c", "say \"hi\""]);
        assert_eq!(rows[1], vec!["x", "y", "z"]);
    }

    #[test]
    fn skips_blank_lines() {
        let rows = parse_csv("a,b\n\n\n1,2\n");
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn empty_file_fails_atomically() {
        assert!(rows_to_maps(parse_csv("")).is_err());
        assert!(rows_to_maps(parse_csv("   \n  \n")).is_err());
    }

    #[test]
    fn short_rows_default_missing_fields_to_empty() {
        let maps = rows_to_maps(parse_csv("a,b,c\n1,2")).unwrap();
        assert_eq!(maps[0]["c"], "");
    }

    #[test]
    fn normalizer_coerces_and_defaults() {
        let row = map(&[
            ("videoId", "abc123"),
            ("title", "Test"),
            ("categoryId", " 20 "),
            ("viewCount", "oops"),
            ("likeCount", "55"),
            ("opportunity_score", "72.5"),
            ("explosion", ""),
            ("durationCategory", "medium"),
        ]);
        let record = normalize_row(&row);
        assert_eq!(record.view_count, 0);
        assert_eq!(record.like_count, 55);
        assert_eq!(record.opportunity_score, 72.5);
        assert_eq!(record.explosion, 0.0);
        assert_eq!(record.category_id, "20");
        assert_eq!(record.category_name, "Gaming");
        assert_eq!(record.duration_category, DurationCategory::Medium);
        assert_eq!(
            record.video_url,
            "https://www.youtube.com/watch?v=abc123"
        );
    }

    #[test]
    fn unknown_category_gets_unclassified_label() {
        let record = normalize_row(&map(&[("categoryId", "999")]));
        assert_eq!(record.category_name, "Unclassified");
    }

    #[test]
    fn missing_duration_category_defaults_to_unknown() {
        let record = normalize_row(&map(&[("videoId", "v")]));
        assert_eq!(record.duration_category, DurationCategory::Unknown);
    }

    #[test]
    fn store_replace_bumps_generation_and_swaps_fully() {
        let store = DatasetStore::new();
        let first = load_dataset("videoId,title\nv1,One\nv2,Two").unwrap();
        let gen1 = store.replace(first);
        let second = load_dataset("videoId,title\nv3,Three").unwrap();
        let gen2 = store.replace(second);

        assert!(gen2 > gen1);
        let (records, generation) = store.snapshot();
        assert_eq!(generation, gen2);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].video_id, "v3");
    }

    #[test]
    fn export_writes_bom_and_quotes() {
        let out = write_csv(&["a", "b"], &[vec!["1,5".to_string(), "x".to_string()]]);
        assert!(out.starts_with('\u{feff}'));
        assert!(out.contains("\"1,5\",x"));
    }
}
