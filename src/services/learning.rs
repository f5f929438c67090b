use anyhow::{bail, Context, Result};
use chrono::Utc;
use log::{info, warn};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::config;
use crate::models::{
    AnalysisRecord, FeedbackRecord, LearningData, PatternRecord, TopCreatorPattern, VideoRecord,
};
use crate::services::creators;

const LEARNING_KEY: &str = "yt_insight_learning";
const MAX_PATTERNS: usize = 10;
const MAX_FEEDBACK: usize = 50;
const MAX_ANALYSES: usize = 20;
const HIGH_PERFORMER_SCORE: f64 = 80.0;
const LOW_PERFORMER_SCORE: f64 = 30.0;

/// JSON-valued key/value persistence behind the learning state. Injected so
/// tests can swap the file-backed store for an in-memory one.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>>;
    fn set(&self, key: &str, value: Value) -> Result<()>;
}

/// Single-file JSON store. The whole file is read on open and rewritten on
/// every set; the learning payload is small enough that this is fine.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileStore { path: path.into() }
    }

    pub fn from_config() -> Self {
        JsonFileStore::new(config::LEARNING_STORE_PATH.as_str())
    }

    fn read_all(&self) -> Result<HashMap<String, Value>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        if text.trim().is_empty() {
            return Ok(HashMap::new());
        }
        serde_json::from_str(&text)
            .with_context(|| format!("Invalid JSON in {}", self.path.display()))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut all = self.read_all().unwrap_or_else(|e| {
            warn!("Learning store unreadable, starting fresh: {e:#}");
            HashMap::new()
        });
        all.insert(key.to_string(), value);
        let text = serde_json::to_string_pretty(&all)?;
        fs::write(&self.path, text)
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }
}

/// Accumulated analysis memory: dataset patterns, user feedback, past
/// threshold analyses and the daily request counter. Mutations persist
/// through the backing store immediately.
pub struct LearningStore {
    backend: Box<dyn KeyValueStore>,
    data: Mutex<LearningData>,
}

fn today() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

impl LearningStore {
    pub fn open(backend: Box<dyn KeyValueStore>) -> Result<Self> {
        let data = match backend.get(LEARNING_KEY)? {
            Some(value) => serde_json::from_value(value).unwrap_or_else(|e| {
                warn!("Discarding unreadable learning data: {e:#}");
                LearningData::default()
            }),
            None => LearningData::default(),
        };
        Ok(LearningStore {
            backend,
            data: Mutex::new(data),
        })
    }

    fn persist(&self, data: &LearningData) -> Result<()> {
        self.backend.set(LEARNING_KEY, serde_json::to_value(data)?)
    }

    /// Counts a Gemini request against today's quota, resetting the counter
    /// when the date has rolled over. Fails when the limit is exhausted.
    pub fn consume_request(&self) -> Result<()> {
        let mut data = self.data.lock().expect("learning lock poisoned");
        let date = today();
        if data.request_date != date {
            data.request_date = date;
            data.requests_today = 0;
        }
        if data.requests_today >= *config::GEMINI_DAILY_LIMIT {
            bail!("Daily request limit reached");
        }
        data.requests_today += 1;
        self.persist(&data)
    }

    pub fn requests_used(&self) -> u32 {
        let data = self.data.lock().expect("learning lock poisoned");
        if data.request_date == today() {
            data.requests_today
        } else {
            0
        }
    }

    /// Extracts dataset patterns worth remembering: title keywords and top
    /// creators among high performers, plus the performance split.
    pub fn record_patterns(&self, records: &[VideoRecord]) -> Result<()> {
        let high: Vec<&VideoRecord> = records
            .iter()
            .filter(|v| v.opportunity_score > HIGH_PERFORMER_SCORE)
            .collect();
        let low: Vec<&VideoRecord> = records
            .iter()
            .filter(|v| v.opportunity_score < LOW_PERFORMER_SCORE)
            .collect();

        let avg = |rows: &[&VideoRecord]| {
            if rows.is_empty() {
                0.0
            } else {
                rows.iter().map(|v| v.opportunity_score).sum::<f64>() / rows.len() as f64
            }
        };

        let mut keyword_counts: HashMap<String, u32> = HashMap::new();
        for video in &high {
            for word in video.title.to_lowercase().split_whitespace() {
                let word: String = word.chars().filter(|c| c.is_alphanumeric()).collect();
                if word.chars().count() > 3 {
                    *keyword_counts.entry(word).or_insert(0) += 1;
                }
            }
        }
        let mut keywords: Vec<(String, u32)> = keyword_counts.into_iter().collect();
        keywords.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        keywords.truncate(10);

        let top_creators: Vec<TopCreatorPattern> = creators::group_by_channel(records)
            .into_iter()
            .take(5)
            .map(|c| TopCreatorPattern {
                name: c.name,
                score: c.max_score,
                video_count: c.video_count,
            })
            .collect();

        let record = PatternRecord {
            timestamp: Utc::now().timestamp_millis(),
            high_performer_count: high.len(),
            top_title_keywords: keywords,
            avg_high_performer_score: avg(&high),
            avg_low_performer_score: avg(&low),
            top_creators,
        };

        let mut data = self.data.lock().expect("learning lock poisoned");
        data.patterns.push(record);
        let overflow = data.patterns.len().saturating_sub(MAX_PATTERNS);
        data.patterns.drain(..overflow);
        self.persist(&data)
    }

    pub fn add_feedback(&self, rating: u8, comment: String, data_size: usize) -> Result<()> {
        let mut data = self.data.lock().expect("learning lock poisoned");
        let valuable_threshold = data
            .analysis_history
            .last()
            .map(|a| a.valuable_threshold);
        data.feedback.push(FeedbackRecord {
            timestamp: Utc::now().timestamp_millis(),
            rating,
            comment,
            valuable_threshold,
            data_size,
        });
        let overflow = data.feedback.len().saturating_sub(MAX_FEEDBACK);
        data.feedback.drain(..overflow);
        self.persist(&data)
    }

    pub fn record_analysis(&self, record: AnalysisRecord) -> Result<()> {
        let mut data = self.data.lock().expect("learning lock poisoned");
        data.analysis_history.push(record);
        let overflow = data.analysis_history.len().saturating_sub(MAX_ANALYSES);
        data.analysis_history.drain(..overflow);
        self.persist(&data)
    }

    pub fn latest_analysis(&self) -> Option<AnalysisRecord> {
        self.data
            .lock()
            .expect("learning lock poisoned")
            .analysis_history
            .last()
            .cloned()
    }

    /// Prompt preamble built from accumulated memory. Empty when nothing has
    /// been learned yet.
    pub fn learning_context(&self) -> String {
        let data = self.data.lock().expect("learning lock poisoned");
        let mut parts = Vec::new();

        if let Some(latest) = data.analysis_history.last() {
            parts.push(format!(
                "Previous analysis thresholds: valuable >= {:.1}, normal {:.1}-{:.1}, low < {:.1}.",
                latest.valuable_threshold, latest.normal_min, latest.normal_max,
                latest.low_threshold
            ));
        }

        if !data.feedback.is_empty() {
            let avg: f64 = data.feedback.iter().map(|f| f.rating as f64).sum::<f64>()
                / data.feedback.len() as f64;
            parts.push(format!(
                "User feedback on past analyses: {} ratings averaging {:.1}/5.",
                data.feedback.len(),
                avg
            ));
        }

        if let Some(pattern) = data.patterns.last() {
            if !pattern.top_title_keywords.is_empty() {
                let words: Vec<&str> = pattern
                    .top_title_keywords
                    .iter()
                    .take(5)
                    .map(|(w, _)| w.as_str())
                    .collect();
                parts.push(format!(
                    "Recurring high-performer title keywords: {}.",
                    words.join(", ")
                ));
            }
        }

        parts.join("\n")
    }

    pub fn feedback_summary(&self) -> (usize, Option<f64>) {
        let data = self.data.lock().expect("learning lock poisoned");
        if data.feedback.is_empty() {
            (0, None)
        } else {
            let avg = data.feedback.iter().map(|f| f.rating as f64).sum::<f64>()
                / data.feedback.len() as f64;
            (data.feedback.len(), Some((avg * 10.0).round() / 10.0))
        }
    }

    pub fn analysis_count(&self) -> usize {
        self.data
            .lock()
            .expect("learning lock poisoned")
            .analysis_history
            .len()
    }

    pub fn reset(&self) -> Result<()> {
        let mut data = self.data.lock().expect("learning lock poisoned");
        *data = LearningData::default();
        info!("Learning data reset");
        self.persist(&data)
    }
}
