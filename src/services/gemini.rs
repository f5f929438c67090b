use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use lazy_static::lazy_static;
use log::{info, warn};
use regex::Regex;
use serde_json::{json, Value};

use crate::config;
use crate::models::{
    AnalysisRecord, BandReport, CreatorAggregate, GeminiRangeBand, GeminiThresholdBand,
    GeminiThresholds, ThresholdAnalysis,
};

/// Prompt sizes past this are sent as a statistical summary plus samples
/// instead of the full creator table.
const MAX_PROMPT_TOKENS: usize = 25_000;
const SUMMARY_SAMPLE_COUNT: usize = 20;

lazy_static! {
    static ref CODE_FENCE: Regex = Regex::new(r"```(?:json)?").expect("fence regex");
}

/// Thin client for the Gemini generateContent endpoint.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String, base_url: String) -> Self {
        GeminiClient {
            http: reqwest::Client::new(),
            api_key,
            base_url,
        }
    }

    pub fn from_config() -> Self {
        GeminiClient::new(
            config::GEMINI_API_KEY.clone(),
            config::GEMINI_BASE_URL.clone(),
        )
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    pub async fn generate(&self, prompt: &str) -> Result<String> {
        if !self.is_configured() {
            bail!("Gemini API key is not configured");
        }

        let url = format!("{}?key={}", self.base_url, self.api_key);
        let response = self
            .http
            .post(&url)
            .json(&build_request_body(prompt))
            .send()
            .await
            .context("Gemini request failed")?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .context("Gemini response was not JSON")?;
        if !status.is_success() {
            bail!("Gemini returned {status}: {body}");
        }

        extract_text(&body)
    }
}

fn build_request_body(prompt: &str) -> Value {
    json!({
        "contents": [{ "parts": [{ "text": prompt }] }],
        "generationConfig": {
            "temperature": 0.3,
            "maxOutputTokens": 2048
        }
    })
}

fn extract_text(body: &Value) -> Result<String> {
    body["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Gemini response had no text candidate"))
}

/// Rough token count for prompt budgeting, four characters per token.
pub fn estimate_tokens(text: &str) -> usize {
    text.len() / 4
}

/// Strips markdown code fences and any prose around the JSON object.
pub fn clean_response(raw: &str) -> Result<&str> {
    let stripped = raw.trim();
    let start = stripped
        .find('{')
        .ok_or_else(|| anyhow!("No JSON object in model response"))?;
    let end = stripped
        .rfind('}')
        .ok_or_else(|| anyhow!("No JSON object in model response"))?;
    if end < start {
        bail!("No JSON object in model response");
    }
    Ok(&stripped[start..=end])
}

/// Parses and validates the model's threshold answer. Anything that does not
/// fit the expected shape, or orders the bands inconsistently, is rejected
/// rather than patched up.
pub fn parse_thresholds(raw: &str) -> Result<GeminiThresholds> {
    let cleaned = CODE_FENCE.replace_all(raw, "");
    let json_text = clean_response(&cleaned)?;
    let parsed: GeminiThresholds =
        serde_json::from_str(json_text).context("Model response did not match expected schema")?;

    if parsed.normal.min > parsed.normal.max {
        bail!("Model returned an inverted normal band");
    }
    if parsed.valuable.threshold <= parsed.normal.max {
        bail!("Model returned overlapping valuable and normal bands");
    }
    if parsed.low.threshold > parsed.normal.min {
        bail!("Model returned overlapping low and normal bands");
    }

    Ok(parsed)
}

/// Compact per-creator lines for the full-dataset prompt.
pub fn compress_creator_data(creators: &[CreatorAggregate]) -> String {
    creators
        .iter()
        .map(|c| {
            format!(
                "{}|max:{:.1}|avg:{:.1}|videos:{}|consistency:{:.2}",
                c.name, c.max_score, c.avg_score, c.video_count, c.metrics.consistency
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Statistical digest plus top and bottom samples, used when the full table
/// would blow the prompt budget.
pub fn generate_data_summary(creators: &[CreatorAggregate]) -> String {
    if creators.is_empty() {
        return "No creators in dataset.".to_string();
    }

    let scores: Vec<f64> = creators.iter().map(|c| c.max_score).collect();
    let count = scores.len();
    let avg = scores.iter().sum::<f64>() / count as f64;
    let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let mut sorted: Vec<f64> = scores.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median = sorted[count / 2];

    // creators arrive ranked by max score, so head and tail are the extremes
    let top = compress_creator_data(&creators[..SUMMARY_SAMPLE_COUNT.min(count)]);
    let bottom_start = count.saturating_sub(SUMMARY_SAMPLE_COUNT);
    let bottom = compress_creator_data(&creators[bottom_start..]);

    format!(
        "Creators: {count}\nScore range: {min:.1}-{max:.1}, average {avg:.1}, median {median:.1}\n\nTop creators:\n{top}\n\nBottom creators:\n{bottom}"
    )
}

fn threshold_prompt(data_section: &str, learning_context: &str) -> String {
    let mut prompt = String::from(
        "You are analyzing YouTube creator opportunity scores. Based on the data below, \
         propose score thresholds that split creators into three bands: valuable, normal \
         and low.\n\n",
    );
    if !learning_context.is_empty() {
        prompt.push_str("Context from previous analyses:\n");
        prompt.push_str(learning_context);
        prompt.push_str("\n\n");
    }
    prompt.push_str("Data:\n");
    prompt.push_str(data_section);
    prompt.push_str(
        "\n\nRespond with ONLY a JSON object, no markdown, in exactly this shape:\n\
         {\n\
         \"valuable\": {\"threshold\": number, \"reason\": string, \"confidence\": number, \"businessValue\": string},\n\
         \"normal\": {\"min\": number, \"max\": number, \"reason\": string, \"confidence\": number, \"businessValue\": string},\n\
         \"low\": {\"threshold\": number, \"reason\": string, \"confidence\": number, \"businessValue\": string},\n\
         \"analysisText\": string,\n\
         \"keyInsights\": [string],\n\
         \"recommendations\": [string]\n\
         }\n\
         The valuable threshold must be above the normal band and the low threshold at or \
         below the normal minimum.",
    );
    prompt
}

fn band_percentage(matching: usize, total: usize) -> u32 {
    if total == 0 {
        0
    } else {
        ((matching as f64 / total as f64) * 100.0).round() as u32
    }
}

fn band_reports(thresholds: &GeminiThresholds, scores: &[f64]) -> (BandReport, BandReport, BandReport) {
    let total = scores.len();
    let valuable_count = scores
        .iter()
        .filter(|s| **s >= thresholds.valuable.threshold)
        .count();
    let normal_count = scores
        .iter()
        .filter(|s| **s >= thresholds.normal.min && **s <= thresholds.normal.max)
        .count();
    let low_count = scores
        .iter()
        .filter(|s| **s < thresholds.low.threshold)
        .count();

    let from_threshold = |band: &GeminiThresholdBand, count: usize| BandReport {
        threshold: Some(band.threshold),
        min: None,
        max: None,
        reason: band.reason.clone(),
        confidence: band.confidence,
        business_value: band.business_value.clone(),
        percentage: band_percentage(count, total),
    };
    let from_range = |band: &GeminiRangeBand, count: usize| BandReport {
        threshold: None,
        min: Some(band.min),
        max: Some(band.max),
        reason: band.reason.clone(),
        confidence: band.confidence,
        business_value: band.business_value.clone(),
        percentage: band_percentage(count, total),
    };

    (
        from_threshold(&thresholds.valuable, valuable_count),
        from_range(&thresholds.normal, normal_count),
        from_threshold(&thresholds.low, low_count),
    )
}

/// Full threshold analysis: prompt the model with the creator table (or its
/// summary), validate the answer and report band shares against the actual
/// score distribution. `generation` tags the result with the dataset it was
/// computed from so stale completions can be discarded.
pub async fn analyze_thresholds(
    client: &GeminiClient,
    creators: &[CreatorAggregate],
    learning_context: &str,
    generation: u64,
) -> Result<ThresholdAnalysis> {
    if creators.is_empty() {
        bail!("No data to analyze");
    }

    let full = compress_creator_data(creators);
    let (data_section, data_type) = if estimate_tokens(&full) > MAX_PROMPT_TOKENS {
        info!(
            "Creator table too large for prompt ({} creators), using summary",
            creators.len()
        );
        (generate_data_summary(creators), "summary_and_samples")
    } else {
        (full, "full_dataset")
    };

    let prompt = threshold_prompt(&data_section, learning_context);
    let raw = client.generate(&prompt).await?;
    let thresholds = parse_thresholds(&raw).map_err(|e| {
        warn!("Discarding malformed Gemini analysis: {e:#}");
        e
    })?;

    let scores: Vec<f64> = creators.iter().map(|c| c.max_score).collect();
    let (valuable, normal, low) = band_reports(&thresholds, &scores);

    Ok(ThresholdAnalysis {
        valuable,
        normal,
        low,
        analysis_text: thresholds.analysis_text,
        key_insights: thresholds.key_insights,
        recommendations: thresholds.recommendations,
        data_type: data_type.to_string(),
        total_analyzed: creators.len(),
        generation,
    })
}

pub fn analysis_record(analysis: &ThresholdAnalysis) -> AnalysisRecord {
    AnalysisRecord {
        timestamp: Utc::now().timestamp_millis(),
        data_size: analysis.total_analyzed,
        data_type: analysis.data_type.clone(),
        valuable_threshold: analysis.valuable.threshold.unwrap_or(0.0),
        normal_min: analysis.normal.min.unwrap_or(0.0),
        normal_max: analysis.normal.max.unwrap_or(0.0),
        low_threshold: analysis.low.threshold.unwrap_or(0.0),
    }
}

/// Free-form question about the current dataset, answered in plain text.
pub async fn chat(
    client: &GeminiClient,
    message: &str,
    creators: &[CreatorAggregate],
    learning_context: &str,
) -> Result<String> {
    let summary = generate_data_summary(creators);
    let mut prompt = String::from(
        "You are a YouTube analytics assistant. Answer the user's question about \
         their creator dataset concisely, in plain text.\n\n",
    );
    if !learning_context.is_empty() {
        prompt.push_str("Context:\n");
        prompt.push_str(learning_context);
        prompt.push_str("\n\n");
    }
    prompt.push_str("Dataset:\n");
    prompt.push_str(&summary);
    prompt.push_str("\n\nQuestion: ");
    prompt.push_str(message);

    client.generate(&prompt).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CreatorMetrics;

    fn creator(name: &str, max_score: f64) -> CreatorAggregate {
        CreatorAggregate {
            id: name.to_string(),
            name: name.to_string(),
            video_count: 3,
            max_score,
            avg_score: max_score - 5.0,
            best_video_title: "best".to_string(),
            best_video_url: String::new(),
            metrics: CreatorMetrics {
                consistency: 0.9,
                std_dev: 2.0,
                score_min: max_score - 10.0,
                score_max: max_score,
                score_avg: max_score - 5.0,
            },
            rank: 0,
        }
    }

    fn valid_payload() -> &'static str {
        r#"{
            "valuable": {"threshold": 70, "reason": "top decile", "confidence": 0.8, "businessValue": "partner"},
            "normal": {"min": 40, "max": 69, "reason": "bulk", "confidence": 0.7, "businessValue": "watch"},
            "low": {"threshold": 40, "reason": "tail", "confidence": 0.9, "businessValue": "skip"},
            "analysisText": "Scores cluster around 50.",
            "keyInsights": ["one"],
            "recommendations": ["two"]
        }"#
    }

    #[test]
    fn parses_fenced_response_with_preamble() {
        let raw = format!("Here you go:\n```json\n{}\n```", valid_payload());
        let parsed = parse_thresholds(&raw).unwrap();
        assert_eq!(parsed.valuable.threshold, 70.0);
        assert_eq!(parsed.normal.min, 40.0);
        assert_eq!(parsed.analysis_text, "Scores cluster around 50.");
    }

    #[test]
    fn rejects_missing_fields() {
        let raw = r#"{"valuable": {"threshold": 70}, "low": {"threshold": 40}}"#;
        assert!(parse_thresholds(raw).is_err());
    }

    #[test]
    fn rejects_non_numeric_threshold() {
        let raw = valid_payload().replace("\"threshold\": 70", "\"threshold\": \"high\"");
        assert!(parse_thresholds(&raw).is_err());
    }

    #[test]
    fn rejects_overlapping_bands() {
        let raw = valid_payload().replace("\"threshold\": 70", "\"threshold\": 50");
        assert!(parse_thresholds(&raw).is_err());
    }

    #[test]
    fn rejects_responses_without_json() {
        assert!(parse_thresholds("I cannot analyze this data.").is_err());
    }

    #[test]
    fn band_percentages_reflect_the_score_distribution() {
        let thresholds = parse_thresholds(valid_payload()).unwrap();
        let scores = vec![90.0, 75.0, 50.0, 45.0, 10.0];
        let (valuable, normal, low) = band_reports(&thresholds, &scores);
        assert_eq!(valuable.percentage, 40);
        assert_eq!(normal.percentage, 40);
        assert_eq!(low.percentage, 20);
        assert_eq!(valuable.threshold, Some(70.0));
        assert_eq!(normal.min, Some(40.0));
    }

    #[test]
    fn token_estimate_is_quarter_of_length() {
        assert_eq!(estimate_tokens("abcdefgh"), 2);
    }

    #[test]
    fn compressed_data_has_one_line_per_creator() {
        let creators = vec![creator("Alpha", 90.0), creator("Beta", 40.0)];
        let text = compress_creator_data(&creators);
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("Alpha|max:90.0"));
    }

    #[test]
    fn summary_includes_range_and_samples() {
        let creators: Vec<CreatorAggregate> =
            (0..30).map(|i| creator(&format!("c{i}"), 90.0 - i as f64)).collect();
        let summary = generate_data_summary(&creators);
        assert!(summary.contains("Creators: 30"));
        assert!(summary.contains("61.0-90.0"));
        assert!(summary.contains("Top creators"));
        assert!(summary.contains("c29"));
    }

    #[test]
    fn request_body_carries_prompt_and_config() {
        let body = build_request_body("hello");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 2048);
    }

    #[test]
    fn extracts_candidate_text() {
        let body = serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": "answer"}]}}]
        });
        assert_eq!(extract_text(&body).unwrap(), "answer");
        assert!(extract_text(&serde_json::json!({})).is_err());
    }
}
