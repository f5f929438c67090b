use log::{info, warn};
use rocket::serde::json::Json;
use rocket::{get, post, State};

use crate::config;
use crate::models::{ApiMessage, ChatRequest, ChatResponse, FeedbackRequest, ServiceStatus, ThresholdAnalysis};
use crate::services::{creators, gemini};
use crate::AppState;

/// Runs the LLM threshold analysis over the current creator table. The
/// dataset generation is captured up front; if an upload lands while the
/// model is thinking, the stale result is discarded.
#[post("/thresholds")]
pub async fn analyze_thresholds(
    state: &State<AppState>,
) -> Result<Json<ThresholdAnalysis>, Json<ApiMessage>> {
    let (records, generation) = state.dataset.snapshot();
    if records.is_empty() {
        return Err(Json(ApiMessage::error("No data to analyze")));
    }

    if let Err(e) = state.learning.consume_request() {
        return Err(Json(ApiMessage::error(e.to_string())));
    }

    let table = creators::group_by_channel(&records);
    let context = state.learning.learning_context();

    let analysis =
        match gemini::analyze_thresholds(&state.gemini, &table, &context, generation).await {
            Ok(analysis) => analysis,
            Err(e) => {
                log::error!("Threshold analysis failed: {e:#}");
                return Err(Json(ApiMessage::error(e.to_string())));
            }
        };

    if state.dataset.generation() != generation {
        warn!("Dataset replaced during analysis, discarding result");
        return Err(Json(ApiMessage::error(
            "Dataset changed during analysis, please retry",
        )));
    }

    if let Err(e) = state
        .learning
        .record_analysis(gemini::analysis_record(&analysis))
    {
        log::error!("Failed to persist analysis record: {e:#}");
    }
    if let Err(e) = state.learning.record_patterns(&records) {
        log::error!("Failed to persist dataset patterns: {e:#}");
    }

    info!(
        "Threshold analysis complete: {} creators, {}",
        analysis.total_analyzed, analysis.data_type
    );
    Ok(Json(analysis))
}

#[post("/chat", data = "<request>")]
pub async fn chat(state: &State<AppState>, request: Json<ChatRequest>) -> Json<ChatResponse> {
    if request.message.trim().is_empty() {
        return Json(ChatResponse {
            success: false,
            reply: "Message is empty".to_string(),
        });
    }

    if let Err(e) = state.learning.consume_request() {
        return Json(ChatResponse {
            success: false,
            reply: e.to_string(),
        });
    }

    let (records, _) = state.dataset.snapshot();
    let table = creators::group_by_channel(&records);
    let context = state.learning.learning_context();

    match gemini::chat(&state.gemini, &request.message, &table, &context).await {
        Ok(reply) => Json(ChatResponse {
            success: true,
            reply,
        }),
        Err(e) => {
            log::error!("Chat request failed: {e:#}");
            Json(ChatResponse {
                success: false,
                reply: e.to_string(),
            })
        }
    }
}

#[get("/status")]
pub async fn service_status(state: &State<AppState>) -> Json<ServiceStatus> {
    let used = state.learning.requests_used();
    let limit = *config::GEMINI_DAILY_LIMIT;
    let (total_feedback, avg_feedback) = state.learning.feedback_summary();

    Json(ServiceStatus {
        api_key_configured: state.gemini.is_configured(),
        daily_requests_used: used,
        remaining_requests: limit.saturating_sub(used),
        request_limit_reached: used >= limit,
        total_analyses: state.learning.analysis_count(),
        total_feedback,
        avg_feedback,
    })
}

#[post("/feedback", data = "<request>")]
pub async fn submit_feedback(
    state: &State<AppState>,
    request: Json<FeedbackRequest>,
) -> Json<ApiMessage> {
    if !(1..=5).contains(&request.rating) {
        return Json(ApiMessage::error("Rating must be between 1 and 5"));
    }

    let (records, _) = state.dataset.snapshot();
    match state
        .learning
        .add_feedback(request.rating, request.comment.clone(), records.len())
    {
        Ok(()) => Json(ApiMessage::ok("Feedback recorded")),
        Err(e) => {
            log::error!("Failed to record feedback: {e:#}");
            Json(ApiMessage::error("Failed to record feedback"))
        }
    }
}

#[post("/learning/reset")]
pub async fn reset_learning(state: &State<AppState>) -> Json<ApiMessage> {
    match state.learning.reset() {
        Ok(()) => Json(ApiMessage::ok("Learning data reset")),
        Err(e) => {
            log::error!("Failed to reset learning data: {e:#}");
            Json(ApiMessage::error("Failed to reset learning data"))
        }
    }
}
