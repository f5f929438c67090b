use log::info;
use rocket::serde::json::Json;
use rocket::{delete, get, post, State};

use crate::models::{ApiMessage, DatasetSummary, UploadResponse};
use crate::services::dataset;
use crate::AppState;

#[post("/", data = "<csv>")]
pub async fn upload_dataset(state: &State<AppState>, csv: String) -> Json<UploadResponse> {
    match dataset::load_dataset(&csv) {
        Ok(records) => {
            let total_rows = records.len();
            let generation = state.dataset.replace(records);
            info!("Dataset uploaded: {total_rows} rows");
            Json(UploadResponse {
                success: true,
                message: format!("Loaded {total_rows} videos"),
                total_rows,
                generation,
            })
        }
        Err(e) => {
            log::error!("Dataset upload rejected: {e:#}");
            Json(UploadResponse {
                success: false,
                message: e.to_string(),
                total_rows: 0,
                generation: state.dataset.generation(),
            })
        }
    }
}

#[get("/")]
pub async fn dataset_summary(state: &State<AppState>) -> Json<DatasetSummary> {
    let (records, generation) = state.dataset.snapshot();
    Json(DatasetSummary {
        loaded: !records.is_empty(),
        total_rows: records.len(),
        generation,
    })
}

#[delete("/")]
pub async fn clear_dataset(state: &State<AppState>) -> Json<ApiMessage> {
    state.dataset.clear();
    info!("Dataset cleared");
    Json(ApiMessage::ok("Dataset cleared"))
}
