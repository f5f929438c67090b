#[macro_use]
extern crate rocket;

mod api;
mod config;
mod constants;
mod models;
mod services;
mod utils;

use anyhow::Result;
use rocket::{Build, Rocket};

use crate::services::dataset::DatasetStore;
use crate::services::gemini::GeminiClient;
use crate::services::learning::{JsonFileStore, LearningStore};

pub struct AppState {
    pub dataset: DatasetStore,
    pub gemini: GeminiClient,
    pub learning: LearningStore,
}

fn create_app_state() -> Result<AppState> {
    let learning = LearningStore::open(Box::new(JsonFileStore::from_config()))?;

    Ok(AppState {
        dataset: DatasetStore::new(),
        gemini: GeminiClient::from_config(),
        learning,
    })
}

fn build_rocket(state: AppState) -> Rocket<Build> {
    let cors = config::create_cors().expect("CORS setup failed.");

    rocket::build()
        .manage(state)
        .attach(cors)
        .mount(
            "/dataset",
            routes![
                api::dataset::upload_dataset,
                api::dataset::dataset_summary,
                api::dataset::clear_dataset
            ],
        )
        .mount(
            "/videos",
            routes![
                api::videos::list_videos,
                api::videos::export_videos,
                api::videos::video_facets
            ],
        )
        .mount(
            "/charts",
            routes![api::charts::chart_data, api::charts::metric_chart],
        )
        .mount(
            "/creators",
            routes![api::creators::list_creators, api::creators::export_creators],
        )
        .mount(
            "/analysis",
            routes![
                api::analysis::analyze_thresholds,
                api::analysis::chat,
                api::analysis::service_status,
                api::analysis::submit_feedback,
                api::analysis::reset_learning
            ],
        )
}

#[launch]
fn rocket() -> _ {
    config::load_environment();
    config::init_logger();

    let state = create_app_state().expect("Application state setup failed.");
    build_rocket(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocket::http::Status;
    use rocket::local::blocking::Client;
    use serde_json::Value;

    fn test_client() -> (Client, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("learning.json"));
        let state = AppState {
            dataset: DatasetStore::new(),
            gemini: GeminiClient::new(String::new(), String::new()),
            learning: LearningStore::open(Box::new(store)).unwrap(),
        };
        (
            Client::tracked(build_rocket(state)).expect("valid rocket instance"),
            dir,
        )
    }

    fn sample_csv() -> String {
        let mut csv = String::from(
            "videoId,title,channelId,channelTitle,categoryId,viewCount,likeCount,commentCount,opportunity_score,durationSeconds,durationCategory\n",
        );
        for i in 0..45 {
            csv.push_str(&format!(
                "v{i},Video {i},ch{},Channel {},20,{},{},{},{},300,normal\n",
                i % 5,
                i % 5,
                i * 100,
                i * 10,
                i,
                i as f64 * 2.0
            ));
        }
        csv
    }

    #[test]
    fn upload_then_query_pages_and_statistics() {
        let (client, _dir) = test_client();

        let response = client.post("/dataset").body(sample_csv()).dispatch();
        assert_eq!(response.status(), Status::Ok);
        let body: Value = response.into_json().unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["totalRows"], 45);

        let response = client
            .get("/videos?sortField=viewCount&sortOrder=desc&page=3")
            .dispatch();
        let body: Value = response.into_json().unwrap();
        assert_eq!(body["pagination"]["totalPages"], 3);
        assert_eq!(body["videos"].as_array().unwrap().len(), 5);
        assert_eq!(body["statistics"]["filteredVideos"], 45);
        assert_eq!(body["statistics"]["uniqueChannels"], 5);
    }

    #[test]
    fn secondary_filter_narrows_the_response() {
        let (client, _dir) = test_client();
        client.post("/dataset").body(sample_csv()).dispatch();

        let response = client
            .get("/videos?opportunityScoreMin=80&page=1")
            .dispatch();
        let body: Value = response.into_json().unwrap();
        // scores are 2*i, so 80..=88 qualify
        assert_eq!(body["statistics"]["filteredVideos"], 5);
        assert_eq!(body["statistics"]["filteringActive"], true);
    }

    #[test]
    fn empty_upload_is_rejected_whole() {
        let (client, _dir) = test_client();
        let response = client.post("/dataset").body("   \n  ").dispatch();
        let body: Value = response.into_json().unwrap();
        assert_eq!(body["success"], false);

        let summary: Value = client.get("/dataset").dispatch().into_json().unwrap();
        assert_eq!(summary["loaded"], false);
    }

    #[test]
    fn facets_list_present_categories_and_channels() {
        let (client, _dir) = test_client();
        client.post("/dataset").body(sample_csv()).dispatch();

        let body: Value = client.get("/videos/facets").dispatch().into_json().unwrap();
        let categories = body["categories"].as_array().unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0]["name"], "Gaming");
        assert_eq!(body["channels"].as_array().unwrap().len(), 5);
    }

    #[test]
    fn export_is_a_csv_attachment_with_bom() {
        let (client, _dir) = test_client();
        client.post("/dataset").body(sample_csv()).dispatch();

        let response = client.get("/videos/export").dispatch();
        assert_eq!(response.status(), Status::Ok);
        let disposition = response.headers().get_one("Content-Disposition").unwrap();
        assert!(disposition.contains("attachment"));
        assert!(disposition.contains("videos_"));
        let body = response.into_string().unwrap();
        assert!(body.starts_with('\u{feff}'));
        assert_eq!(body.lines().count(), 46);
    }

    #[test]
    fn creators_are_ranked_by_max_score() {
        let (client, _dir) = test_client();
        client.post("/dataset").body(sample_csv()).dispatch();

        let body: Value = client.get("/creators").dispatch().into_json().unwrap();
        let creators = body["creators"].as_array().unwrap();
        assert_eq!(creators.len(), 5);
        // i % 5 == 4 holds the highest scores (i = 44, score 88)
        assert_eq!(creators[0]["name"], "Channel 4");
        assert_eq!(creators[0]["rank"], 1);
        assert_eq!(creators[0]["maxScore"], 88.0);
    }

    #[test]
    fn clearing_the_dataset_empties_queries() {
        let (client, _dir) = test_client();
        client.post("/dataset").body(sample_csv()).dispatch();
        client.delete("/dataset").dispatch();

        let body: Value = client.get("/videos").dispatch().into_json().unwrap();
        assert_eq!(body["statistics"]["totalVideos"], 0);
        assert!(body["videos"].as_array().unwrap().is_empty());
    }

    #[test]
    fn analysis_without_data_is_rejected() {
        let (client, _dir) = test_client();
        let response = client.post("/analysis/thresholds").dispatch();
        let body: Value = response.into_json().unwrap();
        assert_eq!(body["success"], false);
    }

    #[test]
    fn status_reports_unconfigured_key() {
        let (client, _dir) = test_client();
        let body: Value = client
            .get("/analysis/status")
            .dispatch()
            .into_json()
            .unwrap();
        assert_eq!(body["apiKeyConfigured"], false);
        assert_eq!(body["totalAnalyses"], 0);
    }

    #[test]
    fn feedback_requires_a_valid_rating() {
        let (client, _dir) = test_client();
        let response = client
            .post("/analysis/feedback")
            .header(rocket::http::ContentType::JSON)
            .body(r#"{"rating": 9}"#)
            .dispatch();
        let body: Value = response.into_json().unwrap();
        assert_eq!(body["success"], false);

        let response = client
            .post("/analysis/feedback")
            .header(rocket::http::ContentType::JSON)
            .body(r#"{"rating": 4, "comment": "useful"}"#)
            .dispatch();
        let body: Value = response.into_json().unwrap();
        assert_eq!(body["success"], true);
    }
}
