use anyhow::Result;
use env_logger::Builder;
use lazy_static::lazy_static;
use log::{info, LevelFilter};
use rocket::http::Method;
use rocket_cors::{AllowedHeaders, AllowedOrigins, CorsOptions};
use std::env;

lazy_static! {
    pub static ref GEMINI_API_KEY: String =
        env::var("GEMINI_API_KEY").unwrap_or_default();
    pub static ref GEMINI_BASE_URL: String = env::var("GEMINI_BASE_URL").unwrap_or_else(|_| {
        "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
            .to_string()
    });
    pub static ref GEMINI_DAILY_LIMIT: u32 = env::var("GEMINI_DAILY_LIMIT")
        .unwrap_or_else(|_| "1500".to_string())
        .parse::<u32>()
        .unwrap_or(1500);
    pub static ref LEARNING_STORE_PATH: String =
        env::var("LEARNING_STORE_PATH").unwrap_or_else(|_| "learning.json".to_string());
    pub static ref ALLOWED_ORIGIN: String =
        env::var("ALLOWED_ORIGIN").unwrap_or_else(|_| "http://localhost:3000".to_string());
}

pub fn init_logger() {
    Builder::new().filter_level(LevelFilter::Info).init();
    info!("Starting yt-insight backend...");
}

pub fn load_environment() {
    dotenv::dotenv().ok();
}

pub fn create_cors() -> Result<rocket_cors::Cors> {
    let cors = CorsOptions::default()
        .allowed_origins(AllowedOrigins::some_exact(&[ALLOWED_ORIGIN.as_str()]))
        .allowed_methods(
            vec![
                Method::Get,
                Method::Post,
                Method::Put,
                Method::Delete,
                Method::Options,
            ]
            .into_iter()
            .map(From::from)
            .collect(),
        )
        .allowed_headers(AllowedHeaders::some(&[
            "Authorization",
            "Accept",
            "Content-Type",
        ]))
        .allow_credentials(true)
        .to_cors()
        .map_err(|e| anyhow::anyhow!("Failed to create CORS options: {}", e))?;

    Ok(cors)
}
