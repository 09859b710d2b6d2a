// config.rs
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub webhook_secret: String,
    pub attribution_window_days: i32,
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn init() -> Config {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let webhook_secret =
            std::env::var("WEBHOOK_SECRET").expect("WEBHOOK_SECRET must be set");

        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(8000);

        let attribution_window_days = std::env::var("ATTRIBUTION_WINDOW_DAYS")
            .ok()
            .and_then(|d| d.parse::<i32>().ok())
            .unwrap_or(30);

        let cors_origins = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| {
                "http://localhost:5173,http://localhost:8000".to_string()
            })
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        Config {
            database_url,
            port,
            webhook_secret,
            attribution_window_days,
            cors_origins,
        }
    }
}
