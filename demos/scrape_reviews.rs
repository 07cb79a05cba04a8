//! Google Maps レビュー取得
//!
//! 実行方法:
//! ```
//! MAPS_URL='https://www.google.com/maps/place/...' cargo run --example scrape_reviews
//! ```
//!
//! プロキシを使う場合は `PROXY_USERNAME` / `PROXY_PASSWORD` / `PROXY_HOST` を設定する。

use maps_review_scraper::{run, ScraperConfig};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ログ設定
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // .envがあれば読み込む
    if let Ok(env_path) = std::fs::canonicalize(".env") {
        println!("Loading .env from: {:?}", env_path);
        for line in std::fs::read_to_string(".env")?.lines() {
            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                let value = value.trim().trim_matches('\'').trim_matches('"');
                if !key.starts_with('#') && !key.is_empty() {
                    std::env::set_var(key, value);
                }
            }
        }
    }

    let config = match ScraperConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return Ok(());
        }
    };

    println!("=== Google Maps Review Scraper ===");
    println!("URL: {}", config.target_url);
    println!("Proxy: {:?}", config.proxy);

    let report = run(config).await;
    println!("{}", report);

    Ok(())
}
