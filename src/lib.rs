//! Google Maps レビュー スクレイパーライブラリ
//!
//! - 店舗ページのレビュー一覧を無限スクロールで読み込み
//! - 投稿者名・本文・日付・評価を抽出してCSVに保存
//!
//! # 使用例
//!
//! ```rust,ignore
//! use maps_review_scraper::{run, ScraperConfig, ProxyCredentials};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ScraperConfig::new("https://www.google.com/maps/place/...")
//!         .with_proxy(ProxyCredentials::new("user", "pass", "brd.superproxy.io:22225"))
//!         .with_headless(false);
//!
//!     let report = run(config).await;
//!     println!("{}", report);
//! }
//! ```
//!
//! # tower Service 使用例
//!
//! ```rust,ignore
//! use maps_review_scraper::{ReviewService, ScrapeRequest};
//! use tower::Service;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut service = ReviewService::new();
//!     let request = ScrapeRequest::new("https://www.google.com/maps/place/...")
//!         .with_output_dir("./reviews");
//!
//!     let result = service.call(request).await.unwrap();
//!     println!("{} reviews -> {:?}", result.records.len(), result.csv_path);
//! }
//! ```

pub mod config;
pub mod error;
pub mod reviews;
pub mod runner;
pub mod service;
pub mod traits;

// 主要な型をリエクスポート
pub use config::{ProxyCredentials, ReviewSelectors, ScraperConfig, Viewport};
pub use error::ScraperError;
pub use reviews::{MapsReviewScraper, ReviewRecord, NO_REVIEW_CONTENT};
pub use runner::{run, run_with, RunReport};
pub use service::{ReviewService, ScrapeRequest, ScrapeResult};
pub use traits::{ScrollSurface, Scraper};
