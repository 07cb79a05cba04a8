use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

use chrono::Utc;
use tower::Service;
use tracing::info;

use crate::config::{ProxyCredentials, ScraperConfig};
use crate::error::ScraperError;
use crate::reviews::csv::write_csv;
use crate::reviews::{MapsReviewScraper, ReviewRecord};
use crate::traits::Scraper;

/// スクレイピングリクエスト
#[derive(Debug, Clone)]
pub struct ScrapeRequest {
    pub url: String,
    pub proxy: Option<ProxyCredentials>,
    pub output_dir: PathBuf,
    pub headless: bool,
}

impl ScrapeRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            proxy: None,
            output_dir: PathBuf::from("."),
            headless: true,
        }
    }

    pub fn with_proxy(mut self, proxy: ProxyCredentials) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn with_output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = path.into();
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }
}

impl From<ScrapeRequest> for ScraperConfig {
    fn from(req: ScrapeRequest) -> Self {
        ScraperConfig {
            target_url: req.url,
            proxy: req.proxy,
            output_dir: req.output_dir,
            headless: req.headless,
            ..Default::default()
        }
    }
}

/// スクレイピング結果
#[derive(Debug)]
pub struct ScrapeResult {
    pub records: Vec<ReviewRecord>,
    pub csv_path: PathBuf,
    pub csv_content: Vec<u8>,
}

impl ScrapeResult {
    pub fn new(records: Vec<ReviewRecord>, csv_path: PathBuf) -> std::io::Result<Self> {
        let csv_content = std::fs::read(&csv_path)?;
        Ok(Self {
            records,
            csv_path,
            csv_content,
        })
    }
}

/// tower::Serviceを実装したレビュー スクレイパーサービス
///
/// レビューが見つからない場合は [`ScraperError::NoReviews`] を返す。
#[derive(Debug, Clone, Default)]
pub struct ReviewService {
    // 将来的な拡張用（レートリミット、キャッシュなど）
}

impl ReviewService {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Service<ScrapeRequest> for ReviewService {
    type Response = ScrapeResult;
    type Error = ScraperError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: ScrapeRequest) -> Self::Future {
        info!("スクレイピングリクエスト受信: url={}", req.url);

        Box::pin(async move {
            let config: ScraperConfig = req.into();
            let output_dir = config.output_dir.clone();
            let mut scraper = MapsReviewScraper::new(config);

            let records = scraper.execute().await?;
            let csv_path = write_csv(&output_dir, &records, Utc::now())?;

            let result = ScrapeResult::new(records, csv_path)?;

            info!(
                "スクレイピング完了: path={:?}, reviews={}, size={}bytes",
                result.csv_path,
                result.records.len(),
                result.csv_content.len()
            );

            Ok(result)
        })
    }
}
