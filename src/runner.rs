//! 1回分の実行（スクレイプ → CSV 書き出し → サマリー）
//!
//! どの失敗もここで受け止めてログに残し、呼び出し元には [`RunReport`] だけを返す。

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{error, info};

use crate::config::ScraperConfig;
use crate::reviews::csv::write_csv;
use crate::reviews::{MapsReviewScraper, ReviewRecord};
use crate::traits::Scraper;

/// サマリーに載せるレビュー件数
const PREVIEW_LEN: usize = 3;

/// 実行結果
#[derive(Debug)]
pub enum RunReport {
    /// CSV を書き出した
    Saved {
        path: PathBuf,
        count: usize,
        preview: Vec<ReviewRecord>,
        elapsed: Duration,
    },
    /// レビューが1件も表示されなかった（ファイルは書かない）
    NoReviews { elapsed: Duration },
    /// 想定外のエラー
    Failed { message: String, elapsed: Duration },
}

impl RunReport {
    pub fn is_saved(&self) -> bool {
        matches!(self, RunReport::Saved { .. })
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            RunReport::Saved { elapsed, .. }
            | RunReport::NoReviews { elapsed }
            | RunReport::Failed { elapsed, .. } => *elapsed,
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunReport::Saved {
                path,
                count,
                preview,
                elapsed,
            } => {
                writeln!(f, "Extracted {} reviews in {:.1?}", count, elapsed)?;
                write!(f, "Reviews saved to {}", path.display())?;
                for record in preview {
                    write!(
                        f,
                        "\n  - {} ({}★, {}): {}",
                        record.reviewer_name.as_deref().unwrap_or("<anonymous>"),
                        record.star_rating,
                        record.review_date.as_deref().unwrap_or("no date"),
                        record.review_text
                    )?;
                }
                Ok(())
            }
            RunReport::NoReviews { elapsed } => {
                write!(f, "No reviews found on the page ({:.1?})", elapsed)
            }
            RunReport::Failed { message, elapsed } => {
                write!(f, "Scrape failed after {:.1?}: {}", elapsed, message)
            }
        }
    }
}

/// 設定から [`MapsReviewScraper`] を作って実行
pub async fn run(config: ScraperConfig) -> RunReport {
    let output_dir = config.output_dir.clone();
    let mut scraper = MapsReviewScraper::new(config);
    run_with(&mut scraper, &output_dir).await
}

/// 任意のスクレイパーで実行（ブラウザは必ず閉じる）
pub async fn run_with<S>(scraper: &mut S, output_dir: &Path) -> RunReport
where
    S: Scraper + ?Sized,
{
    let start = Instant::now();

    let records = match scraper.execute().await {
        Ok(records) => records,
        Err(e) if e.is_no_reviews() => {
            info!("Could not find any reviews on the page: {}", e);
            return RunReport::NoReviews {
                elapsed: start.elapsed(),
            };
        }
        Err(e) => {
            error!("An error occurred: {}", e);
            return RunReport::Failed {
                message: e.to_string(),
                elapsed: start.elapsed(),
            };
        }
    };

    let path = match write_csv(output_dir, &records, Utc::now()) {
        Ok(path) => path,
        Err(e) => {
            error!("Failed to write reviews: {}", e);
            return RunReport::Failed {
                message: e.to_string(),
                elapsed: start.elapsed(),
            };
        }
    };

    info!("Reviews saved to {}", path.display());
    let preview: Vec<ReviewRecord> = records.iter().take(PREVIEW_LEN).cloned().collect();
    for record in &preview {
        info!("Review: {:?}", record);
    }

    RunReport::Saved {
        path,
        count: records.len(),
        preview,
        elapsed: start.elapsed(),
    }
}
