//! Google Maps レビュー スクレイパーモジュール
//!
//! レビュー一覧をスクロールで全件読み込み、正規化して CSV に書き出す

pub mod csv;
pub mod extract;
mod network;
mod scraper;
pub mod scroll;
mod types;

pub use scraper::{MapsReviewScraper, PageSurface};
pub use types::{ReviewRecord, ReviewSnapshot, NO_REVIEW_CONTENT};
