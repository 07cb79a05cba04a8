use async_trait::async_trait;
use tracing::warn;

use crate::error::ScraperError;
use crate::reviews::ReviewRecord;

#[async_trait]
pub trait Scraper: Send + Sync {
    /// ブラウザ初期化
    async fn initialize(&mut self) -> Result<(), ScraperError>;

    /// 対象ページへ遷移
    async fn navigate(&mut self) -> Result<(), ScraperError>;

    /// レビューを読み込んで抽出
    async fn collect(&mut self) -> Result<Vec<ReviewRecord>, ScraperError>;

    /// リソース解放
    async fn close(&mut self) -> Result<(), ScraperError>;

    /// 一括実行（initialize → navigate → collect → close）
    ///
    /// 途中で失敗しても close は必ず呼ぶ。
    async fn execute(&mut self) -> Result<Vec<ReviewRecord>, ScraperError> {
        let outcome = match self.initialize().await {
            Ok(()) => match self.navigate().await {
                Ok(()) => self.collect().await,
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };

        if let Err(e) = self.close().await {
            warn!("Failed to close browser: {}", e);
        }

        outcome
    }
}

/// スクロールで追加読み込みされる一覧
#[async_trait]
pub trait ScrollSurface: Send + Sync {
    /// スクロールコンテナを特定する（見つからなければ false）
    async fn locate_container(&self) -> Result<bool, ScraperError>;

    /// コンテナを最下部までスクロール
    async fn scroll_to_end(&self) -> Result<(), ScraperError>;

    /// 現在描画されているレビュー件数
    async fn item_count(&self) -> Result<usize, ScraperError>;
}
