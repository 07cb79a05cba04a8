use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("ブラウザ初期化エラー: {0}")]
    BrowserInit(String),

    #[error("ナビゲーションエラー: {0}")]
    Navigation(String),

    #[error("プロキシ認証エラー: {0}")]
    Proxy(String),

    #[error("タイムアウト: {0}")]
    Timeout(String),

    #[error("JavaScript実行エラー: {0}")]
    JavaScript(String),

    #[error("JSONパースエラー: {0}")]
    Json(String),

    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイル操作エラー: {0}")]
    FileIO(#[from] std::io::Error),

    #[error("レビューが見つかりません: {0}")]
    NoReviews(String),
}

impl ScraperError {
    /// 「レビューなし」は正常終了扱い
    pub fn is_no_reviews(&self) -> bool {
        matches!(self, ScraperError::NoReviews(_))
    }
}
