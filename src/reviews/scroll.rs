//! 無限スクロール一覧の読み込み
//!
//! コンテナを最下部までスクロールし、件数が `max_stale_rounds` 回連続で
//! 変化しなくなったら読み込み完了とみなす。

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::ScraperError;
use crate::traits::ScrollSurface;

/// スクロール設定
#[derive(Debug, Clone, Copy)]
pub struct ScrollSettings {
    /// スクロール後の描画待ち
    pub settle_interval: Duration,
    /// 件数が連続で変化しなかった回数の上限
    pub max_stale_rounds: u32,
}

impl Default for ScrollSettings {
    fn default() -> Self {
        Self {
            settle_interval: Duration::from_secs(2),
            max_stale_rounds: 10,
        }
    }
}

/// 件数が安定するまでスクロールし、最終件数を返す
///
/// コンテナが見つからない場合は 0 を返す（エラーにはしない）。
pub async fn scroll_until_stable<S>(
    surface: &S,
    settings: ScrollSettings,
) -> Result<usize, ScraperError>
where
    S: ScrollSurface + ?Sized,
{
    if !surface.locate_container().await? {
        warn!("Could not find scrollable review container");
        return Ok(0);
    }

    let mut last_count = surface.item_count().await?;
    let mut stale_streak = 0;
    let mut round = 0u32;

    info!("Scrolling for more reviews (initial count: {})", last_count);

    while stale_streak < settings.max_stale_rounds {
        surface.scroll_to_end().await?;
        sleep(settings.settle_interval).await;

        let count = surface.item_count().await?;
        round += 1;

        if count == last_count {
            stale_streak += 1;
        } else {
            stale_streak = 0;
            last_count = count;
        }

        debug!(
            "Scroll round {}: {} reviews (unchanged {}/{})",
            round, count, stale_streak, settings.max_stale_rounds
        );
    }

    info!("Review count stable at {} after {} rounds", last_count, round);
    Ok(last_count)
}
