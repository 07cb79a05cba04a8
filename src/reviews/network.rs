//! 実行中リクエストの追跡（ネットワークアイドル判定用）

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// アイドルとみなす実行中リクエスト数の上限
pub const IDLE_MAX_IN_FLIGHT: usize = 2;

/// ページのネットワークイベント
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkEvent {
    /// `Network.requestWillBeSent`
    Started(String),
    /// `Network.loadingFinished` / `Network.loadingFailed`
    Finished(String),
}

/// 実行中のリクエストID集合
///
/// リダイレクトは同じIDで `requestWillBeSent` が再送されるため件数ではなく集合で持つ。
#[derive(Debug, Clone, Default)]
pub struct InFlightRequests {
    ids: Arc<Mutex<HashSet<String>>>,
}

impl InFlightRequests {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&self, event: NetworkEvent) {
        let mut ids = self.ids.lock().unwrap_or_else(|e| e.into_inner());
        match event {
            NetworkEvent::Started(id) => {
                ids.insert(id);
            }
            NetworkEvent::Finished(id) => {
                ids.remove(&id);
            }
        }
    }

    pub fn count(&self) -> usize {
        self.ids.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_idle(&self) -> bool {
        self.count() <= IDLE_MAX_IN_FLIGHT
    }
}
