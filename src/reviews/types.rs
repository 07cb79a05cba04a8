//! レビュー関連の型定義

use serde::{Deserialize, Serialize};

/// 本文がない場合の代替文字列
pub const NO_REVIEW_CONTENT: &str = "No review content";

/// 正規化済みレビュー1件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub reviewer_name: Option<String>,
    /// 常に値あり（欠落時は [`NO_REVIEW_CONTENT`]）
    pub review_text: String,
    /// ページ表示のまま ("3 months ago" など)
    pub review_date: Option<String>,
    /// 0〜5、判別不能なら 0
    pub star_rating: u8,
}

/// ページから読み取った要素1件分の生データ
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSnapshot {
    pub name: Option<String>,
    pub text: Option<String>,
    pub date: Option<String>,
    /// 評価要素の `aria-label`
    pub rating_label: Option<String>,
}
