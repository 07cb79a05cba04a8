//! レビュー CSV 生成
//!
//! クォートは行わず、行・列を壊す文字だけを置換する（改行 → 空白、`,` → `;`）。

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use super::types::ReviewRecord;
use crate::error::ScraperError;

pub const CSV_HEADER: [&str; 4] = ["Reviewer Name", "Review Text", "Review Date", "Star Rating"];

/// レコード列を CSV 文字列に変換（ヘッダー行付き）
pub fn to_csv(records: &[ReviewRecord]) -> String {
    let mut rows = Vec::with_capacity(records.len() + 1);
    rows.push(CSV_HEADER.join(","));

    for record in records {
        let fields = [
            clean_field(record.reviewer_name.as_deref().unwrap_or_default()),
            clean_field(&record.review_text),
            clean_field(record.review_date.as_deref().unwrap_or_default()),
            record.star_rating.to_string(),
        ];
        rows.push(fields.join(","));
    }

    rows.join("\n")
}

fn clean_field(value: &str) -> String {
    value
        .replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
        .replace(',', ";")
}

/// `googlemapsreviews_2024-11-20T12-34-56-789Z.csv` 形式のファイル名
pub fn output_filename(now: DateTime<Utc>) -> String {
    let timestamp = now
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
        .replace([':', '.'], "-");
    format!("googlemapsreviews_{}.csv", timestamp)
}

/// CSV を出力ディレクトリに書き出してパスを返す
pub fn write_csv(
    output_dir: &Path,
    records: &[ReviewRecord],
    now: DateTime<Utc>,
) -> Result<PathBuf, ScraperError> {
    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(output_filename(now));
    std::fs::write(&path, to_csv(records))?;
    Ok(path)
}
