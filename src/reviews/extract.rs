//! 要素スナップショット → ReviewRecord の正規化

use std::sync::LazyLock;

use regex::Regex;

use super::types::{ReviewRecord, ReviewSnapshot, NO_REVIEW_CONTENT};

static RATING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s+stars").expect("valid rating regex"));

/// 全スナップショットを文書順のまま変換
pub fn extract_records(snapshots: &[ReviewSnapshot]) -> Vec<ReviewRecord> {
    snapshots.iter().map(extract_record).collect()
}

/// 1件分を変換（欠落フィールドは既定値で埋める）
pub fn extract_record(snapshot: &ReviewSnapshot) -> ReviewRecord {
    ReviewRecord {
        reviewer_name: present(&snapshot.name),
        review_text: present(&snapshot.text).unwrap_or_else(|| NO_REVIEW_CONTENT.to_string()),
        review_date: present(&snapshot.date),
        star_rating: snapshot
            .rating_label
            .as_deref()
            .map(parse_star_rating)
            .unwrap_or(0),
    }
}

/// "5 stars" のようなラベルから評価値を取り出す
///
/// 値は 5 に丸めない。`u8` に収まらない数値（"999 stars" など）は
/// 不一致と同じく 0 を返す。
pub fn parse_star_rating(label: &str) -> u8 {
    RATING_RE
        .captures(label)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

// innerText の空文字は欠落扱い
fn present(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(
        name: Option<&str>,
        text: Option<&str>,
        date: Option<&str>,
        rating_label: Option<&str>,
    ) -> ReviewSnapshot {
        ReviewSnapshot {
            name: name.map(str::to_string),
            text: text.map(str::to_string),
            date: date.map(str::to_string),
            rating_label: rating_label.map(str::to_string),
        }
    }

    #[test]
    fn test_text_is_kept_verbatim() {
        let text = "Great crust,\n friendly staff  ";
        let record = extract_record(&snapshot(None, Some(text), None, None));
        assert_eq!(record.review_text, text);
    }

    #[test]
    fn test_missing_text_uses_placeholder() {
        let record = extract_record(&snapshot(Some("Ann"), None, None, None));
        assert_eq!(record.review_text, NO_REVIEW_CONTENT);

        let record = extract_record(&snapshot(Some("Ann"), Some(""), None, None));
        assert_eq!(record.review_text, NO_REVIEW_CONTENT);
    }

    #[test]
    fn test_optional_fields_stay_absent() {
        let record = extract_record(&snapshot(None, Some("ok"), None, Some("4 stars")));
        assert_eq!(record.reviewer_name, None);
        assert_eq!(record.review_date, None);
        assert_eq!(record.star_rating, 4);
    }

    #[test]
    fn test_parse_star_rating() {
        assert_eq!(parse_star_rating("5 stars"), 5);
        assert_eq!(parse_star_rating(" 1 stars "), 1);
        assert_eq!(parse_star_rating("Rated 3  stars out of 5"), 3);
        assert_eq!(parse_star_rating("0 stars"), 0);
    }

    #[test]
    fn test_parse_star_rating_rejects_other_labels() {
        assert_eq!(parse_star_rating("N/A"), 0);
        assert_eq!(parse_star_rating(""), 0);
        assert_eq!(parse_star_rating("stars"), 0);
        assert_eq!(parse_star_rating("4 star"), 0);
        assert_eq!(parse_star_rating("4stars"), 0);
        assert_eq!(parse_star_rating("999 stars"), 0);
    }

    #[test]
    fn test_rating_out_of_range() {
        // 5 を超えてもそのまま、u8 に収まらなければ 0
        assert_eq!(parse_star_rating("7 stars"), 7);
        assert_eq!(parse_star_rating("255 stars"), 255);
        assert_eq!(parse_star_rating("256 stars"), 0);
    }

    #[test]
    fn test_missing_rating_label_is_zero() {
        let record = extract_record(&snapshot(None, None, None, None));
        assert_eq!(record.star_rating, 0);
    }

    #[test]
    fn test_order_is_preserved() {
        let snapshots = vec![
            snapshot(Some("first"), Some("a"), None, Some("1 stars")),
            snapshot(Some("second"), Some("b"), None, Some("2 stars")),
            snapshot(Some("third"), Some("c"), None, Some("3 stars")),
        ];
        let records = extract_records(&snapshots);
        let names: Vec<_> = records
            .iter()
            .map(|r| r.reviewer_name.as_deref().unwrap_or_default())
            .collect();
        assert_eq!(names, ["first", "second", "third"]);
    }

    #[test]
    fn test_snapshot_from_page_json() {
        let json = r#"[
            {"name": "Ann", "text": "Tasty", "date": "a week ago", "ratingLabel": "5 stars"},
            {"name": null, "text": null, "date": null, "ratingLabel": null}
        ]"#;
        let snapshots: Vec<ReviewSnapshot> = serde_json::from_str(json).unwrap();
        let records = extract_records(&snapshots);
        assert_eq!(records[0].star_rating, 5);
        assert_eq!(records[0].review_date.as_deref(), Some("a week ago"));
        assert_eq!(records[1].review_text, NO_REVIEW_CONTENT);
    }
}
