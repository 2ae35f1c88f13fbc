use chrono::NaiveDate;

use crate::config::{BatchConfig, PlatformProfile};
use crate::types::{ItemStatus, WorkItem};

/// Header row of the export artifact.
pub const CSV_HEADER: &str = "Filename,Title,Description,Keywords";

/// Serialize all completed items to a UTF-8 CSV byte stream.
///
/// One data row per completed item in queue order; keywords joined
/// with ", ". Fields containing the delimiter, a double quote, or a
/// newline are wrapped in double quotes with embedded quotes doubled.
/// Returns `None` when no item is completed (nothing to export).
///
/// With `truncate_on_export` set, titles and descriptions are clipped
/// to their character budgets and keywords to the keyword target.
pub fn export_csv(items: &[WorkItem], config: &BatchConfig) -> Option<Vec<u8>> {
    let completed: Vec<&WorkItem> = items
        .iter()
        .filter(|i| i.status == ItemStatus::Completed && i.metadata.is_some())
        .collect();
    if completed.is_empty() {
        return None;
    }

    let mut out = String::new();
    out.push_str(CSV_HEADER);
    out.push('\n');

    for item in completed {
        let Some(m) = item.metadata.as_ref() else {
            continue;
        };

        let (title, description, keywords) = if config.truncate_on_export {
            (
                truncate_chars(&m.title, config.title_budget as usize),
                truncate_chars(&m.description, config.description_budget as usize),
                m.keywords
                    .iter()
                    .take(config.keyword_target as usize)
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", "),
            )
        } else {
            (m.title.clone(), m.description.clone(), m.keywords.join(", "))
        };

        out.push_str(&escape_field(item.source.name()));
        out.push(',');
        out.push_str(&escape_field(&title));
        out.push(',');
        out.push_str(&escape_field(&description));
        out.push(',');
        out.push_str(&escape_field(&keywords));
        out.push('\n');
    }

    Some(out.into_bytes())
}

/// Export file name convention: `metadata_<platform>_<YYYY-MM-DD>.csv`
/// with the run-completion date.
pub fn export_filename(platform: PlatformProfile, date: NaiveDate) -> String {
    format!("metadata_{}_{}.csv", platform.slug(), date.format("%Y-%m-%d"))
}

fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        text.to_string()
    } else {
        text.chars().take(limit).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ItemMetadata, SourceRef};

    fn completed_item(name: &str, title: &str, description: &str, keywords: &[&str]) -> WorkItem {
        WorkItem {
            id: name.to_string(),
            source: SourceRef::filename(name),
            status: ItemStatus::Completed,
            metadata: Some(ItemMetadata {
                title: title.to_string(),
                description: description.to_string(),
                keywords: keywords.iter().map(|k| k.to_string()).collect(),
            }),
            error: None,
            duration_ms: Some(100),
            created_at: String::new(),
        }
    }

    fn pending_item(name: &str) -> WorkItem {
        WorkItem {
            id: name.to_string(),
            source: SourceRef::filename(name),
            status: ItemStatus::Pending,
            metadata: None,
            error: None,
            duration_ms: None,
            created_at: String::new(),
        }
    }

    #[test]
    fn test_empty_completed_set_exports_nothing() {
        let config = BatchConfig::default();
        assert!(export_csv(&[], &config).is_none());
        assert!(export_csv(&[pending_item("a.jpg")], &config).is_none());
    }

    #[test]
    fn test_header_and_row_layout() {
        let config = BatchConfig::default();
        let items = vec![completed_item(
            "apple.jpg",
            "Red apple",
            "A ripe red apple",
            &["apple", "fruit"],
        )];
        let bytes = export_csv(&items, &config).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(
            text,
            "Filename,Title,Description,Keywords\napple.jpg,Red apple,A ripe red apple,\"apple, fruit\"\n"
        );
    }

    #[test]
    fn test_quote_escaping() {
        let config = BatchConfig::default();
        let items = vec![completed_item(
            "a.jpg",
            r#"He said "wow""#,
            "plain",
            &["one"],
        )];
        let text = String::from_utf8(export_csv(&items, &config).unwrap()).unwrap();
        assert!(text.contains(r#""He said ""wow""""#));
    }

    #[test]
    fn test_non_completed_items_excluded() {
        let config = BatchConfig::default();
        let items = vec![
            completed_item("a.jpg", "A", "da", &["k"]),
            pending_item("b.jpg"),
            completed_item("c.jpg", "C", "dc", &["k"]),
        ];
        let text = String::from_utf8(export_csv(&items, &config).unwrap()).unwrap();
        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(rows.len(), 3); // header + 2 data rows
        assert!(!text.contains("b.jpg"));
    }

    #[test]
    fn test_export_is_idempotent() {
        let config = BatchConfig::default();
        let items = vec![completed_item("a.jpg", "Title, with comma", "d", &["k1", "k2"])];
        let first = export_csv(&items, &config).unwrap();
        let second = export_csv(&items, &config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_truncation_on_export() {
        let config = BatchConfig::default()
            .with_title_budget(10)
            .with_keyword_target(2)
            .with_truncate_on_export(true);
        let items = vec![completed_item(
            "a.jpg",
            "A very long title that exceeds the budget",
            "A description well within its budget",
            &["one", "two", "three", "four"],
        )];
        let text = String::from_utf8(export_csv(&items, &config).unwrap()).unwrap();
        assert!(text.contains("A very lon"));
        assert!(!text.contains("exceeds"));
        assert!(text.contains("\"one, two\""));
        assert!(!text.contains("three"));
    }

    #[test]
    fn test_export_filename_convention() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        assert_eq!(
            export_filename(PlatformProfile::AdobeStock, date),
            "metadata_adobe_stock_2025-03-09.csv"
        );
        assert_eq!(
            export_filename(PlatformProfile::All, date),
            "metadata_all_2025-03-09.csv"
        );
    }
}
