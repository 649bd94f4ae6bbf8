//! CSV export of stored answers and search feedback

use crate::db::models::{QueryIr, SearchFeedback};
use crate::errors::{AppError, Result};
use chrono::{DateTime, Utc};

pub const QUERY_COLUMNS: [&str; 12] = [
    "id",
    "query",
    "brief",
    "response",
    "references",
    "expanded_query",
    "model",
    "backend_version",
    "client_id",
    "user_id",
    "timestamp",
    "response_time",
];

pub const SEARCH_FEEDBACK_COLUMNS: [&str; 5] =
    ["id", "question", "additional", "client_id", "timestamp"];

fn optional<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(ToString::to_string).unwrap_or_default()
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer.into_inner().map_err(|e| AppError::Internal {
        message: format!("Failed to flush CSV: {}", e),
    })
}

/// One header row plus one row per stored answer; references as a JSON array
pub fn queries_to_csv(queries: &[QueryIr]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(QUERY_COLUMNS)?;

    for q in queries {
        writer.write_record([
            q.id.to_string(),
            q.query.clone(),
            q.brief.clone(),
            q.response.clone(),
            q.references.to_string(),
            q.expanded_query.clone(),
            q.model.clone(),
            optional(&q.backend_version),
            optional(&q.client_id),
            optional(&q.user_id),
            q.timestamp.to_rfc3339(),
            q.response_time.to_string(),
        ])?;
    }

    finish(writer)
}

/// One header row plus one row per search feedback entry
pub fn search_feedback_to_csv(entries: &[SearchFeedback]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(SEARCH_FEEDBACK_COLUMNS)?;

    for f in entries {
        writer.write_record([
            f.id.to_string(),
            f.question.clone(),
            optional(&f.additional),
            optional(&f.client_id),
            f.timestamp.to_rfc3339(),
        ])?;
    }

    finish(writer)
}

/// Download name such as `queries_ir_2025-01-01_2025-01-31.csv`
pub fn export_filename(prefix: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    format!(
        "{}_{}_{}.csv",
        prefix,
        start.format("%Y-%m-%d"),
        end.format("%Y-%m-%d")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn query() -> QueryIr {
        QueryIr {
            id: Uuid::nil(),
            query: "black holes".into(),
            brief: "Short, with a comma".into(),
            response: "Line one\nline two [1]".into(),
            references: serde_json::json!(["ref a", "ref b"]),
            expanded_query: r#"ft "black holes""#.into(),
            model: "llama31".into(),
            backend_version: None,
            client_id: None,
            user_id: Some("u1".into()),
            timestamp: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap().into(),
            response_time: 1.5,
        }
    }

    #[test]
    fn test_queries_csv_round_trips_through_reader() {
        let bytes = queries_to_csv(&[query()]).unwrap();

        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), QUERY_COLUMNS.len());
        assert_eq!(&headers[4], "references");

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][2], "Short, with a comma");
        assert_eq!(&rows[0][3], "Line one\nline two [1]");
        assert_eq!(&rows[0][4], r#"["ref a","ref b"]"#);
        assert_eq!(&rows[0][7], "");
        assert_eq!(&rows[0][9], "u1");
    }

    #[test]
    fn test_empty_export_has_header_only() {
        let bytes = search_feedback_to_csv(&[]).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "id,question,additional,client_id,timestamp\n"
        );
    }

    #[test]
    fn test_export_filename() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 1, 31, 23, 59, 59).unwrap();
        assert_eq!(
            export_filename("queries_ir", start, end),
            "queries_ir_2025-01-01_2025-01-31.csv"
        );
    }
}
