use axum::{extract::rejection::JsonRejection, extract::State, routing::post, Json, Router};
use serde_json::Value;
use tracing::{debug, info};

use super::ApiResult;
use crate::engine::{EngineHandle, IngestReport};
use crate::error::CoreError;
use crate::models::TelemetryRecord;

// ---

pub fn router() -> Router<EngineHandle> {
    // ---
    Router::new().route("/telemetry", post(handler))
}

/// Split a push into parsed records and the ones that failed to parse.
///
/// A push is either one record or an array of them. Each element is parsed
/// on its own so one bad record never costs the rest of the batch.
fn parse_records(body: Value) -> (Vec<TelemetryRecord>, Vec<CoreError>) {
    // ---
    let items = match body {
        Value::Array(items) => items,
        single => vec![single],
    };

    let mut records = Vec::with_capacity(items.len());
    let mut failures = Vec::new();
    for (i, item) in items.into_iter().enumerate() {
        match TelemetryRecord::from_json(item) {
            Ok(record) => records.push(record),
            Err(e) => {
                debug!("Failed to parse telemetry item {}: {}", i, e);
                failures.push(e);
            }
        }
    }
    (records, failures)
}

async fn handler(
    State(engine): State<EngineHandle>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<IngestReport> {
    // ---
    let Json(body) = body?;
    let (records, failures) = parse_records(body);
    debug!(
        "POST /telemetry - {} record(s), {} unparsable",
        records.len(),
        failures.len()
    );

    let mut report = engine.ingest(records).await?;
    for failure in &failures {
        report.reject(failure);
    }
    info!(
        accepted = report.accepted,
        rejected = report.rejected,
        alerts = report.alerts.len(),
        "telemetry ingested"
    );
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use serde_json::json;

    fn record(raw: Value, timestamp: &str) -> Value {
        json!({
            "device_id": "D1",
            "metric": "water_level",
            "value": raw,
            "timestamp": timestamp,
        })
    }

    #[test]
    fn test_bad_item_does_not_sink_batch() {
        // ---
        let body = json!([
            record(json!(45), "2025-03-26T18:45:00Z"),
            record(json!(70), "not-a-time"),
            json!({"metric": "water_level"}),
            record(json!(5), "2025-03-26T18:46:00Z"),
        ]);
        let (records, failures) = parse_records(body);
        assert_eq!(records.len(), 2);
        assert_eq!(failures.len(), 2);
        assert!(failures
            .iter()
            .all(|e| matches!(e, CoreError::MalformedReading { .. })));
    }

    #[test]
    fn test_single_record_body() {
        // ---
        let (records, failures) = parse_records(record(json!(45), "2025-03-26T18:45:00Z"));
        assert_eq!(records.len(), 1);
        assert!(failures.is_empty());

        let (records, failures) = parse_records(json!(42));
        assert!(records.is_empty());
        assert_eq!(failures.len(), 1);
    }
}
