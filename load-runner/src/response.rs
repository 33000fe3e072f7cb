use std::process::ExitCode;

use loader::types::{LoadReport, LoadResult};
use serde::Serialize;
use serde_json::{Value, json};

use crate::error::LoadRunnerError;

const STATUS_OK: u16 = 200;
const STATUS_INTERNAL_ERROR: u16 = 500;

/// What a run produced: a report for a full load or one result for an artifact event.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum LoadOutcome {
    Full(LoadReport),
    Artifact(LoadResult),
}

/// Status payload written to stdout when a run ends.
#[derive(Debug, Clone, Serialize)]
pub struct LoadResponse {
    pub status_code: u16,
    pub body: Value,
}

impl LoadResponse {
    /// A handled run. Per-table failures are reported inside `result`.
    pub fn success(outcome: &LoadOutcome) -> Self {
        Self {
            status_code: STATUS_OK,
            body: json!({
                "message": "Warehouse load successful",
                "result": outcome,
            }),
        }
    }

    /// A run that could not start or could not finish.
    pub fn failure(err: &LoadRunnerError) -> Self {
        Self {
            status_code: STATUS_INTERNAL_ERROR,
            body: json!({ "error": err.to_string() }),
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.status_code == STATUS_OK {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|err| {
            format!(
                r#"{{"status_code":{STATUS_INTERNAL_ERROR},"body":{{"error":"failed to render response: {err}"}}}}"#
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loader::types::LoadOperation;

    #[test]
    fn full_load_body_is_keyed_by_table() {
        let mut report = LoadReport::new();
        report.push(LoadResult::success("dim_currency", LoadOperation::Upsert, 2));

        let response = LoadResponse::success(&LoadOutcome::Full(report));

        assert_eq!(response.status_code, 200);
        assert_eq!(
            response.body,
            json!({
                "message": "Warehouse load successful",
                "result": {
                    "dim_currency": {
                        "table": "dim_currency",
                        "status": "success",
                        "operation": "upsert",
                        "rows_loaded": 2
                    }
                }
            })
        );
    }

    #[test]
    fn artifact_body_holds_a_single_result() {
        let outcome = LoadOutcome::Artifact(LoadResult::success(
            "fact_payment",
            LoadOperation::Insert,
            5,
        ));

        let response = LoadResponse::success(&outcome);

        assert_eq!(response.body["result"]["table"], "fact_payment");
        assert_eq!(response.body["result"]["operation"], "insert");
    }

    #[test]
    fn setup_error_maps_to_500() {
        let err = LoadRunnerError::config(std::io::Error::other("bucket not configured"));
        let response = LoadResponse::failure(&err);

        assert_eq!(response.status_code, 500);
        assert_eq!(
            response.body,
            json!({"error": "configuration error: bucket not configured"})
        );
    }
}
