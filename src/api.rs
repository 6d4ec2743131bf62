use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::analyzer::SessionReport;
use crate::error::AnalyzerError;
use crate::models::{RelativeRun, RunOutcome};

/// The report the analyser keeps updating while the server reads it
pub type SharedReport = Arc<Mutex<SessionReport>>;

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

pub fn create_router(report: SharedReport) -> Router {
    Router::new()
        .route("/api/report", get(full_report))
        .route("/api/runs/{run_nr}", get(run_detail))
        .route("/api/best", get(best_run))
        .layer(CorsLayer::permissive())
        .with_state(report)
}

/// Serve the report until Ctrl-C
pub async fn serve(addr: SocketAddr, report: SharedReport) -> Result<(), AnalyzerError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(AnalyzerError::Server)?;
    info!(%addr, "Serving run report");

    axum::serve(listener, create_router(report))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Could not listen for Ctrl-C");
            }
        })
        .await
        .map_err(AnalyzerError::Server)
}

fn snapshot<T>(
    report: &SharedReport,
    read: impl FnOnce(&SessionReport) -> T,
) -> Result<T, (StatusCode, String)> {
    let report = report
        .lock()
        .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "Report lock poisoned".to_string()))?;
    Ok(read(&report))
}

async fn full_report(State(report): State<SharedReport>) -> ApiResult<SessionReport> {
    snapshot(&report, SessionReport::clone).map(Json)
}

async fn run_detail(
    State(report): State<SharedReport>,
    Path(run_nr): Path<u32>,
) -> ApiResult<RunOutcome> {
    snapshot(&report, |r| r.run(run_nr).cloned())?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, format!("Run #{run_nr} not found")))
}

async fn best_run(State(report): State<SharedReport>) -> ApiResult<RelativeRun> {
    snapshot(&report, |r| r.best().cloned())?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "No completed run yet".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Analyzer;
    use crate::markers::MarkerTable;
    use crate::parser::tests::LogBuilder;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn shared(report: SessionReport) -> SharedReport {
        Arc::new(Mutex::new(report))
    }

    fn analysed_report() -> SessionReport {
        let lines = LogBuilder::new()
            .intro()
            .shields(1)
            .at(1.0, "EidolonMP.lua: EIDOLONMP: TryTownTransition")
            .intro()
            .full_fight()
            .lines();
        let outcomes = Analyzer::new(MarkerTable::default()).analyze_log(lines.into_iter());
        SessionReport::new("EE.log", outcomes)
    }

    async fn get_json(report: SharedReport, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = create_router(report)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
            .await
            .expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn report_lists_every_outcome() {
        let (status, body) = get_json(shared(analysed_report()), "/api/report").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"], "EE.log");
        assert_eq!(body["best_run"], 2);
        assert_eq!(body["outcomes"][0]["outcome"], "aborted");
        assert_eq!(body["outcomes"][0]["cause"]["cause"], "returned_to_town");
        assert_eq!(body["outcomes"][1]["outcome"], "completed");
    }

    #[tokio::test]
    async fn single_run_by_number() {
        let report = shared(analysed_report());

        let (status, body) = get_json(report.clone(), "/api/runs/2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["run_nr"], 2);
        assert_eq!(body["best_run"], true);

        let (status, _) = get_json(report, "/api/runs/9").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn best_run_is_not_found_without_completed_runs() {
        let empty = shared(SessionReport::new("EE.log", Vec::new()));
        let (status, _) = get_json(empty, "/api/best").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = get_json(shared(analysed_report()), "/api/best").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["run_nr"], 2);
        assert_eq!(body["phases"].as_array().map(Vec::len), Some(4));
    }

    #[tokio::test]
    async fn report_follows_updates() {
        let report = shared(SessionReport::new("EE.log", Vec::new()));
        *report.lock().expect("lock") = analysed_report();

        let (status, body) = get_json(report, "/api/best").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["run_nr"], 2);
    }
}
