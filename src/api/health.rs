use crate::api::MgmtState;
use crate::api::schemas::health::HealthResponse;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

pub async fn livez() -> impl IntoResponse {
    StatusCode::OK
}

/// Readiness: the database must answer and an enabled realtime transport must respond.
pub async fn readyz(State(state): State<MgmtState>) -> impl IntoResponse {
    let (db_res, realtime_res) =
        tokio::join!(state.health_service.check_db(), state.health_service.check_realtime());

    let mut status_code = StatusCode::OK;
    let mut component_status = |component: &str, res: Result<(), String>| {
        if let Err(e) = res {
            tracing::warn!(error = %e, component, "Readiness probe failed");
            status_code = StatusCode::SERVICE_UNAVAILABLE;
            "error"
        } else {
            "ok"
        }
    };

    let database = component_status("database", db_res);
    let realtime = component_status("realtime", realtime_res);

    let response = HealthResponse {
        status: if status_code == StatusCode::OK { "ok" } else { "error" }.to_string(),
        database: database.to_string(),
        realtime: realtime.to_string(),
    };

    (status_code, Json(response))
}
