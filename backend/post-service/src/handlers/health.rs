use actix_web::{web, HttpResponse, Responder};
use serde::Serialize;
use sqlx::PgPool;
use std::time::Instant;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    database: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    latency_ms: Option<u64>,
}

/// Readiness: the service is up and can reach PostgreSQL
pub async fn health_check(pool: web::Data<PgPool>) -> impl Responder {
    let start = Instant::now();
    let reachable = sqlx::query("SELECT 1").fetch_one(pool.get_ref()).await.is_ok();
    let latency_ms = Some(start.elapsed().as_millis() as u64);

    if reachable {
        HttpResponse::Ok().json(HealthResponse {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
            database: "healthy",
            latency_ms,
        })
    } else {
        HttpResponse::ServiceUnavailable().json(HealthResponse {
            status: "degraded",
            version: env!("CARGO_PKG_VERSION"),
            database: "unhealthy",
            latency_ms,
        })
    }
}

/// Liveness: the process is serving HTTP
pub async fn liveness_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "status": "alive" }))
}
