//! Prometheus metrics for post-service.
//!
//! Exposes feed and gRPC collectors and an HTTP handler for the `/metrics` endpoint.

use actix_web::HttpResponse;
use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, Encoder, IntCounterVec, TextEncoder};

pub mod feed;

lazy_static! {
    /// gRPC calls handled, by method and status code.
    pub static ref GRPC_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "post_service_grpc_requests_total",
        "gRPC requests handled segmented by method and status code",
        &["method", "code"]
    )
    .expect("failed to register post_service_grpc_requests_total");
}

/// Record the outcome of one gRPC call.
pub fn record_grpc(method: &str, code: tonic::Code) {
    GRPC_REQUESTS_TOTAL
        .with_label_values(&[method, &format!("{:?}", code)])
        .inc();
}

/// Actix handler that renders Prometheus metrics in text format.
pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
