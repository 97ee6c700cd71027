/// HTTP handlers for post-service
///
/// Most traffic arrives over gRPC. HTTP carries what cannot:
/// - Health probes for the orchestrator
/// - Payment gateway redirects and server-to-server callbacks
pub mod donations;
pub mod health;

use actix_web::web;

pub use donations::{create_payment, order_status, payment_callback};
pub use health::{health_check, liveness_check};

/// Register every HTTP route except `/metrics`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/health")
            .route("", web::get().to(health_check))
            .route("/live", web::get().to(liveness_check)),
    )
    .service(
        web::scope("/donation")
            .route("/payment", web::post().to(create_payment))
            .route("/callback", web::post().to(payment_callback))
            .route("/order-status/{app_trans_id}", web::get().to(order_status)),
    );
}
