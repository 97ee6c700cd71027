use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::error::Result;
use crate::payment::DonationItem;
use crate::services::DonationService;

/// Body the gateway posts to the callback URL.
#[derive(Debug, Deserialize)]
pub struct CallbackBody {
    pub data: String,
    pub mac: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusQuery {
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub amount: i64,
}

/// POST /donation/payment
pub async fn create_payment(
    service: web::Data<DonationService>,
    body: web::Json<DonationItem>,
) -> Result<HttpResponse> {
    let order = service.create_donation(body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(order))
}

/// POST /donation/callback
pub async fn payment_callback(
    service: web::Data<DonationService>,
    body: web::Json<CallbackBody>,
) -> HttpResponse {
    let body = body.into_inner();
    let result = service.handle_callback(&body.data, &body.mac).await;
    info!(return_code = result.return_code, "Handled payment callback");
    HttpResponse::Ok().json(result)
}

/// GET /donation/order-status/{app_trans_id}?postId=&userId=&amount=
pub async fn order_status(
    service: web::Data<DonationService>,
    path: web::Path<String>,
    query: web::Query<OrderStatusQuery>,
) -> HttpResponse {
    let app_trans_id = path.into_inner();
    let query = query.into_inner();
    let item = DonationItem {
        post_id: query.post_id,
        user_id: query.user_id,
        amount: query.amount,
    };

    HttpResponse::Ok().json(service.query_payment(&app_trans_id, item).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::{MockPaymentGateway, QueryOrderResponse};
    use actix_web::{test, App};
    use sqlx::PgPool;
    use std::sync::Arc;

    fn data(gateway: MockPaymentGateway) -> web::Data<DonationService> {
        let pool = PgPool::connect_lazy("postgres://localhost/post_service_test").unwrap();
        web::Data::new(DonationService::new(pool, Arc::new(gateway), 10))
    }

    #[actix_web::test]
    async fn test_callback_rejects_bad_mac() {
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_verify_callback().return_const(false);

        let app = test::init_service(
            App::new()
                .app_data(data(gateway))
                .route("/donation/callback", web::post().to(payment_callback)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/donation/callback")
            .set_json(serde_json::json!({ "data": "{}", "mac": "nope" }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["return_code"], -1);
        assert_eq!(body["return_message"], "MAC not equal");
    }

    #[actix_web::test]
    async fn test_payment_rejects_zero_amount() {
        let app = test::init_service(
            App::new()
                .app_data(data(MockPaymentGateway::new()))
                .route("/donation/payment", web::post().to(create_payment)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/donation/payment")
            .set_json(serde_json::json!({
                "postId": Uuid::new_v4(),
                "userId": Uuid::new_v4(),
                "amount": 0
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_order_status_not_completed() {
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_query_order().returning(|_| {
            Ok(QueryOrderResponse {
                return_code: 2,
                return_message: "Giao dịch thất bại".into(),
                ..Default::default()
            })
        });

        let app = test::init_service(
            App::new()
                .app_data(data(gateway))
                .route("/donation/order-status/{app_trans_id}", web::get().to(order_status)),
        )
        .await;

        let uri = format!(
            "/donation/order-status/240601_5?postId={}&userId={}&amount=5000",
            Uuid::new_v4(),
            Uuid::new_v4()
        );
        let req = test::TestRequest::get().uri(&uri).to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["message"], "Payment not completed");
        assert_eq!(body["details"]["return_code"], 2);
    }
}
