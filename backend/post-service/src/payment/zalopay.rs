// ZaloPay v2 gateway client
// Orders are signed with key1; callbacks from the gateway are signed with key2.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Offset, Utc};
use hmac::{Hmac, Mac};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use super::PaymentGateway;
use crate::config::ZaloPayConfig;
use crate::error::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

/// ZaloPay transaction ids carry the order date in Vietnam time (UTC+7).
const GATEWAY_UTC_OFFSET_SECS: i32 = 7 * 3600;

/// Hex-encoded HMAC-SHA256 of `data` under `key`.
pub fn hmac_sha256_hex(key: &str, data: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(key.as_bytes())
        .map_err(|e| AppError::Internal(format!("HMAC init failed: {}", e)))?;
    mac.update(data.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// `YYMMDD_<n>` with the date taken in gateway local time.
pub fn app_trans_id(now: DateTime<Utc>, trans_no: u32) -> String {
    let offset = FixedOffset::east_opt(GATEWAY_UTC_OFFSET_SECS).unwrap_or_else(|| Utc.fix());
    format!("{}_{}", now.with_timezone(&offset).format("%y%m%d"), trans_no)
}

/// One line of the order's `item` field; echoed back in the callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationItem {
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize)]
struct EmbedData {
    redirecturl: String,
}

/// Form fields of a create-order call.
#[derive(Debug, Clone, Serialize)]
pub struct OrderRequest {
    pub app_id: String,
    pub app_trans_id: String,
    pub app_user: String,
    pub app_time: i64,
    pub item: String,
    pub embed_data: String,
    pub amount: i64,
    pub description: String,
    pub bank_code: String,
    pub callback_url: String,
    pub mac: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateOrderResponse {
    pub return_code: i32,
    pub return_message: String,
    pub sub_return_code: i32,
    pub sub_return_message: String,
    pub zp_trans_token: String,
    pub order_url: String,
    pub order_token: String,
    /// Filled in locally; the gateway does not echo it.
    pub app_trans_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryOrderResponse {
    pub return_code: i32,
    pub return_message: String,
    pub sub_return_code: i32,
    pub sub_return_message: String,
    pub is_processing: bool,
    pub amount: i64,
    pub zp_trans_id: i64,
}

#[derive(Debug, Clone, Serialize)]
struct QueryOrderRequest<'a> {
    app_id: &'a str,
    app_trans_id: &'a str,
    mac: String,
}

/// The JSON document carried in a callback's `data` field.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackData {
    #[serde(default)]
    pub app_trans_id: Option<String>,
    /// JSON-encoded list of `DonationItem`.
    pub item: String,
}

impl CallbackData {
    pub fn parse(data: &str) -> Result<Self> {
        serde_json::from_str(data)
            .map_err(|e| AppError::Validation(format!("Invalid callback data: {}", e)))
    }

    pub fn first_item(&self) -> Result<DonationItem> {
        let items: Vec<DonationItem> = serde_json::from_str(&self.item)
            .map_err(|e| AppError::Validation(format!("Invalid donation data: {}", e)))?;
        items
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Validation("Invalid donation data".into()))
    }
}

#[derive(Clone)]
pub struct ZaloPayClient {
    http: reqwest::Client,
    config: ZaloPayConfig,
}

impl ZaloPayClient {
    pub fn new(config: ZaloPayConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Assemble and sign an order. Pure apart from the inputs given.
    pub fn build_order(
        &self,
        item: &DonationItem,
        now: DateTime<Utc>,
        trans_no: u32,
    ) -> Result<OrderRequest> {
        if item.amount <= 0 {
            return Err(AppError::Validation("Invalid amount for donation".into()));
        }

        let app_trans_id = app_trans_id(now, trans_no);
        let embed_data = serde_json::to_string(&EmbedData {
            redirecturl: format!(
                "{}/zalo/status?app_trans_id={}&userId={}&postId={}&amount={}",
                self.config.redirect_url.trim_end_matches('/'),
                app_trans_id,
                item.user_id,
                item.post_id,
                item.amount
            ),
        })?;
        let items = serde_json::to_string(&[item])?;
        let app_user = item.user_id.to_string();
        let app_time = now.timestamp_millis();

        let signed = format!(
            "{}|{}|{}|{}|{}|{}|{}",
            self.config.app_id, app_trans_id, app_user, item.amount, app_time, embed_data, items
        );
        let mac = hmac_sha256_hex(&self.config.key1, &signed)?;

        Ok(OrderRequest {
            app_id: self.config.app_id.clone(),
            app_trans_id,
            app_user,
            app_time,
            item: items,
            embed_data,
            amount: item.amount,
            description: format!("Nova - Donation for post #{}", trans_no),
            bank_code: String::new(),
            callback_url: self.config.callback_url.clone(),
            mac,
        })
    }

    pub fn query_mac(&self, app_trans_id: &str) -> Result<String> {
        let data = format!("{}|{}|{}", self.config.app_id, app_trans_id, self.config.key1);
        hmac_sha256_hex(&self.config.key1, &data)
    }
}

#[async_trait]
impl PaymentGateway for ZaloPayClient {
    async fn create_order(&self, item: DonationItem) -> Result<CreateOrderResponse> {
        let trans_no = rand::thread_rng().gen_range(0..1_000_000u32);
        let order = self.build_order(&item, Utc::now(), trans_no)?;

        let response = self
            .http
            .post(&self.config.create_endpoint)
            .form(&order)
            .send()
            .await
            .map_err(|e| AppError::Payment(format!("create order request failed: {}", e)))?
            .json::<CreateOrderResponse>()
            .await
            .map_err(|e| AppError::Payment(format!("create order request failed: {}", e)))?;

        debug!(
            app_trans_id = %order.app_trans_id,
            return_code = response.return_code,
            "ZaloPay create order response"
        );

        if response.return_code != 1 {
            warn!(
                app_trans_id = %order.app_trans_id,
                return_code = response.return_code,
                return_message = %response.return_message,
                "ZaloPay rejected order"
            );
            return Err(AppError::Payment(response.return_message));
        }

        Ok(CreateOrderResponse {
            app_trans_id: order.app_trans_id,
            ..response
        })
    }

    async fn query_order(&self, app_trans_id: String) -> Result<QueryOrderResponse> {
        let request = QueryOrderRequest {
            app_id: &self.config.app_id,
            app_trans_id: &app_trans_id,
            mac: self.query_mac(&app_trans_id)?,
        };

        self.http
            .post(&self.config.query_endpoint)
            .form(&request)
            .send()
            .await
            .map_err(|e| AppError::Payment(format!("query order request failed: {}", e)))?
            .json::<QueryOrderResponse>()
            .await
            .map_err(|e| AppError::Payment(format!("query order request failed: {}", e)))
    }

    fn verify_callback(&self, data: &str, mac: &str) -> bool {
        match hmac_sha256_hex(&self.config.key2, data) {
            Ok(expected) => expected.eq_ignore_ascii_case(mac.trim()),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn config() -> ZaloPayConfig {
        ZaloPayConfig {
            app_id: "2553".into(),
            key1: "key-one".into(),
            key2: "key-two".into(),
            create_endpoint: "http://localhost/create".into(),
            query_endpoint: "http://localhost/query".into(),
            redirect_url: "http://localhost:3000/".into(),
            callback_url: "http://localhost:8082/donation/callback".into(),
        }
    }

    fn item(amount: i64) -> DonationItem {
        DonationItem {
            post_id: Uuid::nil(),
            user_id: Uuid::nil(),
            amount,
        }
    }

    #[test]
    fn test_hmac_known_vector() {
        // RFC 4231 test case 2
        let mac = hmac_sha256_hex("Jefe", "what do ya want for nothing?").unwrap();
        assert_eq!(
            mac,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_app_trans_id_uses_gateway_date() {
        // 2024-03-31 20:00 UTC is already April 1st in UTC+7
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 20, 0, 0).unwrap();
        assert_eq!(app_trans_id(now, 42), "240401_42");
    }

    #[test]
    fn test_build_order_rejects_non_positive_amount() {
        let client = ZaloPayClient::new(config()).unwrap();
        let err = client.build_order(&item(0), Utc::now(), 1).unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "Invalid amount for donation"));
        assert!(client.build_order(&item(-10), Utc::now(), 1).is_err());
    }

    #[test]
    fn test_build_order_signs_fields() {
        let client = ZaloPayClient::new(config()).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 3, 0, 0).unwrap();
        let order = client.build_order(&item(50_000), now, 123).unwrap();

        assert_eq!(order.app_trans_id, "240601_123");
        assert!(order
            .embed_data
            .contains("http://localhost:3000/zalo/status?app_trans_id=240601_123"));
        let items: Vec<DonationItem> = serde_json::from_str(&order.item).unwrap();
        assert_eq!(items, vec![item(50_000)]);

        let expected = hmac_sha256_hex(
            "key-one",
            &format!(
                "2553|240601_123|{}|50000|{}|{}|{}",
                Uuid::nil(),
                now.timestamp_millis(),
                order.embed_data,
                order.item
            ),
        )
        .unwrap();
        assert_eq!(order.mac, expected);
    }

    #[test]
    fn test_verify_callback() {
        let client = ZaloPayClient::new(config()).unwrap();
        let data = r#"{"app_trans_id":"240601_1","item":"[]"}"#;
        let mac = hmac_sha256_hex("key-two", data).unwrap();

        assert!(client.verify_callback(data, &mac));
        assert!(!client.verify_callback(data, "deadbeef"));
        // Signed with the wrong key
        let wrong = hmac_sha256_hex("key-one", data).unwrap();
        assert!(!client.verify_callback(data, &wrong));
    }

    #[test]
    fn test_callback_data_first_item() {
        let data = format!(
            r#"{{"app_trans_id":"240601_9","item":"[{{\"postId\":\"{}\",\"userId\":\"{}\",\"amount\":1000}}]"}}"#,
            Uuid::nil(),
            Uuid::nil()
        );
        let parsed = CallbackData::parse(&data).unwrap();
        assert_eq!(parsed.app_trans_id.as_deref(), Some("240601_9"));
        assert_eq!(parsed.first_item().unwrap(), item(1000));

        let empty = CallbackData::parse(r#"{"item":"[]"}"#).unwrap();
        assert!(empty.first_item().is_err());
    }
}
