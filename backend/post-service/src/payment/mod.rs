/// Payment gateway integration for post donations
pub mod zalopay;

use async_trait::async_trait;

use crate::error::Result;

pub use zalopay::{
    CallbackData, CreateOrderResponse, DonationItem, QueryOrderResponse, ZaloPayClient,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open a payment order. Fails unless the gateway accepted it.
    async fn create_order(&self, item: DonationItem) -> Result<CreateOrderResponse>;

    /// Current status of an order.
    async fn query_order(&self, app_trans_id: String) -> Result<QueryOrderResponse>;

    /// Check a callback body against the MAC the gateway sent with it.
    fn verify_callback(&self, data: &str, mac: &str) -> bool;
}
