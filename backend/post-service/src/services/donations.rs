//! Donations to posts, paid through the payment gateway
//!
//! A donation row is written either when the gateway calls back with a signed
//! confirmation or when the client polls the order status and the gateway
//! reports success. Both paths key the row by `app_trans_id`, so whichever
//! arrives second is a no-op.

use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::db::donation_repo;
use crate::error::{AppError, Result};
use crate::models::{Donation, DonationWithDonor, PageMeta, PageOptions, Paged};
use crate::payment::{CallbackData, CreateOrderResponse, DonationItem, PaymentGateway};

/// Body returned to the gateway's callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallbackResult {
    pub return_code: i32,
    pub return_message: String,
}

impl CallbackResult {
    fn new(return_code: i32, return_message: impl Into<String>) -> Self {
        Self {
            return_code,
            return_message: return_message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewayDetails {
    pub return_code: i32,
    pub return_message: String,
}

/// Outcome of an order status check.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentStatus {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub donation: Option<Donation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<GatewayDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct DonationService {
    pool: PgPool,
    gateway: Arc<dyn PaymentGateway>,
    default_take: i64,
}

impl DonationService {
    pub fn new(pool: PgPool, gateway: Arc<dyn PaymentGateway>, default_take: i64) -> Self {
        Self {
            pool,
            gateway,
            default_take,
        }
    }

    pub fn page_options(&self, page: i32, take: i32) -> Result<PageOptions> {
        PageOptions::from_request(page, take, self.default_take)
    }

    pub async fn list_donations(
        &self,
        options: PageOptions,
        post_id: Option<Uuid>,
    ) -> Result<Paged<DonationWithDonor>> {
        let (data, total) = tokio::try_join!(
            donation_repo::list_donations(&self.pool, post_id, options.take, options.skip()),
            donation_repo::count_donations(&self.pool, post_id),
        )?;

        Ok(Paged {
            data,
            meta: PageMeta::new(options, total),
        })
    }

    /// Open a payment order for a donation.
    pub async fn create_donation(&self, item: DonationItem) -> Result<CreateOrderResponse> {
        if item.amount <= 0 {
            return Err(AppError::Validation("Invalid amount for donation".into()));
        }

        let order = self.gateway.create_order(item.clone()).await?;
        info!(
            app_trans_id = %order.app_trans_id,
            post_id = %item.post_id,
            amount = item.amount,
            "Donation order created"
        );
        Ok(order)
    }

    /// Handle the gateway's payment confirmation.
    ///
    /// Never fails: problems are reported to the gateway through the return code.
    pub async fn handle_callback(&self, data: &str, mac: &str) -> CallbackResult {
        if !self.gateway.verify_callback(data, mac) {
            warn!("Rejected payment callback with invalid MAC");
            return CallbackResult::new(-1, "MAC not equal");
        }

        match self.record_callback(data).await {
            Ok(()) => CallbackResult::new(1, "success"),
            Err(e) => {
                error!(error = %e, "Failed to process payment callback");
                CallbackResult::new(0, e.to_string())
            }
        }
    }

    async fn record_callback(&self, data: &str) -> Result<()> {
        let callback = CallbackData::parse(data)?;
        let item = callback.first_item()?;
        if item.amount <= 0 {
            return Err(AppError::Validation("Invalid donation data".into()));
        }

        let inserted = donation_repo::insert_donation(
            &self.pool,
            item.post_id,
            item.user_id,
            item.amount,
            callback.app_trans_id.as_deref(),
        )
        .await?;

        match inserted {
            Some(donation) => {
                info!(donation_id = %donation.id, post_id = %item.post_id, "Donation recorded")
            }
            None => info!(app_trans_id = ?callback.app_trans_id, "Donation already recorded"),
        }
        Ok(())
    }

    /// Ask the gateway about an order and record the donation once it is paid.
    pub async fn query_payment(&self, app_trans_id: &str, item: DonationItem) -> PaymentStatus {
        match self.confirm_payment(app_trans_id, item).await {
            Ok(status) => status,
            Err(e) => {
                error!(app_trans_id = %app_trans_id, error = %e, "Error querying payment");
                PaymentStatus {
                    message: "Error querying payment".into(),
                    donation: None,
                    details: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn confirm_payment(
        &self,
        app_trans_id: &str,
        item: DonationItem,
    ) -> Result<PaymentStatus> {
        let response = self.gateway.query_order(app_trans_id.to_string()).await?;
        let paid_amount = response.amount;
        let details = GatewayDetails {
            return_code: response.return_code,
            return_message: if response.return_message.is_empty() {
                "Unknown error".into()
            } else {
                response.return_message
            },
        };

        if details.return_code != 1 {
            warn!(
                app_trans_id = %app_trans_id,
                return_code = details.return_code,
                return_message = %details.return_message,
                "Payment query did not succeed"
            );
            return Ok(PaymentStatus {
                message: "Payment not completed".into(),
                donation: None,
                details: Some(details),
                error: None,
            });
        }

        // The gateway's amount is authoritative over the query string
        if paid_amount != item.amount {
            warn!(
                app_trans_id = %app_trans_id,
                paid_amount,
                requested_amount = item.amount,
                "Payment amount does not match the donation request"
            );
            return Ok(PaymentStatus {
                message: "Payment amount mismatch".into(),
                donation: None,
                details: Some(details),
                error: Some(format!(
                    "gateway reports {} but {} was requested",
                    paid_amount, item.amount
                )),
            });
        }

        let existing = donation_repo::find_by_app_trans_id(&self.pool, app_trans_id).await?;
        if let Some(existing) = existing {
            return Ok(PaymentStatus {
                message: "Donation record already exists".into(),
                donation: Some(existing),
                details: Some(details),
                error: None,
            });
        }

        let inserted = donation_repo::insert_donation(
            &self.pool,
            item.post_id,
            item.user_id,
            item.amount,
            Some(app_trans_id),
        )
        .await?;

        // The callback may have landed between the lookup and the insert
        let (message, donation) = match inserted {
            Some(donation) => ("Donation record created successfully", Some(donation)),
            None => (
                "Donation record already exists",
                donation_repo::find_by_app_trans_id(&self.pool, app_trans_id).await?,
            ),
        };

        Ok(PaymentStatus {
            message: message.into(),
            donation,
            details: Some(details),
            error: None,
        })
    }
}
