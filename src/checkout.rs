//! Order creation from the cart and the checkout result page.

use log::{info, warn};
use reqwest::Url;
use serde_json::Value;

use crate::api::ApiClient;
use crate::error::Result;
use crate::models::{OrderLine, OrderRequest};
use crate::shop::{CartPage, Storefront};

pub const PAYMENT_METHOD: &str = "paypal";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderOutcome {
    /// Nothing to order.
    EmptyCart,
    /// The payment provider wants the browser sent here.
    Redirect(String),
    Completed,
}

fn approval_url(response: &Value) -> Option<String> {
    response
        .pointer("/data/approvalUrl")
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
        .or_else(|| {
            response
                .get("approvalUrl")
                .and_then(Value::as_str)
                .filter(|url| !url.is_empty())
        })
        .map(str::to_string)
}

pub fn order_request(shop: &Storefront) -> OrderRequest {
    let books = shop
        .cart()
        .items()
        .into_iter()
        .map(|item| OrderLine {
            price: item.unit_price(),
            book: item.product_id,
            quantity: item.quantity,
        })
        .collect();

    OrderRequest {
        books,
        total_price: shop.cart().total_price(),
        payment_method: PAYMENT_METHOD.to_string(),
    }
}

pub async fn create_order(shop: &Storefront) -> Result<OrderOutcome> {
    let order = order_request(shop);
    if order.books.is_empty() {
        return Ok(OrderOutcome::EmptyCart);
    }
    let token = shop.require_token()?;

    let response = shop.notifications().report(
        shop.api().create_test_order(&token, &order).await,
        "Failed to create order",
    )?;

    match approval_url(&response) {
        Some(url) => {
            info!("order created, redirecting to payment approval");
            Ok(OrderOutcome::Redirect(url))
        }
        None => {
            info!("order created");
            shop.cart().refetch().await;
            Ok(OrderOutcome::Completed)
        }
    }
}

impl CartPage {
    pub async fn checkout(&self) -> Result<OrderOutcome> {
        create_order(self.storefront()).await
    }
}

/// Query parameters the payment provider appends when sending the user back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutParams {
    pub mock: bool,
    pub trx: String,
    pub token: String,
}

impl CheckoutParams {
    /// Accepts a full URL, a path with a query, or a bare query string.
    pub fn parse(location: &str) -> CheckoutParams {
        let location = if location.contains('?') || location.contains("://") {
            location.to_string()
        } else {
            format!("?{}", location)
        };
        let url = match Url::parse("http://localhost/").and_then(|base| base.join(&location)) {
            Ok(url) => url,
            Err(e) => {
                warn!("unreadable checkout location {:?}: {}", location, e);
                return CheckoutParams::default();
            }
        };

        let mut params = CheckoutParams::default();
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "mock" => params.mock = value == "true",
                "trx" => params.trx = value.into_owned(),
                "token" => params.token = value.into_owned(),
                _ => {}
            }
        }
        params
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutStatus {
    Idle,
    Processing,
    Success(String),
    Error(String),
}

pub async fn complete_checkout(api: &ApiClient, params: &CheckoutParams) -> CheckoutStatus {
    if params.mock {
        return CheckoutStatus::Success(format!(
            "Payment simulated. Transaction ref: {}",
            params.trx
        ));
    }
    if params.token.is_empty() {
        return CheckoutStatus::Error("Missing payment token".to_string());
    }

    match api.confirm_payment(&params.token).await {
        Ok(response) if response.success => CheckoutStatus::Success(
            response
                .message
                .unwrap_or_else(|| "Payment captured successfully".to_string()),
        ),
        Ok(response) => CheckoutStatus::Error(
            response
                .message
                .unwrap_or_else(|| "Capture response not successful".to_string()),
        ),
        Err(e) => {
            warn!("payment capture failed: {}", e);
            CheckoutStatus::Error(e.user_message_or("Capture failed"))
        }
    }
}
