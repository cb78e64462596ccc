use serde::Deserialize;

use super::repo::NewBooking;
use crate::{
    error::AppError,
    store::{Document, ID_FIELD},
    validate::{normalize_email, require_non_empty, require_price},
};

/// Request body for `POST /booking`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub buyer_email: String,
    #[serde(default)]
    pub seller_email: Option<String>,
    pub product_id: String,
    pub price: f64,
    #[serde(flatten)]
    pub extra: Document,
}

impl CreateBookingRequest {
    pub fn validate(mut self) -> Result<NewBooking, AppError> {
        for key in [ID_FIELD, "paid", "transactionId"] {
            self.extra.remove(key);
        }
        let seller_email = match self.seller_email.as_deref().map(str::trim) {
            Some("") | None => None,
            Some(raw) => Some(normalize_email(raw)?),
        };
        Ok(NewBooking {
            buyer_email: normalize_email(&self.buyer_email)?,
            seller_email,
            product_id: require_non_empty("productId", &self.product_id)?,
            price: require_price(self.price)?,
            paid: false,
            extra: self.extra,
        })
    }
}
