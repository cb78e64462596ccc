use serde::Deserialize;

use super::repo::{NewProduct, ProductStatus};
use crate::{
    error::AppError,
    store::{Document, ID_FIELD},
    validate::{normalize_email, require_non_empty},
};

/// Request body for `POST /addproducts`; unknown fields are kept as listing data.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub seller_email: String,
    pub brand: String,
    #[serde(flatten)]
    pub listing: Document,
}

impl CreateProductRequest {
    pub fn validate(mut self) -> Result<NewProduct, AppError> {
        // server-owned fields
        for key in [ID_FIELD, "status", "ads"] {
            self.listing.remove(key);
        }
        Ok(NewProduct {
            seller_email: normalize_email(&self.seller_email)?,
            brand: require_non_empty("brand", &self.brand)?,
            status: ProductStatus::Available,
            ads: false,
            listing: self.listing,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct BrandQuery {
    pub brand: String,
}
