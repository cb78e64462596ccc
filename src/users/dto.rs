use serde::{Deserialize, Serialize};

use super::repo::{GoogleProfile, NewUser, UserType};
use crate::{error::AppError, validate::normalize_email};

/// Request body for `POST /users`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub email: String,
    pub name: Option<String>,
    pub user_type: UserType,
    pub image: Option<String>,
}

impl CreateUserRequest {
    pub fn validate(self) -> Result<NewUser, AppError> {
        Ok(NewUser {
            email: normalize_email(&self.email)?,
            name: non_blank(self.name),
            user_type: self.user_type,
            verified: false,
            image: non_blank(self.image),
        })
    }
}

/// Request body for `PUT /googleuser/:email`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleUserRequest {
    pub name: Option<String>,
    #[serde(alias = "photoURL")]
    pub image: Option<String>,
}

impl GoogleUserRequest {
    /// An empty body means "no profile update".
    pub fn from_body(body: &[u8]) -> Result<Self, AppError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
            .map_err(|e| AppError::Validation(format!("invalid profile body: {e}")))
    }
}

impl From<GoogleUserRequest> for GoogleProfile {
    fn from(r: GoogleUserRequest) -> Self {
        GoogleProfile {
            name: non_blank(r.name),
            image: non_blank(r.image),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTypeQuery {
    pub user_type: Option<UserType>,
}

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStatus {
    pub is_admin: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerStatus {
    pub is_buyer: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerStatus {
    pub is_seller: bool,
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
