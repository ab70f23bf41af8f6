//! Payment method registry.
//!
//! The registry maps a payment-method id to a tag and an active flag. The
//! settlement engine only distinguishes the `wallet` tag (internal balance
//! debit) and the `cash` tag; every other tag names an external gateway the
//! caller must drive out-of-band.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EngineError;

/// Classified payment-method tag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentTag {
    Wallet,
    Cash,
    /// External gateway identified by its catalog tag (`stripe`, `paypal`, ...).
    Gateway(String),
}

impl PaymentTag {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Wallet => "wallet",
            Self::Cash => "cash",
            Self::Gateway(tag) => tag.as_str(),
        }
    }

    pub fn is_wallet(&self) -> bool {
        matches!(self, Self::Wallet)
    }
}

impl From<&str> for PaymentTag {
    fn from(value: &str) -> Self {
        match value {
            "wallet" => Self::Wallet,
            "cash" => Self::Cash,
            other => Self::Gateway(other.to_string()),
        }
    }
}

/// A payment method known to the platform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentMethod {
    pub id: Uuid,
    pub tag: PaymentTag,
    pub active: bool,
    /// Input ordering in the client UI.
    pub position: i32,
}

/// Default catalog, in UI order.
///
/// Mirrors the platform seed list; reseeding keeps existing rows and their
/// active flags and only fills in what is missing.
pub(crate) const DEFAULT_METHODS: &[&str] = &[
    "cash",
    "wallet",
    "stripe",
    "paypal",
    "paystack",
    "razorpay",
    "flutterwave",
    "mercado-pago",
    "mollie",
];

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub tag: String,
    pub active: bool,
    pub position: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&PaymentMethod> for ActiveModel {
    fn from(method: &PaymentMethod) -> Self {
        Self {
            id: ActiveValue::Set(method.id.to_string()),
            tag: ActiveValue::Set(method.tag.as_str().to_string()),
            active: ActiveValue::Set(method.active),
            position: ActiveValue::Set(method.position),
        }
    }
}

impl TryFrom<Model> for PaymentMethod {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::PaymentMethodNotFound(model.id.clone()))?,
            tag: PaymentTag::from(model.tag.as_str()),
            active: model.active,
            position: model.position,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_classification() {
        assert_eq!(PaymentTag::from("wallet"), PaymentTag::Wallet);
        assert_eq!(PaymentTag::from("cash"), PaymentTag::Cash);
        assert_eq!(
            PaymentTag::from("stripe"),
            PaymentTag::Gateway("stripe".to_string())
        );
        assert!(PaymentTag::from("wallet").is_wallet());
        assert!(!PaymentTag::from("stripe").is_wallet());
    }

    #[test]
    fn default_catalog_contains_core_tags() {
        assert!(DEFAULT_METHODS.contains(&"wallet"));
        assert!(DEFAULT_METHODS.contains(&"cash"));
    }
}
