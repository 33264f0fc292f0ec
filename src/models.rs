use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: String,
    pub date: String,
    pub time: Option<String>,
    pub image: String,
    pub venue: Option<String>,
    pub status: Option<String>,
    pub age_rating: Option<u32>,
    pub poster_original: Option<String>,
    pub poster_small: Option<String>,
    pub widget_available: bool,
    pub purchase_url: Option<String>,
    pub raw_date: Option<DateTime<Utc>>,
    pub has_specific_time: bool,
    pub has_price: bool,
    pub event_timestamp: Option<i64>,
    #[serde(default)]
    pub ticket_types: Vec<TicketType>,
}

impl Event {
    pub fn min_price(&self) -> Option<i64> {
        self.ticket_types.iter().filter_map(|t| t.price).min()
    }

    pub fn price_label(&self) -> Option<String> {
        self.min_price().map(|price| format!("от {price}₽"))
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TicketType {
    pub id: String,
    pub name: String,
    pub price: Option<i64>,
    pub available: u32,
    pub total: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ProductVariant {
    pub id: String,
    pub name: String,
    pub price: i64,
    #[serde(rename = "inStock")]
    pub in_stock: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: String,
    pub images: Vec<String>,
    pub variants: Vec<ProductVariant>,
    pub tags: Vec<String>,
}

impl Product {
    pub fn variant(&self, variant_id: &str) -> Option<&ProductVariant> {
        self.variants.iter().find(|v| v.id == variant_id)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CartItem {
    pub product: Product,
    pub variant: ProductVariant,
    pub quantity: u32,
}

impl CartItem {
    pub fn line_total(&self) -> i64 {
        self.variant.price.saturating_mul(i64::from(self.quantity))
    }

    pub fn matches(&self, product_id: &str, variant_id: &str) -> bool {
        self.product.id == product_id && self.variant.id == variant_id
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    Percent,
    Fixed,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Coupon {
    pub code: String,
    #[serde(rename = "discountType")]
    pub discount_type: DiscountType,
    pub value: i64,
    #[serde(rename = "minAmount", default, skip_serializing_if = "Option::is_none")]
    pub min_amount: Option<i64>,
}
