use serde::Serialize;
use thiserror::Error;

use crate::models::{CartItem, Coupon, DiscountType, Product};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponError {
    #[error("Неверный промокод")]
    Invalid,
    #[error("Минимальная сумма заказа: {min_amount}₽")]
    BelowMinimum { min_amount: i64 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub subtotal: i64,
    pub discount: i64,
    pub total: i64,
}

pub fn subtotal(items: &[CartItem]) -> i64 {
    items
        .iter()
        .map(CartItem::line_total)
        .fold(0, i64::saturating_add)
}

pub fn find_coupon<'a>(coupons: &'a [Coupon], code: &str) -> Option<&'a Coupon> {
    let wanted = code.trim().to_uppercase();
    if wanted.is_empty() {
        return None;
    }
    coupons.iter().find(|c| c.code.to_uppercase() == wanted)
}

/// Discount a coupon grants on `subtotal`, clamped so the total never goes negative.
pub fn discount_for(coupon: &Coupon, subtotal: i64) -> Result<i64, CouponError> {
    if let Some(min_amount) = coupon.min_amount {
        if subtotal < min_amount {
            return Err(CouponError::BelowMinimum { min_amount });
        }
    }
    let raw = match coupon.discount_type {
        // Rounds half up on whole roubles.
        DiscountType::Percent => subtotal
            .saturating_mul(coupon.value)
            .saturating_add(50)
            .div_euclid(100),
        DiscountType::Fixed => coupon.value,
    };
    Ok(raw.clamp(0, subtotal.max(0)))
}

pub fn compute_total(items: &[CartItem], coupon: Option<&Coupon>) -> Result<Totals, CouponError> {
    let subtotal = subtotal(items);
    let discount = match coupon {
        Some(coupon) => discount_for(coupon, subtotal)?,
        None => 0,
    };
    Ok(Totals {
        subtotal,
        discount,
        total: subtotal - discount,
    })
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cart {
    items: Vec<CartItem>,
    coupon: Option<Coupon>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: Vec<CartItem>) -> Self {
        let items = items
            .into_iter()
            .map(|mut item| {
                item.quantity = item.quantity.max(1);
                item
            })
            .collect();
        Self { items, coupon: None }
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .map(|item| item.quantity)
            .fold(0, u32::saturating_add)
    }

    pub fn applied_coupon(&self) -> Option<&Coupon> {
        self.coupon.as_ref()
    }

    pub fn add(&mut self, product: &Product, variant_id: &str) -> bool {
        let Some(variant) = product.variant(variant_id) else {
            return false;
        };
        match self
            .items
            .iter_mut()
            .find(|item| item.matches(&product.id, &variant.id))
        {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(1),
            None => self.items.push(CartItem {
                product: product.clone(),
                variant: variant.clone(),
                quantity: 1,
            }),
        }
        self.revalidate_coupon();
        true
    }

    pub fn update_quantity(&mut self, product_id: &str, variant_id: &str, delta: i64) {
        for item in self
            .items
            .iter_mut()
            .filter(|item| item.matches(product_id, variant_id))
        {
            let next = (i64::from(item.quantity) + delta).clamp(1, i64::from(u32::MAX));
            item.quantity = u32::try_from(next).unwrap_or(u32::MAX);
        }
        self.revalidate_coupon();
    }

    pub fn remove(&mut self, product_id: &str, variant_id: &str) {
        self.items
            .retain(|item| !item.matches(product_id, variant_id));
        self.revalidate_coupon();
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.coupon = None;
    }

    pub fn apply_coupon(&mut self, coupons: &[Coupon], code: &str) -> Result<Totals, CouponError> {
        let coupon = find_coupon(coupons, code).ok_or(CouponError::Invalid)?;
        let totals = compute_total(&self.items, Some(coupon))?;
        self.coupon = Some(coupon.clone());
        Ok(totals)
    }

    pub fn remove_coupon(&mut self) {
        self.coupon = None;
    }

    pub fn totals(&self) -> Totals {
        compute_total(&self.items, self.coupon.as_ref())
            .or_else(|_| compute_total(&self.items, None))
            .unwrap_or_default()
    }

    fn revalidate_coupon(&mut self) {
        if let Some(coupon) = &self.coupon {
            if discount_for(coupon, subtotal(&self.items)).is_err() {
                self.coupon = None;
            }
        }
    }
}
