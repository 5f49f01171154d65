//! Purchase decision for shop items.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::domain::DomainError;
use crate::models::{shop_item, user_purchase};

/// Purchase record to be written once the decision is accepted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPurchase {
    pub shop_item_id: i32,
    pub purchase_date: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchaseOutcome {
    pub new_balance: i64,
    pub purchase: NewPurchase,
}

/// Decide whether `item` can be bought with `balance`.
///
/// `owned` holds the user's purchases of any item; only those for `item`
/// matter. Permanent items conflict with any active prior purchase;
/// temporary items can always be bought again.
pub fn attempt_purchase(
    balance: i64,
    item: &shop_item::Model,
    owned: &[user_purchase::Model],
    now: DateTime<Utc>,
) -> Result<PurchaseOutcome, DomainError> {
    if !item.is_available {
        return Err(DomainError::NotFound);
    }

    if item.is_permanent()
        && owned
            .iter()
            .any(|p| p.shop_item_id == item.id && p.is_active)
    {
        return Err(DomainError::AlreadyOwned);
    }

    if balance < item.price_points {
        return Err(DomainError::InsufficientFunds);
    }

    let expires_at = item
        .duration_days
        .map(|days| now + Duration::days(i64::from(days)));

    Ok(PurchaseOutcome {
        new_balance: balance - item.price_points,
        purchase: NewPurchase {
            shop_item_id: item.id,
            purchase_date: now,
            expires_at,
        },
    })
}

pub fn cart_total(lines: &[(&shop_item::Model, u32)]) -> i64 {
    lines
        .iter()
        .map(|(item, quantity)| item.price_points * i64::from(*quantity))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Rarity, ShopCategory};

    fn item(id: i32, price: i64, duration_days: Option<i32>) -> shop_item::Model {
        shop_item::Model {
            id,
            name: format!("item {}", id),
            description: String::new(),
            category: ShopCategory::Feature,
            price_points: price,
            icon: "🎁".to_string(),
            rarity: Rarity::Common,
            is_available: true,
            effect_type: None,
            effect_value: None,
            duration_days,
            created_at: String::new(),
        }
    }

    fn owned(outcome: &PurchaseOutcome, id: i32) -> user_purchase::Model {
        user_purchase::Model {
            id,
            user_id: 1,
            shop_item_id: outcome.purchase.shop_item_id,
            purchase_date: outcome.purchase.purchase_date,
            is_active: true,
            expires_at: outcome.purchase.expires_at,
        }
    }

    #[test]
    fn insufficient_funds_leaves_balance() {
        let result = attempt_purchase(250, &item(1, 300, None), &[], Utc::now());
        assert_eq!(result, Err(DomainError::InsufficientFunds));
    }

    #[test]
    fn permanent_item_bought_once() {
        let now = Utc::now();
        let theme = item(3, 250, None);

        let first = attempt_purchase(1000, &theme, &[], now).unwrap();
        assert_eq!(first.new_balance, 750);
        assert_eq!(first.purchase.expires_at, None);

        let second = attempt_purchase(first.new_balance, &theme, &[owned(&first, 1)], now);
        assert_eq!(second, Err(DomainError::AlreadyOwned));
    }

    #[test]
    fn temporary_item_expires_after_duration() {
        let now = Utc::now();
        let boost = item(2, 300, Some(7));

        let outcome = attempt_purchase(300, &boost, &[], now).unwrap();
        assert_eq!(outcome.new_balance, 0);
        assert_eq!(outcome.purchase.expires_at, Some(now + Duration::days(7)));
    }

    #[test]
    fn temporary_item_can_be_bought_again() {
        let now = Utc::now();
        let boost = item(2, 100, Some(3));
        let first = attempt_purchase(500, &boost, &[], now).unwrap();
        let again = attempt_purchase(first.new_balance, &boost, &[owned(&first, 1)], now);
        assert_eq!(again.map(|o| o.new_balance), Ok(300));
    }

    #[test]
    fn unavailable_item_is_not_found() {
        let mut hidden = item(4, 10, None);
        hidden.is_available = false;
        assert_eq!(
            attempt_purchase(100, &hidden, &[], Utc::now()),
            Err(DomainError::NotFound)
        );
    }

    #[test]
    fn cart_total_multiplies_quantities() {
        let a = item(1, 700, None);
        let b = item(2, 150, Some(3));
        assert_eq!(cart_total(&[(&a, 1), (&b, 2)]), 1000);
        assert_eq!(cart_total(&[]), 0);
    }
}
