//! Shop Service - spending the point balance on catalog items

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sea_orm::*;
use serde::Serialize;

use crate::domain::DomainError;
use crate::models::{shop_item, user_purchase};
use crate::progress::{self, purchase::NewPurchase};

use super::level_service;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchaseView {
    #[serde(flatten)]
    pub purchase: user_purchase::Model,
    pub item: Option<shop_item::Model>,
    /// Active and not expired at read time
    pub is_current: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchaseReceipt {
    pub purchase: user_purchase::Model,
    pub new_balance: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutReceipt {
    pub purchases: Vec<user_purchase::Model>,
    pub total_spent: i64,
    pub new_balance: i64,
}

pub async fn list_items(db: &DatabaseConnection) -> Result<Vec<shop_item::Model>, DomainError> {
    Ok(shop_item::Entity::find()
        .filter(shop_item::Column::IsAvailable.eq(true))
        .order_by_asc(shop_item::Column::PricePoints)
        .order_by_asc(shop_item::Column::Id)
        .all(db)
        .await?)
}

pub async fn list_purchases(
    db: &DatabaseConnection,
    user_id: i32,
    now: DateTime<Utc>,
) -> Result<Vec<PurchaseView>, DomainError> {
    let rows = user_purchase::Entity::find()
        .filter(user_purchase::Column::UserId.eq(user_id))
        .find_also_related(shop_item::Entity)
        .order_by_desc(user_purchase::Column::PurchaseDate)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(purchase, item)| PurchaseView {
            is_current: purchase.is_current(now),
            purchase,
            item,
        })
        .collect())
}

async fn owned_purchases<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
) -> Result<Vec<user_purchase::Model>, DomainError> {
    Ok(user_purchase::Entity::find()
        .filter(user_purchase::Column::UserId.eq(user_id))
        .all(conn)
        .await?)
}

async fn insert_purchase<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    purchase: NewPurchase,
) -> Result<user_purchase::Model, DomainError> {
    let row = user_purchase::ActiveModel {
        user_id: Set(user_id),
        shop_item_id: Set(purchase.shop_item_id),
        purchase_date: Set(purchase.purchase_date),
        is_active: Set(true),
        expires_at: Set(purchase.expires_at),
        ..Default::default()
    };
    Ok(row.insert(conn).await?)
}

/// Buy one item. Balance and purchase list are read, decided on and
/// written in one transaction.
pub async fn purchase_item(
    db: &DatabaseConnection,
    user_id: i32,
    item_id: i32,
    now: DateTime<Utc>,
) -> Result<PurchaseReceipt, DomainError> {
    let txn = db.begin().await?;

    let level = level_service::get_or_create(&txn, user_id).await?;
    let item = shop_item::Entity::find_by_id(item_id)
        .one(&txn)
        .await?
        .ok_or(DomainError::NotFound)?;
    let owned = owned_purchases(&txn, user_id).await?;

    let outcome = progress::attempt_purchase(level.points, &item, &owned, now).map_err(|e| {
        tracing::warn!("User {} cannot buy item {}: {}", user_id, item_id, e);
        e
    })?;

    let level = level_service::set_balance(&txn, level, outcome.new_balance).await?;
    let purchase = insert_purchase(&txn, user_id, outcome.purchase).await?;
    txn.commit().await?;

    tracing::info!(
        "User {} bought '{}' for {} points",
        user_id,
        item.name,
        item.price_points
    );
    Ok(PurchaseReceipt {
        purchase,
        new_balance: level.points,
    })
}

/// Buy several items at once. Either every line is applied or none is.
pub async fn checkout(
    db: &DatabaseConnection,
    user_id: i32,
    item_ids: &[i32],
    now: DateTime<Utc>,
) -> Result<CheckoutReceipt, DomainError> {
    if item_ids.is_empty() {
        return Err(DomainError::validation("cart is empty"));
    }

    let txn = db.begin().await?;

    let level = level_service::get_or_create(&txn, user_id).await?;
    let mut owned = owned_purchases(&txn, user_id).await?;

    let mut quantities: BTreeMap<i32, u32> = BTreeMap::new();
    for id in item_ids {
        *quantities.entry(*id).or_default() += 1;
    }

    let items = shop_item::Entity::find()
        .filter(shop_item::Column::Id.is_in(quantities.keys().copied()))
        .all(&txn)
        .await?;
    if items.len() != quantities.len() {
        return Err(DomainError::NotFound);
    }

    let lines: Vec<(&shop_item::Model, u32)> = items
        .iter()
        .map(|item| (item, quantities.get(&item.id).copied().unwrap_or(0)))
        .collect();
    let total_spent = progress::cart_total(&lines);

    let mut balance = level.points;
    let mut purchases = Vec::with_capacity(item_ids.len());
    for id in item_ids {
        let item = items
            .iter()
            .find(|item| item.id == *id)
            .ok_or(DomainError::NotFound)?;

        let outcome = progress::attempt_purchase(balance, item, &owned, now).map_err(|e| {
            tracing::warn!("User {} checkout rejected at item {}: {}", user_id, id, e);
            e
        })?;
        balance = outcome.new_balance;

        let purchase = insert_purchase(&txn, user_id, outcome.purchase).await?;
        owned.push(purchase.clone());
        purchases.push(purchase);
    }

    let level = level_service::set_balance(&txn, level, balance).await?;
    txn.commit().await?;

    tracing::info!(
        "User {} checked out {} items for {} points",
        user_id,
        purchases.len(),
        total_spent
    );
    Ok(CheckoutReceipt {
        purchases,
        total_spent,
        new_balance: level.points,
    })
}
