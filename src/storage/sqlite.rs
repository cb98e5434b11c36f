//! SQLite implementations of storage interfaces.
//!
//! The standalone profile keeps cart rows, orders and a local catalog mirror
//! in one database, which lets the combined cart read be served by a real
//! single-round-trip JOIN.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_query::{Expr, OnConflict, Query, SqliteQueryBuilder};
use sea_query_binder::SqlxBinder;
use sqlx::{Row, SqlitePool};

use crate::interfaces::catalog::{Catalog, CatalogError};
use crate::interfaces::storage::{CartStorage, OrderPatch, OrderStorage, Result, StorageError};
use crate::types::{
    CartRow, CatalogEntry, JoinedCartRow, Order, OrderLine, OrderStatus, PaymentStatus,
};

use super::schema::{
    CartRows, OrderLines, Orders, Products, CREATE_CART_ROWS_TABLE, CREATE_ORDERS_TABLE,
    CREATE_ORDERS_USER_INDEX, CREATE_ORDER_LINES_TABLE, CREATE_PRODUCTS_TABLE,
};

/// SQLite implementation of CartStorage.
pub struct SqliteCartStorage {
    pool: SqlitePool,
}

impl SqliteCartStorage {
    /// Create a new SQLite cart storage.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the database schema.
    pub async fn init(&self) -> Result<()> {
        sqlx::query(CREATE_CART_ROWS_TABLE)
            .execute(&self.pool)
            .await?;
        sqlx::query(CREATE_PRODUCTS_TABLE)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl CartStorage for SqliteCartStorage {
    async fn read_cart(&self, user_id: &str) -> Result<Vec<CartRow>> {
        let (sql, values) = Query::select()
            .columns([CartRows::UserId, CartRows::ProductId, CartRows::Quantity])
            .from(CartRows::Table)
            .and_where(Expr::col(CartRows::UserId).eq(user_id))
            .build_sqlx(SqliteQueryBuilder);

        let rows = sqlx::query_with(&sql, values).fetch_all(&self.pool).await?;
        Ok(rows
            .iter()
            .map(|row| CartRow {
                user_id: row.get(0),
                product_id: row.get(1),
                quantity: row.get(2),
            })
            .collect())
    }

    async fn read_cart_joined(&self, user_id: &str) -> Result<Option<Vec<JoinedCartRow>>> {
        // Inner join: rows whose product vanished from the mirror drop out,
        // matching the hydration contract.
        let (sql, values) = Query::select()
            .columns([
                (Products::Table, Products::ProductId),
                (Products::Table, Products::PriceCents),
                (Products::Table, Products::InStock),
                (Products::Table, Products::Name),
                (Products::Table, Products::ImageUrl),
            ])
            .column((CartRows::Table, CartRows::Quantity))
            .from(CartRows::Table)
            .inner_join(
                Products::Table,
                Expr::col((CartRows::Table, CartRows::ProductId))
                    .equals((Products::Table, Products::ProductId)),
            )
            .and_where(Expr::col((CartRows::Table, CartRows::UserId)).eq(user_id))
            .build_sqlx(SqliteQueryBuilder);

        let rows = sqlx::query_with(&sql, values).fetch_all(&self.pool).await?;
        let joined = rows
            .iter()
            .map(|row| JoinedCartRow {
                product_id: row.get(0),
                price_cents: row.get(1),
                in_stock: row.get::<i64, _>(2) != 0,
                name: row.get(3),
                image_url: row.get(4),
                quantity: row.get(5),
            })
            .collect();
        Ok(Some(joined))
    }

    async fn upsert_cart(&self, rows: &[CartRow]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for row in rows {
            if row.quantity <= 0 {
                let (sql, values) = Query::delete()
                    .from_table(CartRows::Table)
                    .and_where(Expr::col(CartRows::UserId).eq(&row.user_id))
                    .and_where(Expr::col(CartRows::ProductId).eq(&row.product_id))
                    .build_sqlx(SqliteQueryBuilder);
                sqlx::query_with(&sql, values).execute(&mut *tx).await?;
                continue;
            }

            let (sql, values) = Query::insert()
                .into_table(CartRows::Table)
                .columns([
                    CartRows::UserId,
                    CartRows::ProductId,
                    CartRows::Quantity,
                    CartRows::UpdatedAt,
                ])
                .values_panic([
                    row.user_id.as_str().into(),
                    row.product_id.as_str().into(),
                    row.quantity.into(),
                    Utc::now().to_rfc3339().into(),
                ])
                .on_conflict(
                    OnConflict::columns([CartRows::UserId, CartRows::ProductId])
                        .update_columns([CartRows::Quantity, CartRows::UpdatedAt])
                        .to_owned(),
                )
                .build_sqlx(SqliteQueryBuilder);
            sqlx::query_with(&sql, values).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

/// SQLite implementation of OrderStorage.
pub struct SqliteOrderStorage {
    pool: SqlitePool,
}

impl SqliteOrderStorage {
    /// Create a new SQLite order storage.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the database schema.
    pub async fn init(&self) -> Result<()> {
        sqlx::query(CREATE_ORDERS_TABLE).execute(&self.pool).await?;
        sqlx::query(CREATE_ORDERS_USER_INDEX)
            .execute(&self.pool)
            .await?;
        sqlx::query(CREATE_ORDER_LINES_TABLE)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    fn order_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Order> {
        let status_raw: String = row.get(6);
        let payment_raw: String = row.get(7);
        let created_raw: String = row.get(9);

        let status = OrderStatus::parse(&status_raw).ok_or(StorageError::InvalidColumn {
            column: "status",
            value: status_raw,
        })?;
        let payment_status =
            PaymentStatus::parse(&payment_raw).ok_or(StorageError::InvalidColumn {
                column: "payment_status",
                value: payment_raw,
            })?;
        let created_at = DateTime::parse_from_rfc3339(&created_raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| StorageError::InvalidColumn {
                column: "created_at",
                value: created_raw,
            })?;

        Ok(Order {
            order_id: row.get(0),
            user_id: row.get(1),
            subtotal_cents: row.get(2),
            discount_cents: row.get(3),
            total_cents: row.get(4),
            currency: row.get(5),
            status,
            payment_status,
            payment_intent_ref: row.get(8),
            created_at,
        })
    }
}

#[async_trait]
impl OrderStorage for SqliteOrderStorage {
    async fn insert_draft(&self, order: &Order, lines: &[OrderLine]) -> Result<()> {
        // One transaction: either the order row and every line land, or
        // nothing does.
        let mut tx = self.pool.begin().await?;

        let (sql, values) = Query::insert()
            .into_table(Orders::Table)
            .columns([
                Orders::OrderId,
                Orders::UserId,
                Orders::SubtotalCents,
                Orders::DiscountCents,
                Orders::TotalCents,
                Orders::Currency,
                Orders::Status,
                Orders::PaymentStatus,
                Orders::PaymentIntentRef,
                Orders::CreatedAt,
            ])
            .values_panic([
                order.order_id.as_str().into(),
                order.user_id.as_str().into(),
                order.subtotal_cents.into(),
                order.discount_cents.into(),
                order.total_cents.into(),
                order.currency.as_str().into(),
                order.status.as_str().into(),
                order.payment_status.as_str().into(),
                order.payment_intent_ref.as_deref().into(),
                order.created_at.to_rfc3339().into(),
            ])
            .build_sqlx(SqliteQueryBuilder);
        sqlx::query_with(&sql, values).execute(&mut *tx).await?;

        for line in lines {
            let (sql, values) = Query::insert()
                .into_table(OrderLines::Table)
                .columns([
                    OrderLines::OrderId,
                    OrderLines::ProductId,
                    OrderLines::Quantity,
                    OrderLines::UnitPriceCents,
                    OrderLines::LineTotalCents,
                    OrderLines::ProductName,
                ])
                .values_panic([
                    line.order_id.as_str().into(),
                    line.product_id.as_str().into(),
                    line.quantity.into(),
                    line.unit_price_cents.into(),
                    line.line_total_cents.into(),
                    line.product_name.as_str().into(),
                ])
                .build_sqlx(SqliteQueryBuilder);
            sqlx::query_with(&sql, values).execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn update_order(&self, order_id: &str, patch: OrderPatch) -> Result<()> {
        let mut update = Query::update();
        update
            .table(Orders::Table)
            .and_where(Expr::col(Orders::OrderId).eq(order_id));

        let guarding_intent = patch.payment_intent_ref.is_some();
        if let Some(status) = patch.status {
            update.value(Orders::Status, status.as_str());
        }
        if let Some(payment_status) = patch.payment_status {
            update.value(Orders::PaymentStatus, payment_status.as_str());
        }
        if let Some(intent_ref) = &patch.payment_intent_ref {
            // Set-at-most-once: only a row without an intent may take one
            update
                .value(Orders::PaymentIntentRef, intent_ref.as_str())
                .and_where(Expr::col(Orders::PaymentIntentRef).is_null());
        }

        let (sql, values) = update.build_sqlx(SqliteQueryBuilder);
        let result = sqlx::query_with(&sql, values).execute(&self.pool).await?;

        if result.rows_affected() == 0 {
            // Distinguish a missing order from a repeated intent write
            let exists = self.read_order(order_id).await;
            return match exists {
                Ok(_) if guarding_intent => Err(StorageError::IntentAlreadySet {
                    order_id: order_id.to_string(),
                }),
                Ok(_) => Ok(()),
                Err(e) => Err(e),
            };
        }
        Ok(())
    }

    async fn read_order(&self, order_id: &str) -> Result<Order> {
        let (sql, values) = Query::select()
            .columns([
                Orders::OrderId,
                Orders::UserId,
                Orders::SubtotalCents,
                Orders::DiscountCents,
                Orders::TotalCents,
                Orders::Currency,
                Orders::Status,
                Orders::PaymentStatus,
                Orders::PaymentIntentRef,
                Orders::CreatedAt,
            ])
            .from(Orders::Table)
            .and_where(Expr::col(Orders::OrderId).eq(order_id))
            .build_sqlx(SqliteQueryBuilder);

        let row = sqlx::query_with(&sql, values)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StorageError::OrderNotFound {
                order_id: order_id.to_string(),
            })?;
        Self::order_from_row(&row)
    }

    async fn read_order_lines(&self, order_id: &str) -> Result<Vec<OrderLine>> {
        let (sql, values) = Query::select()
            .columns([
                OrderLines::OrderId,
                OrderLines::ProductId,
                OrderLines::Quantity,
                OrderLines::UnitPriceCents,
                OrderLines::LineTotalCents,
                OrderLines::ProductName,
            ])
            .from(OrderLines::Table)
            .and_where(Expr::col(OrderLines::OrderId).eq(order_id))
            .build_sqlx(SqliteQueryBuilder);

        let rows = sqlx::query_with(&sql, values).fetch_all(&self.pool).await?;
        Ok(rows
            .iter()
            .map(|row| OrderLine {
                order_id: row.get(0),
                product_id: row.get(1),
                quantity: row.get(2),
                unit_price_cents: row.get(3),
                line_total_cents: row.get(4),
                product_name: row.get(5),
            })
            .collect())
    }
}

/// SQLite-backed catalog: reads the local product mirror.
///
/// Read-only from the pipeline's perspective;
/// [`seed_products`](Self::seed_products) exists for provisioning and tests.
pub struct SqliteCatalog {
    pool: SqlitePool,
}

impl SqliteCatalog {
    /// Create a new SQLite catalog over an initialized pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Upsert product rows into the mirror.
    pub async fn seed_products(&self, entries: &[CatalogEntry]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for entry in entries {
            let (sql, values) = Query::insert()
                .into_table(Products::Table)
                .columns([
                    Products::ProductId,
                    Products::PriceCents,
                    Products::InStock,
                    Products::Name,
                    Products::ImageUrl,
                ])
                .values_panic([
                    entry.product_id.as_str().into(),
                    entry.price_cents.into(),
                    i64::from(entry.in_stock).into(),
                    entry.name.as_str().into(),
                    entry.image_url.as_deref().into(),
                ])
                .on_conflict(
                    OnConflict::column(Products::ProductId)
                        .update_columns([
                            Products::PriceCents,
                            Products::InStock,
                            Products::Name,
                            Products::ImageUrl,
                        ])
                        .to_owned(),
                )
                .build_sqlx(SqliteQueryBuilder);
            sqlx::query_with(&sql, values).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl Catalog for SqliteCatalog {
    async fn fetch_products(&self, ids: &[String]) -> std::result::Result<Vec<CatalogEntry>, CatalogError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let (sql, values) = Query::select()
            .columns([
                Products::ProductId,
                Products::PriceCents,
                Products::InStock,
                Products::Name,
                Products::ImageUrl,
            ])
            .from(Products::Table)
            .and_where(Expr::col(Products::ProductId).is_in(ids.iter().map(String::as_str)))
            .build_sqlx(SqliteQueryBuilder);

        let rows = sqlx::query_with(&sql, values)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CatalogError::Backend(e.to_string()))?;
        Ok(rows
            .iter()
            .map(|row| CatalogEntry {
                product_id: row.get(0),
                price_cents: row.get(1),
                in_stock: row.get::<i64, _>(2) != 0,
                name: row.get(3),
                image_url: row.get(4),
            })
            .collect())
    }
}
