//! Database schema definitions using sea-query.
//!
//! These define the table and column identifiers for type-safe query building.

use sea_query::Iden;

/// Cart rows table schema. Unique on `(user_id, product_id)`.
#[derive(Iden)]
pub enum CartRows {
    Table,
    #[iden = "user_id"]
    UserId,
    #[iden = "product_id"]
    ProductId,
    #[iden = "quantity"]
    Quantity,
    #[iden = "updated_at"]
    UpdatedAt,
}

/// Local catalog mirror table schema.
#[derive(Iden)]
pub enum Products {
    Table,
    #[iden = "product_id"]
    ProductId,
    #[iden = "price_cents"]
    PriceCents,
    #[iden = "in_stock"]
    InStock,
    #[iden = "name"]
    Name,
    #[iden = "image_url"]
    ImageUrl,
}

/// Orders table schema.
#[derive(Iden)]
pub enum Orders {
    Table,
    #[iden = "order_id"]
    OrderId,
    #[iden = "user_id"]
    UserId,
    #[iden = "subtotal_cents"]
    SubtotalCents,
    #[iden = "discount_cents"]
    DiscountCents,
    #[iden = "total_cents"]
    TotalCents,
    #[iden = "currency"]
    Currency,
    #[iden = "status"]
    Status,
    #[iden = "payment_status"]
    PaymentStatus,
    #[iden = "payment_intent_ref"]
    PaymentIntentRef,
    #[iden = "created_at"]
    CreatedAt,
}

/// Order lines table schema.
#[derive(Iden)]
pub enum OrderLines {
    Table,
    #[iden = "order_id"]
    OrderId,
    #[iden = "product_id"]
    ProductId,
    #[iden = "quantity"]
    Quantity,
    #[iden = "unit_price_cents"]
    UnitPriceCents,
    #[iden = "line_total_cents"]
    LineTotalCents,
    #[iden = "product_name"]
    ProductName,
}

/// SQL for creating the cart rows table.
pub const CREATE_CART_ROWS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS cart_rows (
    user_id TEXT NOT NULL,
    product_id TEXT NOT NULL,
    quantity INTEGER NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (user_id, product_id)
);
"#;

/// SQL for creating the catalog mirror table.
pub const CREATE_PRODUCTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS products (
    product_id TEXT PRIMARY KEY,
    price_cents INTEGER NOT NULL,
    in_stock INTEGER NOT NULL DEFAULT 1,
    name TEXT NOT NULL,
    image_url TEXT
);
"#;

/// SQL for creating the orders table.
pub const CREATE_ORDERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS orders (
    order_id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    subtotal_cents INTEGER NOT NULL,
    discount_cents INTEGER NOT NULL,
    total_cents INTEGER NOT NULL,
    currency TEXT NOT NULL,
    status TEXT NOT NULL,
    payment_status TEXT NOT NULL,
    payment_intent_ref TEXT,
    created_at TEXT NOT NULL
);
"#;

/// SQL for indexing orders by user.
pub const CREATE_ORDERS_USER_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_orders_user ON orders(user_id);";

/// SQL for creating the order lines table.
pub const CREATE_ORDER_LINES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS order_lines (
    order_id TEXT NOT NULL,
    product_id TEXT NOT NULL,
    quantity INTEGER NOT NULL,
    unit_price_cents INTEGER NOT NULL,
    line_total_cents INTEGER NOT NULL,
    product_name TEXT NOT NULL,
    PRIMARY KEY (order_id, product_id)
);
"#;
