use std::collections::HashMap;

use chrono::Utc;
use log::{debug, trace};
use sqlx::{types::Json, QueryBuilder, SqliteConnection};

use super::{first_row, one_row};

use crate::{
    db_types::{CatalogEntry, NewProduct, Product, ProductId, ProductUpdate},
    traits::{CatalogCounts, ProductQueryFilter, SellerProductStats},
};

/// Inserts a new product with a freshly generated id. Stats start at zero.
pub async fn insert_product(product: NewProduct, conn: &mut SqliteConnection) -> Result<Product, sqlx::Error> {
    let id = ProductId::random();
    let now = Utc::now();
    let product: Product = sqlx::query_as(
        r#"
            INSERT INTO products (
                id,
                seller_id,
                title,
                description,
                price,
                currency,
                category,
                tags,
                preview_media_url,
                file_storage_key,
                status,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *;
        "#,
    )
    .bind(id)
    .bind(product.seller_id)
    .bind(product.title)
    .bind(product.description)
    .bind(product.price)
    .bind(product.currency.to_ascii_lowercase())
    .bind(product.category)
    .bind(Json(product.tags))
    .bind(product.preview_media_url)
    .bind(product.file_storage_key)
    .bind(product.status)
    .bind(now)
    .bind(now)
    .fetch_all(conn)
    .await
    .and_then(one_row)?;
    debug!("🗃️ Product {} inserted for seller {}", product.id, product.seller_id);
    Ok(product)
}

pub async fn fetch_product(id: &ProductId, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    let product = sqlx::query_as("SELECT * FROM products WHERE id = $1")
        .bind(id.as_str())
        .fetch_all(conn)
        .await
        .map(first_row)?;
    Ok(product)
}

/// Applies the non-empty fields of `update`. Returns `None` if the product does not exist.
///
/// The caller must ensure that `update` is not empty.
pub async fn update_product(
    id: &ProductId,
    update: ProductUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<Product>, sqlx::Error> {
    let mut builder = QueryBuilder::new("UPDATE products SET updated_at = CURRENT_TIMESTAMP, ");
    let mut set_clause = builder.separated(", ");
    if let Some(title) = update.title {
        set_clause.push("title = ");
        set_clause.push_bind_unseparated(title);
    }
    if let Some(description) = update.description {
        set_clause.push("description = ");
        set_clause.push_bind_unseparated(description);
    }
    if let Some(price) = update.price {
        set_clause.push("price = ");
        set_clause.push_bind_unseparated(price);
    }
    if let Some(currency) = update.currency {
        set_clause.push("currency = ");
        set_clause.push_bind_unseparated(currency.to_ascii_lowercase());
    }
    if let Some(category) = update.category {
        set_clause.push("category = ");
        set_clause.push_bind_unseparated(category);
    }
    if let Some(tags) = update.tags {
        set_clause.push("tags = ");
        set_clause.push_bind_unseparated(Json(tags));
    }
    if let Some(url) = update.preview_media_url {
        set_clause.push("preview_media_url = ");
        set_clause.push_bind_unseparated(url);
    }
    if let Some(key) = update.file_storage_key {
        set_clause.push("file_storage_key = ");
        set_clause.push_bind_unseparated(key);
    }
    if let Some(status) = update.status {
        set_clause.push("status = ");
        set_clause.push_bind_unseparated(status);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id.as_str().to_string());
    builder.push(" RETURNING *");
    trace!("🗃️ Executing query: {}", builder.sql());
    let product = builder.build_query_as::<Product>().fetch_all(conn).await.map(first_row)?;
    Ok(product)
}

/// Fetches products according to the filter, newest first.
pub async fn search_products(
    filter: ProductQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<Product>, sqlx::Error> {
    let statuses = filter.statuses_or_default().iter().map(|s| format!("'{s}'")).collect::<Vec<String>>().join(",");
    let limit = filter.limit_or_default();
    let mut builder = QueryBuilder::new("SELECT * FROM products WHERE ");
    let mut where_clause = builder.separated(" AND ");
    where_clause.push(format!("status IN ({statuses})"));
    if let Some(search) = filter.search {
        where_clause.push("title LIKE ");
        where_clause.push_bind_unseparated(format!("%{search}%"));
    }
    if let Some(category) = filter.category {
        where_clause.push("category = ");
        where_clause.push_bind_unseparated(category);
    }
    if let Some(seller_id) = filter.seller_id {
        where_clause.push("seller_id = ");
        where_clause.push_bind_unseparated(seller_id);
    }
    builder.push(" ORDER BY created_at DESC LIMIT ");
    builder.push_bind(limit);
    trace!("🗃️ Executing query: {}", builder.sql());
    let products = builder.build_query_as::<Product>().fetch_all(conn).await?;
    trace!("🗃️ Product search returned {} results", products.len());
    Ok(products)
}

/// One SELECT over all requested ids, so the result is a consistent snapshot of the catalog.
pub async fn resolve_active(
    ids: &[ProductId],
    conn: &mut SqliteConnection,
) -> Result<HashMap<ProductId, CatalogEntry>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let mut builder = QueryBuilder::new(
        "SELECT id, title, price, currency, seller_id FROM products WHERE status = 'active' AND id IN (",
    );
    let mut in_clause = builder.separated(", ");
    for id in ids {
        in_clause.push_bind(id.as_str().to_string());
    }
    builder.push(")");
    let entries = builder.build_query_as::<CatalogEntry>().fetch_all(conn).await?;
    Ok(entries.into_iter().map(|e| (e.id.clone(), e)).collect())
}

/// Atomic `views = views + 1`. Returns whether the product exists.
pub async fn increment_views(id: &ProductId, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("UPDATE products SET views = views + 1 WHERE id = $1").bind(id.as_str()).execute(conn).await?;
    Ok(result.rows_affected() > 0)
}

/// Atomic `sales = sales + delta`. Returns whether the product exists.
pub async fn increment_sales(id: &ProductId, delta: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE products SET sales = sales + $1 WHERE id = $2")
        .bind(delta)
        .bind(id.as_str())
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn seller_product_stats(
    seller_id: &str,
    conn: &mut SqliteConnection,
) -> Result<SellerProductStats, sqlx::Error> {
    let stats = sqlx::query_as(
        r#"
        SELECT
            COUNT(*) AS products,
            COALESCE(SUM(views), 0) AS views,
            COALESCE(SUM(sales), 0) AS sales
        FROM products WHERE seller_id = $1
        "#,
    )
    .bind(seller_id)
    .fetch_all(conn)
    .await
    .and_then(one_row)?;
    Ok(stats)
}

pub async fn catalog_counts(conn: &mut SqliteConnection) -> Result<CatalogCounts, sqlx::Error> {
    let counts = sqlx::query_as("SELECT COUNT(*) AS products, COUNT(DISTINCT seller_id) AS sellers FROM products")
        .fetch_all(conn)
        .await
        .and_then(one_row)?;
    Ok(counts)
}
