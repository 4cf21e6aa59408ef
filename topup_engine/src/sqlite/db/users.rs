use log::*;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use super::like_pattern;
use crate::{
    api::order_objects::{Paged, Pagination},
    db_types::{CustomerSummary, NewUser, ProfileUpdate, User},
    traits::AuthApiError,
};

pub async fn fetch_user(id: i64, conn: &mut SqliteConnection) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_user_by_username(username: &str, conn: &mut SqliteConnection) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE username = $1").bind(username).fetch_optional(conn).await
}

pub async fn username_or_email_exists(
    username: &str,
    email: &str,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = $1 OR email = $2")
        .bind(username)
        .bind(email)
        .fetch_one(conn)
        .await?;
    Ok(count > 0)
}

pub async fn insert_user(user: NewUser, conn: &mut SqliteConnection) -> Result<User, AuthApiError> {
    let result = sqlx::query_as(
        r#"
            INSERT INTO users (username, email, password_hash, role, player_id, phone)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(user.username)
    .bind(user.email)
    .bind(user.password_hash)
    .bind(user.role)
    .bind(user.player_id)
    .bind(user.phone)
    .fetch_one(conn)
    .await;
    match result {
        Ok(user) => Ok(user),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(AuthApiError::UserAlreadyExists),
        Err(e) => Err(e.into()),
    }
}

/// Returns `None` if the user does not exist. `update` must not be empty.
pub async fn update_profile(
    id: i64,
    update: ProfileUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<User>, AuthApiError> {
    let mut builder = QueryBuilder::new("UPDATE users SET updated_at = CURRENT_TIMESTAMP, ");
    let mut set_clause = builder.separated(", ");
    if let Some(email) = update.email {
        set_clause.push("email = ");
        set_clause.push_bind_unseparated(email);
    }
    if let Some(player_id) = update.player_id {
        set_clause.push("player_id = ");
        set_clause.push_bind_unseparated(player_id);
    }
    if let Some(phone) = update.phone {
        set_clause.push("phone = ");
        set_clause.push_bind_unseparated(phone);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" RETURNING *");
    trace!("🗃️ Executing query: {}", builder.sql());
    match builder.build_query_as::<User>().fetch_optional(conn).await {
        Ok(user) => Ok(user),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(AuthApiError::EmailAlreadyInUse),
        Err(e) => Err(e.into()),
    }
}

fn push_customer_filter(builder: &mut QueryBuilder<'_, Sqlite>, search: &Option<String>) {
    builder.push(" WHERE role = 'customer'");
    if let Some(term) = search {
        let pattern = like_pattern(term);
        builder.push(" AND (username LIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" ESCAPE '\\' OR email LIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" ESCAPE '\\' OR player_id LIKE ");
        builder.push_bind(pattern);
        builder.push(" ESCAPE '\\')");
    }
}

pub async fn fetch_customers(
    search: Option<String>,
    page: Pagination,
    conn: &mut SqliteConnection,
) -> Result<Paged<CustomerSummary>, sqlx::Error> {
    let mut count = QueryBuilder::new("SELECT COUNT(*) FROM users");
    push_customer_filter(&mut count, &search);
    let total: i64 = count.build_query_scalar().fetch_one(&mut *conn).await?;

    let mut builder =
        QueryBuilder::new("SELECT id, username, email, player_id, phone, created_at FROM users");
    push_customer_filter(&mut builder, &search);
    builder.push(" ORDER BY created_at DESC, id DESC LIMIT ");
    builder.push_bind(page.page_size());
    builder.push(" OFFSET ");
    builder.push_bind(page.offset());
    trace!("🗃️ Executing query: {}", builder.sql());
    let customers = builder.build_query_as::<CustomerSummary>().fetch_all(conn).await?;
    Ok(Paged::new(customers, &page, total))
}

pub async fn count_customers(conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'customer'").fetch_one(conn).await
}
