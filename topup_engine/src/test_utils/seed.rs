//! Shortcuts for populating a test database directly, bypassing the API validation layer.
use topup_common::Money;

use crate::{
    db_types::{NewProduct, NewUser, Product, Role, User},
    helpers::hash_password,
    traits::{CatalogManagement, UserManagement},
    SqliteDatabase,
};

pub async fn create_user(db: &SqliteDatabase, username: &str, role: Role) -> User {
    let user = NewUser {
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password_hash: hash_password("password123").expect("Could not hash password"),
        role,
        player_id: format!("{username}-player"),
        phone: None,
    };
    db.insert_user(user).await.expect("Could not create user")
}

pub async fn create_product(db: &SqliteDatabase, name: &str, cents: i64) -> Product {
    let product = NewProduct {
        name: name.to_string(),
        description: Some(format!("{name} top-up")),
        price: Some(Money::from_cents(cents)),
        category: "diamonds".to_string(),
    };
    db.insert_product(product).await.expect("Could not create product")
}
