use cucumber::given;
use topup_common::Money;
use topup_engine::{
    db_types::{ProductUpdate, Role},
    test_utils::seed::{create_product, create_user},
    CatalogManagement,
};

use crate::cucumber::{world::TopupSystem, TopupWorld};

#[given("a fresh install")]
async fn fresh_database(world: &mut TopupWorld) {
    let system = TopupSystem::new().await;
    world.system = Some(system);
}

#[given(expr = "a customer named {string}")]
async fn a_customer(world: &mut TopupWorld, name: String) {
    let user = create_user(world.db(), &name, Role::Customer).await;
    world.users.insert(name, user);
}

#[given(expr = "an admin named {string}")]
async fn an_admin(world: &mut TopupWorld, name: String) {
    let user = create_user(world.db(), &name, Role::Admin).await;
    world.users.insert(name, user);
}

#[given(expr = "a product {string} priced at {word}")]
async fn a_product(world: &mut TopupWorld, name: String, price: String) {
    let price = price.parse::<Money>().expect("Not a valid price");
    let product = create_product(world.db(), &name, price.value()).await;
    world.products.insert(name, product);
}

#[given(expr = "the product {string} is inactive")]
async fn inactive_product(world: &mut TopupWorld, name: String) {
    let id = world.product(&name).id;
    let update = ProductUpdate { is_active: Some(false), ..Default::default() };
    let product = world.db().update_product(id, update).await.expect("Error updating product").expect("No product");
    world.products.insert(name, product);
}
