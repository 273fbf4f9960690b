pub mod cart;
pub mod cart_item;
pub mod order;
pub mod order_item;
pub mod product;
pub mod user;

use sea_orm::sea_query::{Index, IndexCreateStatement, TableCreateStatement};
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, Schema, Set, TransactionTrait,
};

use crate::entities::{
    cart::Entity as Cart, cart_item::Entity as CartItem, order::Entity as Order,
    order_item::Entity as OrderItem, product::Entity as Product, user::Entity as User,
};

pub async fn setup_schema(db: &DatabaseConnection) {
    let schema = Schema::new(db.get_database_backend());

    let mut tables: Vec<TableCreateStatement> = vec![
        schema.create_table_from_entity(User),
        schema.create_table_from_entity(Product),
        schema.create_table_from_entity(Cart),
        schema.create_table_from_entity(CartItem),
        schema.create_table_from_entity(Order),
        schema.create_table_from_entity(OrderItem),
    ];

    for table in tables.iter_mut() {
        table.if_not_exists();
        db.execute(db.get_database_backend().build(&*table))
            .await
            .expect("Failed to create table schema");
    }

    //A losing racer on the find-or-create line item step fails its
    //transaction here instead of inserting a duplicate row.
    let mut cart_product_unique: IndexCreateStatement = Index::create()
        .name("idx_cart_items_cart_id_product_id")
        .table(CartItem)
        .col(cart_item::Column::CartId)
        .col(cart_item::Column::ProductId)
        .unique()
        .to_owned();
    cart_product_unique.if_not_exists();
    db.execute(db.get_database_backend().build(&cart_product_unique))
        .await
        .expect("Failed to create cart_items unique index");
}

const DEMO_PRODUCTS: [(&str, f32, &str); 3] = [
    (
        "Classic T-Shirt",
        20.00,
        "https://via.placeholder.com/150/FFC0CB/000000?Text=Product1",
    ),
    (
        "Denim Jeans",
        50.00,
        "https://via.placeholder.com/150/ADD8E6/000000?Text=Product2",
    ),
    (
        "Sneakers",
        75.00,
        "https://via.placeholder.com/150/90EE90/000000?Text=Product3",
    ),
];

//Run-once catalog seed, guarded by an existence check so restarts are safe.
pub async fn seed_products(db: &DatabaseConnection) -> Result<(), DbErr> {
    if Product::find().one(db).await?.is_some() {
        return Ok(());
    }

    tracing::info!("Populating empty catalog with demo products");

    let rows = DEMO_PRODUCTS.iter().map(|(name, price, image_url)| {
        product::ActiveModel {
            name: Set((*name).to_owned()),
            price: Set(*price),
            image_url: Set(Some((*image_url).to_owned())),
            ..Default::default()
        }
    });

    let txn = db.begin().await?;
    Product::insert_many(rows).exec(&txn).await?;
    txn.commit().await?;

    Ok(())
}
