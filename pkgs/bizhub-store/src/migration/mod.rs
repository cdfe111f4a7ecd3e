//! Sea-ORM migrations for bizhub-store database schema

pub use sea_orm_migration::prelude::*;

mod m20250201_000001_create_users_table;
mod m20250201_000002_create_businesses_table;
mod m20250201_000003_create_conversations_table;
mod m20250201_000004_create_messages_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250201_000001_create_users_table::Migration),
            Box::new(m20250201_000002_create_businesses_table::Migration),
            Box::new(m20250201_000003_create_conversations_table::Migration),
            Box::new(m20250201_000004_create_messages_table::Migration),
        ]
    }
}
