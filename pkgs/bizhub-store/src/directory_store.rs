//! Directory store - users and the business columns chat joins against

use chrono::Utc;
use sea_orm::sea_query::LikeExpr;
use sea_orm::{
    prelude::Expr, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use tracing::{debug, info};

use crate::entities::{businesses, users};
use crate::error::Result;
use crate::events::{BusinessRef, UserInfo};

const LIKE_ESCAPE: char = '\\';

fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

impl From<users::Model> for UserInfo {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}

impl From<businesses::Model> for BusinessRef {
    fn from(model: businesses::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            owner_id: model.owner_id,
        }
    }
}

/// Directory store
#[derive(Clone)]
pub struct DirectoryStore {
    db: DatabaseConnection,
}

impl DirectoryStore {
    /// Create a new directory store
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Insert a user or rename an existing one
    pub async fn upsert_user(&self, id: &str, name: &str) -> Result<()> {
        let updated = users::Entity::update_many()
            .col_expr(users::Column::Name, Expr::value(name))
            .filter(users::Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        if updated.rows_affected == 0 {
            let user = users::ActiveModel {
                id: Set(id.to_string()),
                name: Set(name.to_string()),
                created_at: Set(Utc::now().timestamp_micros()),
            };
            users::Entity::insert(user)
                .exec_without_returning(&self.db)
                .await?;
        }

        debug!("Upserted user: {} ({})", name, id);
        Ok(())
    }

    /// Get a user by ID
    pub async fn get_user(&self, id: &str) -> Result<Option<UserInfo>> {
        let user = users::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?;

        Ok(user.map(Into::into))
    }

    /// Get several users at once
    pub async fn get_users(&self, ids: Vec<String>) -> Result<Vec<UserInfo>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let users = users::Entity::find()
            .filter(users::Column::Id.is_in(ids))
            .all(&self.db)
            .await?;

        Ok(users.into_iter().map(Into::into).collect())
    }

    /// Register a business owned by `owner_id`
    pub async fn create_business(&self, name: &str, owner_id: &str) -> Result<BusinessRef> {
        let id = uuid::Uuid::new_v4().to_string();
        let business = businesses::ActiveModel {
            id: Set(id.clone()),
            name: Set(name.to_string()),
            owner_id: Set(owner_id.to_string()),
            created_at: Set(Utc::now().timestamp_micros()),
        };

        businesses::Entity::insert(business)
            .exec_without_returning(&self.db)
            .await?;

        info!("Created business '{}' ({}) for owner {}", name, id, owner_id);
        Ok(BusinessRef {
            id,
            name: name.to_string(),
            owner_id: owner_id.to_string(),
        })
    }

    /// Get a business by ID
    pub async fn get_business(&self, id: &str) -> Result<Option<BusinessRef>> {
        let business = businesses::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?;

        Ok(business.map(Into::into))
    }

    /// Get several businesses at once
    pub async fn get_businesses(&self, ids: Vec<String>) -> Result<Vec<BusinessRef>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = businesses::Entity::find()
            .filter(businesses::Column::Id.is_in(ids))
            .all(&self.db)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Substring search on business names. `%` and `_` match literally.
    ///
    /// SQLite's LIKE folds case for ASCII letters only, so "émile" does not
    /// find "Émile".
    pub async fn search_businesses(&self, query: &str, limit: u64) -> Result<Vec<BusinessRef>> {
        let pattern = LikeExpr::new(format!("%{}%", escape_like(query))).escape(LIKE_ESCAPE);
        let rows = businesses::Entity::find()
            .filter(businesses::Column::Name.like(pattern))
            .order_by_asc(businesses::Column::Name)
            .limit(limit)
            .all(&self.db)
            .await?;

        debug!("Business search '{}' matched {}", query, rows.len());
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
