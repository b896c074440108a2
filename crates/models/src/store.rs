use sea_orm::{entity::prelude::*, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors;
use crate::status::StoreStatus;
use crate::user;

pub const DEFAULT_CURRENCY: &str = "XAF";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "store")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub currency: String,
    pub status: StoreStatus,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Owner }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Owner => Entity::belongs_to(user::Entity).from(Column::OwnerId).to(user::Column::Id).into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_active(&self) -> bool {
        self.status == StoreStatus::Active
    }
}

pub fn validate_name(name: &str) -> Result<(), errors::ModelError> {
    let n = name.trim();
    if n.is_empty() { return Err(errors::ModelError::Validation("store name required".into())); }
    if n.chars().count() > 128 { return Err(errors::ModelError::Validation("store name too long (<=128)".into())); }
    Ok(())
}

/// Slugs are lowercase ascii letters, digits and single dashes, 3..=64 long.
pub fn validate_slug(slug: &str) -> Result<(), errors::ModelError> {
    let ok_chars = slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !(3..=64).contains(&slug.len()) || !ok_chars || slug.starts_with('-') || slug.ends_with('-') || slug.contains("--") {
        return Err(errors::ModelError::Validation("slug must be 3-64 chars of [a-z0-9-]".into()));
    }
    Ok(())
}

/// Derive a slug from a display name: lowercase, non-alphanumerics collapse into one dash.
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out.truncate(64);
    out.trim_end_matches('-').to_string()
}

pub fn validate_currency(code: &str) -> Result<(), errors::ModelError> {
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(errors::ModelError::Validation("currency must be a 3-letter ISO code".into()));
    }
    Ok(())
}

pub fn new_active_model(owner_id: Uuid, name: &str, slug: &str, description: Option<String>, currency: &str) -> Result<ActiveModel, errors::ModelError> {
    validate_name(name)?;
    validate_slug(slug)?;
    validate_currency(currency)?;
    let now = Utc::now().into();
    Ok(ActiveModel {
        id: Set(Uuid::new_v4()),
        owner_id: Set(owner_id),
        name: Set(name.trim().to_string()),
        slug: Set(slug.to_string()),
        description: Set(description),
        currency: Set(currency.to_string()),
        status: Set(StoreStatus::Active),
        created_at: Set(now),
        updated_at: Set(now),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("  Chez Mama's  Boutique!! "), "chez-mama-s-boutique");
        assert_eq!(slugify("ÉPICERIE 241"), "picerie-241");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn slug_rules() {
        assert!(validate_slug("libreville-shop").is_ok());
        assert!(validate_slug("ab").is_err());
        assert!(validate_slug("Upper").is_err());
        assert!(validate_slug("a--b").is_err());
        assert!(validate_slug("-abc").is_err());
    }

    #[test]
    fn currency_rules() {
        assert!(validate_currency("XAF").is_ok());
        assert!(validate_currency("xaf").is_err());
        assert!(validate_currency("EURO").is_err());
    }
}
