//! Service layer providing the storefront's business rules on top of models.
//! - Separates business logic from data access and from the HTTP layer.
//! - Reuses validation and entity definitions in the `models` crate.
//! - Every store-scoped operation goes through `access::authorize`.

pub mod errors;
pub mod auth;
pub mod access;
pub mod store_service;
pub mod member_service;
pub mod category_service;
pub mod product_service;
pub mod cart_service;
pub mod order_service;
pub mod invoice_service;
pub mod plan_service;
pub mod subscription_service;
pub mod payment;
#[cfg(test)]
pub mod test_support;

pub use common::pagination::Pagination;
pub use common::types::Page;

use sea_orm::{ConnectionTrait, EntityTrait, PaginatorTrait, Select};

/// Run `select` as one page of `opts`, counting the full result set.
pub(crate) async fn fetch_page<E, C>(db: &C, select: Select<E>, opts: Pagination) -> Result<Page<E::Model>, errors::ServiceError>
where
    E: EntityTrait,
    E::Model: Sync,
    C: ConnectionTrait,
{
    let (page_idx, per_page) = opts.normalize();
    let paginator = select.paginate(db, per_page);
    let total = paginator.num_items().await?;
    let items = paginator.fetch_page(page_idx).await?;
    Ok(Page::new(items, total, opts))
}
