use serde::{Deserialize, Serialize};

use crate::pagination::Pagination;

#[derive(Serialize, Deserialize, Debug)]
pub struct Health {
    pub status: &'static str,
}

/// One page of a listing, with enough metadata for a client to keep paging.
#[derive(Serialize, Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, opts: Pagination) -> Self {
        let (page_idx, per_page) = opts.normalize();
        Self {
            items,
            page: page_idx as u32 + 1,
            per_page: per_page as u32,
            total,
            total_pages: total.div_ceil(per_page),
        }
    }
}
