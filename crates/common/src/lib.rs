pub mod types;
pub mod utils;
pub mod pagination;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_type_ok() {
        let h = types::Health { status: "ok" };
        assert_eq!(h.status, "ok");
    }

    #[test]
    fn page_wraps_items_with_meta() {
        let page = types::Page::new(vec![1, 2], 7, pagination::Pagination { page: 2, per_page: 2 });
        assert_eq!(page.total, 7);
        assert_eq!(page.page, 2);
        assert_eq!(page.total_pages, 4);
    }
}
