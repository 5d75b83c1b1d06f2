pub mod anomaly;
pub mod employee;
pub mod leave;
pub mod punch;
pub mod reconcile;
pub mod report;
pub mod shift;

/// Row offset for a 1-based page. Widened before multiplying so an absurd
/// `?page=` cannot overflow the handler's integer width.
pub(crate) fn page_offset(page: u32, per_page: u32) -> u64 {
    (page as u64 - 1) * per_page as u64
}

#[cfg(test)]
mod tests {
    use super::page_offset;

    #[test]
    fn page_offset_survives_the_largest_page_number() {
        assert_eq!(page_offset(1, 50), 0);
        assert_eq!(page_offset(3, 20), 40);
        assert_eq!(page_offset(u32::MAX, 500), (u32::MAX as u64 - 1) * 500);
    }
}
