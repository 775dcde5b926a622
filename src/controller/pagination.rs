/// Courses per page.
pub const PAGE_SIZE: u32 = 5;

/// `max(1, ceil(total / page_size))`.
pub fn total_pages(total: u64, page_size: u32) -> u32 {
    let size = u64::from(page_size.max(1));
    let pages = total.div_ceil(size).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// Clamp a requested page into `[1, total_pages]`.
pub fn clamp_page(page: u32, total: u64, page_size: u32) -> u32 {
    page.clamp(1, total_pages(total, page_size))
}
