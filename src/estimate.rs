//! Page-count estimate. A calibrated heuristic, not a pagination result.

use crate::geometry::PageSize;

const A4_CHARS_PER_PAGE: u64 = 1000;
const OTHER_CHARS_PER_PAGE: u64 = 800;

/// Characters expected per page for a paper size and column count.
///
/// Multi-column pages hold `columns × 0.9` times the single-column amount;
/// the product is floored, and never drops below one.
pub fn chars_per_page(page_size: PageSize, columns: u8) -> u64 {
    let base = match page_size {
        PageSize::A4 => A4_CHARS_PER_PAGE,
        _ => OTHER_CHARS_PER_PAGE,
    };
    let chars = if columns <= 1 {
        base
    } else {
        // base × columns × 0.9, in integers so the floor is exact.
        base * u64::from(columns) * 9 / 10
    };
    chars.max(1)
}

/// Estimated page count for `char_count` characters; at least one.
pub fn estimate_pages(char_count: usize, page_size: PageSize, columns: u8) -> u32 {
    let per_page = chars_per_page(page_size, columns);
    let pages = (char_count as u64).div_ceil(per_page).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// Estimate for trimmed content, counting Unicode scalar values.
pub fn estimate_content_pages(content: &str, page_size: PageSize, columns: u8) -> u32 {
    estimate_pages(content.trim().chars().count(), page_size, columns)
}
