//! Page cursor over the tracked asset population.
//!
//! The population is delivered in pages of `page_size`. Page 0 doubles as
//! the signal to advance the simulation, so positions move once per full
//! cycle through the pages rather than once per broadcast.

use crate::config::StreamConfig;

/// Tracks which page is due next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryCursor {
    page: u32,
    max_page: u32,
    page_size: u32,
    tracked_assets: u32,
}

impl DeliveryCursor {
    /// Create a cursor positioned on page 0.
    pub const fn new(config: &StreamConfig) -> Self {
        let max_page = if config.page_size == 0 {
            1
        } else {
            config.tracked_assets.div_ceil(config.page_size)
        };
        Self {
            page: 0,
            max_page,
            page_size: config.page_size,
            tracked_assets: config.tracked_assets,
        }
    }

    /// Step to the next page, wrapping to 0 after the last, and return it.
    pub const fn next_page(&mut self) -> u32 {
        self.page = self.page.saturating_add(1);
        if self.page >= self.max_page {
            self.page = 0;
        }
        self.page
    }

    /// The page most recently returned by [`next_page`](Self::next_page).
    pub const fn current_page(&self) -> u32 {
        self.page
    }

    /// Number of pages in one full cycle.
    pub const fn max_page(&self) -> u32 {
        self.max_page
    }

    /// Whether `page` is the one that triggers a simulation advance.
    pub const fn is_advance_page(page: u32) -> bool {
        page == 0
    }

    /// Half-open asset index range covered by `page`, clamped to the
    /// configured asset count.
    pub fn page_range(&self, page: u32) -> std::ops::Range<usize> {
        let start = u64::from(page).saturating_mul(u64::from(self.page_size));
        let end = start
            .saturating_add(u64::from(self.page_size))
            .min(u64::from(self.tracked_assets));
        let start = usize::try_from(start).unwrap_or(usize::MAX);
        let end = usize::try_from(end).unwrap_or(usize::MAX);
        start..end.max(start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor(tracked_assets: u32, page_size: u32) -> DeliveryCursor {
        DeliveryCursor::new(&StreamConfig {
            tracked_assets,
            page_size,
            ..StreamConfig::default()
        })
    }

    #[test]
    fn default_config_has_three_pages() {
        let cursor = DeliveryCursor::new(&StreamConfig::default());
        assert_eq!(cursor.max_page(), 3);
    }

    #[test]
    fn cycles_through_pages_and_revisits_zero_every_cycle() {
        let mut cursor = cursor(24_000, 8_000);
        let pages: Vec<u32> = (0..9).map(|_| cursor.next_page()).collect();
        assert_eq!(pages, vec![1, 2, 0, 1, 2, 0, 1, 2, 0]);
        assert_eq!(cursor.current_page(), 0);
    }

    #[test]
    fn uneven_division_rounds_page_count_up() {
        let cursor = cursor(10, 4);
        assert_eq!(cursor.max_page(), 3);
        assert_eq!(cursor.page_range(2), 8..10);
    }

    #[test]
    fn single_page_always_advances() {
        let mut cursor = cursor(100, 500);
        assert_eq!(cursor.max_page(), 1);
        for _ in 0..4 {
            assert!(DeliveryCursor::is_advance_page(cursor.next_page()));
        }
    }

    #[test]
    fn page_ranges_use_configured_asset_count() {
        let cursor = cursor(24_000, 8_000);
        assert_eq!(cursor.page_range(0), 0..8_000);
        assert_eq!(cursor.page_range(1), 8_000..16_000);
        assert_eq!(cursor.page_range(2), 16_000..24_000);
    }
}
