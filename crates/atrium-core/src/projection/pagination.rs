//! Display window over the unpinned list.

/// How many unpinned records are currently shown.
///
/// Starts at one batch, grows one batch per `load_more`, and snaps back to a
/// single batch whenever the result set itself changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayWindow {
    page_size: usize,
    limit: usize,
}

impl DisplayWindow {
    #[must_use]
    pub const fn new(page_size: usize) -> Self {
        Self {
            page_size,
            limit: page_size,
        }
    }

    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Back to a single batch. Returns `true` if the limit changed.
    pub fn reset(&mut self) -> bool {
        let changed = self.limit != self.page_size;
        self.limit = self.page_size;
        changed
    }

    pub fn grow(&mut self) {
        self.limit = self.limit.saturating_add(self.page_size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_by_one_batch_and_resets() {
        let mut window = DisplayWindow::new(20);
        assert_eq!(window.limit(), 20);
        assert!(!window.reset());

        window.grow();
        window.grow();
        assert_eq!(window.limit(), 60);

        assert!(window.reset());
        assert_eq!(window.limit(), 20);
    }
}
