pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const MAX_PAGE_SIZE: usize = 200;

/// One page of history to fetch, newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: u32,
    pub offset: usize,
    pub limit: usize,
}

impl PageRequest {
    /// Offset and limit for a 1-based page, both derived from the normalized size.
    pub fn numbered(page: u32, page_size: usize) -> Self {
        let page = page.max(1);
        let limit = normalize_page_size(page_size);
        Self {
            page,
            offset: (page as usize - 1) * limit,
            limit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationState {
    page_size: usize,
    next_page: u32,
    has_more: bool,
    in_flight: Option<u32>,
}

impl PaginationState {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: normalize_page_size(page_size),
            next_page: 1,
            has_more: true,
            in_flight: None,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Pages fully loaded so far.
    pub fn loaded_pages(&self) -> u32 {
        self.next_page - 1
    }

    /// Claims the next page, or returns None when a load is running or history is exhausted.
    pub fn begin(&mut self) -> Option<PageRequest> {
        if self.in_flight.is_some() || !self.has_more {
            return None;
        }

        let page = self.next_page;
        self.in_flight = Some(page);
        Some(PageRequest::numbered(page, self.page_size))
    }

    /// Records a delivered page. Returns false for a page that was not in flight.
    pub fn complete(&mut self, page: u32, received: usize) -> bool {
        if self.in_flight != Some(page) {
            return false;
        }

        self.in_flight = None;
        self.next_page = page + 1;
        if received < self.page_size {
            self.has_more = false;
        }
        true
    }

    /// Releases a failed page so it can be requested again.
    pub fn fail(&mut self, page: u32) -> bool {
        if self.in_flight != Some(page) {
            return false;
        }

        self.in_flight = None;
        true
    }
}

pub fn normalize_page_size(size: usize) -> usize {
    match size {
        0 => DEFAULT_PAGE_SIZE,
        value if value > MAX_PAGE_SIZE => MAX_PAGE_SIZE,
        value => value,
    }
}
