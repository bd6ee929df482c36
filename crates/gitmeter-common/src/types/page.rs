//! Pagination primitives shared by the API client and the fetcher

/// Request options for one page of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageOptions {
    /// 1-based page number
    pub page: u32,
    pub per_page: u32,
}

impl PageOptions {
    pub fn first(per_page: u32) -> Self {
        Self { page: 1, per_page }
    }
}

/// One page of records plus the server's next-page token
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// `None` when the server signals no further page
    pub next_page: Option<u32>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_page: Option<u32>) -> Self {
        Self { items, next_page }
    }

    /// Final page
    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, None)
    }
}
