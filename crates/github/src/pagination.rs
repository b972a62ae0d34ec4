//! Page-by-page listing of GitHub collections.
//!
//! GitHub list endpoints return at most `per_page` items per request. The
//! client keeps requesting pages until the [`PagePolicy`] of the endpoint
//! says the last page was reached, and returns everything it gathered as a
//! [`ListOutcome`].
//!
//! A failure in the middle of a listing does not discard the pages already
//! fetched: the outcome carries both the partial items and the error, so an
//! empty list is only conclusive when [`ListOutcome::is_complete`] holds.

use crate::error::{Error, Result};

/// Default number of items requested per page.
pub const DEFAULT_PER_PAGE: u8 = 30;

/// Largest page size GitHub accepts.
pub const MAX_PER_PAGE: u8 = 100;

/// How an endpoint signals its last page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagePolicy {
    /// A page shorter than the page size is the last one.
    ShortPage,
    /// Only an empty page ends the listing.
    EmptyPage,
}

impl PagePolicy {
    /// Returns whether a page of `len` items ends the listing.
    #[must_use]
    pub fn is_last_page(self, len: usize, per_page: usize) -> bool {
        match self {
            Self::ShortPage => len < per_page,
            Self::EmptyPage => len == 0,
        }
    }
}

/// Clamps a configured page size to what GitHub accepts; zero means default.
#[must_use]
pub fn effective_per_page(per_page: u8) -> u8 {
    match per_page {
        0 => DEFAULT_PER_PAGE,
        n => n.min(MAX_PER_PAGE),
    }
}

/// The result of a paginated listing.
#[derive(Debug)]
pub struct ListOutcome<T> {
    /// The listed resource, for diagnostics.
    pub resource: &'static str,
    /// Items gathered from every page fetched successfully.
    pub items: Vec<T>,
    /// Number of pages fetched successfully.
    pub pages: u32,
    /// The failure that interrupted the listing, if any.
    pub error: Option<Error>,
}

impl<T> ListOutcome<T> {
    /// Creates an empty outcome for a resource.
    #[must_use]
    pub fn new(resource: &'static str) -> Self {
        Self {
            resource,
            items: Vec::new(),
            pages: 0,
            error: None,
        }
    }

    /// Returns whether the listing reached its last page.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// Returns the gathered items, dropping any error.
    #[must_use]
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// Returns the items if the listing is complete.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IncompleteListing`] wrapping the interrupting error.
    pub fn into_result(self) -> Result<Vec<T>> {
        match self.error {
            None => Ok(self.items),
            Some(source) => Err(Error::IncompleteListing {
                resource: self.resource,
                pages: self.pages,
                source: Box::new(source),
            }),
        }
    }
}
