//! Pagination module
//!
//! Exhaustive offset/length pagination over DataTables-style envelopes.
//!
//! # Overview
//!
//! `PaginationDriver::fetch_all` serves a complete record set from the
//! response cache when it can. Otherwise it walks the provider page by page,
//! strictly in sequence, until the reported total is covered, and caches
//! the finished aggregate. A failed or cancelled run caches nothing.

mod driver;
mod types;

pub use driver::PaginationDriver;
pub use types::{Column, Order, PageRequest, PageResponse, PageWindow, Search, SortDirection};
