//! State module for scrape outcomes
//!
//! `ScrapeStatus` records how the latest scrape of a URL ended and is the
//! dimension the statistics are counted over.

mod scrape_status;

pub use scrape_status::ScrapeStatus;
