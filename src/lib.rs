//! Link scraping and library management for a home media setup.
//!
//! A scrape fetches an index page, extracts file-host links from it,
//! deduplicates them and, once confirmed, hands each link to the transfer
//! service. Metadata and list-tracking clients supply the titles to search for.

pub mod config;
pub mod credentials;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod hosts;
pub mod library;
pub mod links;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod premiumize;
pub mod targets;
pub mod tmdb;
pub mod trakt;
