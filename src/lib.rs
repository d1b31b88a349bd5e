#![forbid(unsafe_code)]

//! Shared library behind the folio backend and its command-line tools.
//!
//! The interesting part is the channel scraper: [`scrape`] fetches a channel's
//! videos page, [`initial_data`] pulls the embedded JSON out of it, and
//! [`videos`] walks that tree (through [`json_path`]) into flat records.

pub mod config;
pub mod initial_data;
pub mod json_path;
pub mod logging;
pub mod scrape;
pub mod videos;
