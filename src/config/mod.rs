//! Configuration module for Bizcrawl
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key has a default, so a run without a config file crawls the default
//! search with the default identity pools.
//!
//! # Example
//!
//! ```no_run
//! use bizcrawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("bizcrawl.toml")).unwrap();
//! println!("Detail concurrency: {}", config.crawler.concurrency);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, IdentityConfig, JitterWindow, OutputConfig, SearchConfig, SiteConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, load_proxy_list};
pub use validation::validate;
