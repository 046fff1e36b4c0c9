// Library for tests to access modules

pub mod adapters;
pub mod aggregator;
pub mod config;
pub mod error;
pub mod feed;
pub mod hwmon;
pub mod models;
pub mod render;
pub mod scheduler;
pub mod sysinfo_repo;
