pub mod cleaner;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod kpi;
pub mod loader;
pub mod logging;
pub mod report;
pub mod source;
