#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Headless adapter that plays geotoken sessions from the command line.

pub mod actions;
pub mod config;
pub mod map;
pub mod session;
pub mod trace;

pub use actions::Action;
pub use config::Settings;
pub use session::Session;
pub use trace::TraceFeed;
