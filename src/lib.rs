pub mod api;
pub mod backend;
pub mod cli;
pub mod core;
pub mod google;
pub mod jobs;
pub mod sync;
