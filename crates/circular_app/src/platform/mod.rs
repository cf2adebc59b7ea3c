mod app;
mod config;
mod effects;
mod input;
mod logging;
mod render;
mod store;

pub use app::run_app;
