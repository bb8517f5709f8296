pub mod app;
pub mod config;
pub mod controller;
pub mod error;
pub mod history;
pub mod host;
pub mod sessions;
pub mod utils;
pub mod widget_traits;
pub mod widgets;
pub mod workspace;
