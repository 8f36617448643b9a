pub mod app;
pub mod aws;
pub mod config;
pub mod directory;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod handler;
pub mod menu;
pub mod session;
pub mod signals;
pub mod transport;
pub mod tui;
pub mod ui;
