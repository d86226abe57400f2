//! Web front end: HTML board, task forms, static files and the terminal
//! WebSocket.

pub mod form;
mod server;
pub mod templates;
pub mod ws;

pub use server::{AppState, PAGE_TITLE, build_router, start_server};
