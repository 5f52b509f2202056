// Presentation layer - HTTP, WebSocket and terminal surfaces
pub mod app_state;
pub mod handlers;
pub mod terminal;
pub mod ws;
