// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod sample_sources;
pub mod ws_client;
