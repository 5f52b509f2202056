// Application layer - Use cases over the domain models
pub mod dashboard_controller;
pub mod feed_service;
pub mod line_parser;
pub mod sample_source;
