// Domain layer - Feed events and dashboard models
pub mod chart;
pub mod events;
pub mod selector;
