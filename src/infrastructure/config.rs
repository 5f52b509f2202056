use crate::application::line_parser::DEFAULT_HEADER_MARKER;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    pub server: ServerSettings,
    pub source: SourceSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Device,
    Tcp,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceSettings {
    pub kind: SourceKind,
    pub path: String,
    pub header_marker: String,
    pub reconnect_secs: u64,
    pub channel_capacity: usize,
}

/// Defaults, then `config/feed.*` if present, then `ARTEMIS__SECTION__KEY` variables
pub fn load_feed_config() -> anyhow::Result<FeedConfig> {
    load_feed_config_from("config/feed")
}

pub fn load_feed_config_from(file: &str) -> anyhow::Result<FeedConfig> {
    let settings = config::Config::builder()
        .set_default("server.bind", "0.0.0.0:8080")?
        .set_default("source.kind", "device")?
        .set_default("source.path", "/dev/ttyUSB0")?
        .set_default("source.header_marker", DEFAULT_HEADER_MARKER)?
        .set_default("source.reconnect_secs", 5)?
        .set_default("source.channel_capacity", 256)?
        .add_source(config::File::with_name(file).required(false))
        .add_source(config::Environment::with_prefix("ARTEMIS").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}
