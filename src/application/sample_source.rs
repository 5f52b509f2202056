// Source trait for raw logger bytes
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::Stream;
use std::pin::Pin;

pub type ChunkStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

#[async_trait]
pub trait SampleSource: Send + Sync {
    /// Human readable location, used in logs
    fn describe(&self) -> String;

    /// Open the source and stream its bytes until EOF
    async fn open(&self) -> anyhow::Result<ChunkStream>;
}
