// Byte sources for the logger feed
use crate::application::sample_source::{ChunkStream, SampleSource};
use crate::infrastructure::config::{SourceKind, SourceSettings};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::stream::Stream;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

const READ_BUFFER_SIZE: usize = 4096;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to open device {path}: {source}")]
    Device {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// A character device, FIFO or plain file
#[derive(Debug, Clone)]
pub struct DeviceSource {
    path: String,
}

impl DeviceSource {
    pub fn new(path: String) -> Self {
        Self { path }
    }
}

#[async_trait]
impl SampleSource for DeviceSource {
    fn describe(&self) -> String {
        format!("device {}", self.path)
    }

    async fn open(&self) -> anyhow::Result<ChunkStream> {
        let file = tokio::fs::File::open(&self.path)
            .await
            .map_err(|source| SourceError::Device {
                path: self.path.clone(),
                source,
            })?;
        Ok(read_chunks(file))
    }
}

/// A serial-over-TCP bridge
#[derive(Debug, Clone)]
pub struct TcpSource {
    addr: String,
}

impl TcpSource {
    pub fn new(addr: String) -> Self {
        Self { addr }
    }
}

#[async_trait]
impl SampleSource for TcpSource {
    fn describe(&self) -> String {
        format!("tcp {}", self.addr)
    }

    async fn open(&self) -> anyhow::Result<ChunkStream> {
        let stream = tokio::net::TcpStream::connect(&self.addr)
            .await
            .map_err(|source| SourceError::Connect {
                addr: self.addr.clone(),
                source,
            })?;
        Ok(read_chunks(stream))
    }
}

pub fn source_from_settings(settings: &SourceSettings) -> Arc<dyn SampleSource> {
    match settings.kind {
        SourceKind::Device => Arc::new(DeviceSource::new(settings.path.clone())),
        SourceKind::Tcp => Arc::new(TcpSource::new(settings.path.clone())),
    }
}

/// Stream everything a reader produces as byte chunks, ending at EOF
fn read_chunks<R>(reader: R) -> ChunkStream
where
    R: AsyncRead + Unpin + Send + 'static,
{
    Box::pin(chunk_stream(reader))
}

fn chunk_stream<R>(mut reader: R) -> impl Stream<Item = std::io::Result<Bytes>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    async_stream::try_stream! {
        loop {
            let mut buf = BytesMut::with_capacity(READ_BUFFER_SIZE);
            let n = reader.read_buf(&mut buf).await?;
            if n == 0 {
                break;
            }
            yield buf.freeze();
        }
    }
}
