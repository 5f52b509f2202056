// Feed service - Ingests logger output and fans events out to subscribers
use crate::application::line_parser::LogLineParser;
use crate::application::sample_source::{ChunkStream, SampleSource};
use crate::domain::events::ServerEvent;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};

#[derive(Clone)]
pub struct FeedService {
    inner: Arc<FeedState>,
}

struct FeedState {
    events: broadcast::Sender<ServerEvent>,
    header: RwLock<Option<Vec<String>>>,
    selected_columns: RwLock<Vec<String>>,
    header_marker: String,
}

impl FeedService {
    pub fn new(header_marker: String, channel_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(channel_capacity.max(1));
        Self {
            inner: Arc::new(FeedState {
                events,
                header: RwLock::new(None),
                selected_columns: RwLock::new(Vec::new()),
                header_marker,
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.inner.events.subscribe()
    }

    /// Last header seen on the feed, replayed to clients when they connect
    pub async fn current_header(&self) -> Option<Vec<String>> {
        self.inner.header.read().await.clone()
    }

    pub async fn selected_columns(&self) -> Vec<String> {
        self.inner.selected_columns.read().await.clone()
    }

    pub async fn update_selected_columns(&self, columns: Vec<String>) {
        tracing::info!("Updated selected columns: {:?}", columns);
        *self.inner.selected_columns.write().await = columns;
    }

    /// Publish an event to every subscriber. Having none is fine.
    pub async fn publish(&self, event: ServerEvent) {
        if let ServerEvent::HeaderData(header) = &event {
            *self.inner.header.write().await = Some(header.clone());
        }
        if self.inner.events.send(event).is_err() {
            tracing::trace!("No subscribers for feed event");
        }
    }

    /// Consume one chunk stream through a fresh parser until it ends.
    pub async fn ingest(&self, mut stream: ChunkStream) -> anyhow::Result<()> {
        let mut parser = LogLineParser::new(self.inner.header_marker.clone());

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            let selected = self.selected_columns().await;
            for event in parser.push(&chunk, &selected) {
                self.publish(event).await;
            }
        }

        tracing::debug!("Stream ended with {} header columns", parser.header().len());
        Ok(())
    }

    /// Keep the source open, reopening it after `reconnect_delay` whenever it ends or fails.
    pub async fn run(&self, source: Arc<dyn SampleSource>, reconnect_delay: Duration) {
        loop {
            match source.open().await {
                Ok(stream) => {
                    tracing::info!("Reading samples from {}", source.describe());
                    match self.ingest(stream).await {
                        Ok(()) => tracing::warn!("Source {} reached end of stream", source.describe()),
                        Err(e) => tracing::error!("Error reading {}: {:#}", source.describe(), e),
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to open {}: {:#}", source.describe(), e);
                }
            }

            tokio::time::sleep(reconnect_delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails the first open, then serves a header and ends
    struct FlakySource {
        opens: AtomicUsize,
    }

    #[async_trait]
    impl SampleSource for FlakySource {
        fn describe(&self) -> String {
            "flaky test source".to_string()
        }

        async fn open(&self) -> anyhow::Result<ChunkStream> {
            if self.opens.fetch_add(1, Ordering::SeqCst) == 0 {
                anyhow::bail!("device not ready");
            }
            Ok(stream_of(&["rtcDate,temp\n"]))
        }
    }

    fn stream_of(chunks: &[&'static str]) -> ChunkStream {
        let items: Vec<std::io::Result<Bytes>> =
            chunks.iter().map(|c| Ok(Bytes::from_static(c.as_bytes()))).collect();
        Box::pin(futures::stream::iter(items))
    }

    #[tokio::test]
    async fn test_header_is_cached_and_broadcast() {
        let service = FeedService::new("rtcDate".into(), 16);
        let mut rx = service.subscribe();

        service.ingest(stream_of(&["boot\n", "rtcDate,temp\n"])).await.unwrap();

        assert_eq!(
            service.current_header().await,
            Some(vec!["rtcDate".to_string(), "temp".to_string()])
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            ServerEvent::HeaderData(vec!["rtcDate".into(), "temp".into()])
        );
    }

    #[tokio::test]
    async fn test_selected_columns_filter_ticks() {
        let service = FeedService::new("rtcDate".into(), 16);
        service.update_selected_columns(vec!["temp".into()]).await;
        let mut rx = service.subscribe();

        service
            .ingest(stream_of(&["rtcDate,temp,humidity\n", "1/1/2000,21.5,60\n"]))
            .await
            .unwrap();

        rx.recv().await.unwrap();
        match rx.recv().await.unwrap() {
            ServerEvent::SerialData(tick) => {
                assert_eq!(tick.len(), 1);
                assert_eq!(tick.get("temp"), Some(&21.5));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let service = FeedService::new("rtcDate".into(), 4);
        service.publish(ServerEvent::HeaderData(vec!["a".into()])).await;
        assert_eq!(service.current_header().await, Some(vec!["a".to_string()]));
    }

    #[tokio::test]
    async fn test_ingest_propagates_read_errors() {
        let service = FeedService::new("rtcDate".into(), 4);
        let items: Vec<std::io::Result<Bytes>> = vec![Err(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "unplugged",
        ))];
        assert!(service.ingest(Box::pin(futures::stream::iter(items))).await.is_err());
    }

    #[tokio::test]
    async fn test_run_reopens_source_after_failure() {
        let service = FeedService::new("rtcDate".into(), 16);
        let source = Arc::new(FlakySource { opens: AtomicUsize::new(0) });

        let runner = service.clone();
        let run_source: Arc<dyn SampleSource> = source.clone();
        let task = tokio::spawn(async move {
            runner.run(run_source, Duration::from_millis(10)).await;
        });

        tokio::time::timeout(Duration::from_secs(2), async {
            while service.current_header().await.is_none() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("header ingested after reopening");

        assert_eq!(
            service.current_header().await,
            Some(vec!["rtcDate".to_string(), "temp".to_string()])
        );
        assert!(source.opens.load(Ordering::SeqCst) >= 2);
        assert!(!task.is_finished());
        task.abort();
    }
}
