// WebSocket client driving the dashboard controller
use crate::application::dashboard_controller::{DashboardController, EventSink, LocalClock};
use crate::domain::chart::{LineChart, Retention};
use crate::domain::events::{ClientEvent, ServerEvent};
use anyhow::Context;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub url: String,
    /// Columns to highlight (and submit) every time a header arrives
    pub columns: Vec<String>,
    pub retention: Retention,
}

impl EventSink for mpsc::UnboundedSender<ClientEvent> {
    fn emit(&mut self, event: ClientEvent) {
        if self.send(event).is_err() {
            tracing::debug!("Socket writer gone, dropping outbound event");
        }
    }
}

/// Connect to the feed server and run the dashboard until the socket closes.
/// `render` is called with the chart and the picker's value after every redraw.
pub async fn watch<F>(options: WatchOptions, mut render: F) -> anyhow::Result<()>
where
    F: FnMut(&LineChart, &str),
{
    let (socket, _) = connect_async(options.url.as_str())
        .await
        .with_context(|| format!("Failed to connect to {}", options.url))?;
    tracing::info!("Connected to {}", options.url);

    let (mut write, mut read) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ClientEvent>();

    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let frame = match event.to_frame() {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::error!("Failed to encode {:?}: {}", event, e);
                    continue;
                }
            };
            if write.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    let mut controller = DashboardController::new(tx, LocalClock, options.retention);

    while let Some(msg) = read.next().await {
        let text = match msg.context("WebSocket read failed")? {
            Message::Text(text) => text,
            Message::Close(_) => {
                tracing::info!("Server closed the connection");
                break;
            }
            _ => continue,
        };

        let event = match ServerEvent::from_frame(&text) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("Ignoring frame: {}", e);
                continue;
            }
        };

        let is_header = matches!(event, ServerEvent::HeaderData(_));
        let revision = controller.chart().revision();
        controller.handle(event);

        if is_header {
            let names: Vec<&str> = controller
                .selector()
                .options()
                .iter()
                .map(|o| o.text.as_str())
                .collect();
            tracing::info!("Available columns: {}", names.join(", "));
        }

        if is_header && !options.columns.is_empty() {
            controller.select_columns(&options.columns);
            controller.submit_selected_columns();
        }

        if controller.chart().revision() != revision {
            render(controller.chart(), controller.selector().value());
        }
    }

    writer.abort();
    Ok(())
}
