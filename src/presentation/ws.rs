// WebSocket connection handling for dashboard clients

use crate::domain::events::{ClientEvent, ServerEvent};
use crate::presentation::app_state::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, error, info, warn};

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = BroadcastStream::new(state.feed_service.subscribe());

    info!("Dashboard client connected");

    if let Some(header) = state.feed_service.current_header().await {
        if send_event(&mut sender, &ServerEvent::HeaderData(header)).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            event = events.next() => match event {
                Some(Ok(event)) => {
                    if send_event(&mut sender, &event).await.is_err() {
                        break;
                    }
                }
                Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                    warn!("Dashboard client lagged, skipped {} events", skipped);
                }
                None => break,
            },
            msg = receiver.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    if handle_text_message(&text, &state, &mut sender).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Ping(data))) => {
                    if sender.send(Message::Pong(data)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    debug!("Dashboard client sent close frame");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    error!("WebSocket error: {}", e);
                    break;
                }
            },
        }
    }

    info!("Dashboard client disconnected");
}

async fn handle_text_message(
    text: &str,
    state: &Arc<AppState>,
    sender: &mut SplitSink<WebSocket, Message>,
) -> Result<(), axum::Error> {
    let event = match ClientEvent::from_frame(text) {
        Ok(event) => event,
        Err(e) => {
            warn!("Ignoring client frame: {}", e);
            return Ok(());
        }
    };

    match event {
        ClientEvent::UpdateSelectedColumns(columns) => {
            state.feed_service.update_selected_columns(columns.clone()).await;
            let ack = ServerEvent::ColumnsUpdated { columns };
            send_event(sender, &ack).await
        }
    }
}

async fn send_event(
    sender: &mut SplitSink<WebSocket, Message>,
    event: &ServerEvent,
) -> Result<(), axum::Error> {
    let frame = match event.to_frame() {
        Ok(frame) => frame,
        Err(e) => {
            error!("Failed to encode {:?}: {}", event, e);
            return Ok(());
        }
    };
    sender.send(Message::Text(frame.into())).await
}

#[cfg(test)]
mod tests {
    use crate::application::feed_service::FeedService;
    use crate::domain::events::{ClientEvent, DataTick, ServerEvent};
    use crate::presentation::app_state::AppState;
    use crate::presentation::handlers::router;
    use futures::{SinkExt, StreamExt};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio_tungstenite::{connect_async, tungstenite::Message};

    async fn spawn_http(service: FeedService) -> std::net::SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(Arc::new(AppState { feed_service: service }));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    async fn spawn_server(service: FeedService) -> String {
        format!("ws://{}/ws", spawn_http(service).await)
    }

    async fn next_event<S>(read: &mut S) -> ServerEvent
    where
        S: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
    {
        loop {
            let msg = tokio::time::timeout(Duration::from_secs(2), read.next())
                .await
                .expect("frame within timeout")
                .expect("socket open")
                .expect("valid frame");
            if let Message::Text(text) = msg {
                return ServerEvent::from_frame(&text).unwrap();
            }
        }
    }

    #[tokio::test]
    async fn test_cached_header_is_sent_on_connect() {
        let service = FeedService::new("rtcDate".into(), 16);
        service
            .publish(ServerEvent::HeaderData(vec!["rtcDate".into(), "temp".into()]))
            .await;
        let url = spawn_server(service).await;

        let (socket, _) = connect_async(url.as_str()).await.unwrap();
        let (_write, mut read) = socket.split();

        assert_eq!(
            next_event(&mut read).await,
            ServerEvent::HeaderData(vec!["rtcDate".into(), "temp".into()])
        );
    }

    #[tokio::test]
    async fn test_update_selected_columns_is_acknowledged() {
        let service = FeedService::new("rtcDate".into(), 16);
        let url = spawn_server(service.clone()).await;

        let (socket, _) = connect_async(url.as_str()).await.unwrap();
        let (mut write, mut read) = socket.split();

        let frame = ClientEvent::UpdateSelectedColumns(vec!["temp".into()]).to_frame().unwrap();
        write.send(Message::Text(frame.into())).await.unwrap();

        assert_eq!(
            next_event(&mut read).await,
            ServerEvent::ColumnsUpdated { columns: vec!["temp".into()] }
        );
        assert_eq!(service.selected_columns().await, vec!["temp".to_string()]);
    }

    #[tokio::test]
    async fn test_broadcast_events_are_forwarded() {
        let service = FeedService::new("rtcDate".into(), 16);
        let url = spawn_server(service.clone()).await;

        let (socket, _) = connect_async(url.as_str()).await.unwrap();
        let (mut write, mut read) = socket.split();

        // Round trip an update so the connection is subscribed before publishing
        let frame = ClientEvent::UpdateSelectedColumns(vec![]).to_frame().unwrap();
        write.send(Message::Text(frame.into())).await.unwrap();
        next_event(&mut read).await;

        let mut tick = DataTick::new();
        tick.insert("temp".into(), 21.5);
        service.publish(ServerEvent::SerialData(tick.clone())).await;

        assert_eq!(next_event(&mut read).await, ServerEvent::SerialData(tick));
    }

    #[tokio::test]
    async fn test_malformed_frame_keeps_connection_open() {
        let service = FeedService::new("rtcDate".into(), 16);
        let url = spawn_server(service.clone()).await;

        let (socket, _) = connect_async(url.as_str()).await.unwrap();
        let (mut write, mut read) = socket.split();

        write.send(Message::Text("{not json".into())).await.unwrap();
        let frame = ClientEvent::UpdateSelectedColumns(vec!["a".into()]).to_frame().unwrap();
        write.send(Message::Text(frame.into())).await.unwrap();

        assert_eq!(
            next_event(&mut read).await,
            ServerEvent::ColumnsUpdated { columns: vec!["a".into()] }
        );
    }

    #[tokio::test]
    async fn test_lagging_client_keeps_receiving() {
        let service = FeedService::new("rtcDate".into(), 1);
        let url = spawn_server(service.clone()).await;

        let (socket, _) = connect_async(url.as_str()).await.unwrap();
        let (mut write, mut read) = socket.split();

        let frame = ClientEvent::UpdateSelectedColumns(vec![]).to_frame().unwrap();
        write.send(Message::Text(frame.into())).await.unwrap();
        next_event(&mut read).await;

        // Publishing never yields, so the connection task falls behind the capacity-1 channel
        for value in 1..=5 {
            let mut tick = DataTick::new();
            tick.insert("temp".into(), value as f64);
            service.publish(ServerEvent::SerialData(tick)).await;
        }

        let mut last = DataTick::new();
        last.insert("temp".into(), 5.0);
        assert_eq!(next_event(&mut read).await, ServerEvent::SerialData(last));

        let frame = ClientEvent::UpdateSelectedColumns(vec!["temp".into()]).to_frame().unwrap();
        write.send(Message::Text(frame.into())).await.unwrap();
        assert_eq!(
            next_event(&mut read).await,
            ServerEvent::ColumnsUpdated { columns: vec!["temp".into()] }
        );
    }

    #[tokio::test]
    async fn test_ping_is_answered_with_pong() {
        let service = FeedService::new("rtcDate".into(), 16);
        let url = spawn_server(service).await;

        let (socket, _) = connect_async(url.as_str()).await.unwrap();
        let (mut write, mut read) = socket.split();

        write.send(Message::Ping(bytes::Bytes::from_static(&[1, 2, 3]))).await.unwrap();

        let payload = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                match read.next().await {
                    Some(Ok(Message::Pong(payload))) => return payload,
                    Some(Ok(_)) => continue,
                    other => panic!("connection ended: {:?}", other),
                }
            }
        })
        .await
        .expect("pong within timeout");
        assert_eq!(&payload[..], &[1, 2, 3]);
    }

    #[tokio::test]
    async fn test_healthz_returns_ok() {
        let service = FeedService::new("rtcDate".into(), 16);
        let addr = spawn_http(service).await;

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /healthz HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200 OK"), "{}", response);
        assert!(response.ends_with("\r\n\r\nok"), "{}", response);
    }
}
