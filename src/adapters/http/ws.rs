use axum::extract::ws::{WebSocketUpgrade, WebSocket, Message};
use axum::extract::State;
use std::time::Instant;
use tokio::sync::broadcast::error::RecvError;
use crate::adapters::http::state::HttpState;
use crate::application::streaming::DeviceEvent;
use crate::domain::stream::{FrameMeta, WsFrameMetaMessage};

pub async fn ws_handler(ws: WebSocketUpgrade, State(st): State<HttpState>) -> impl axum::response::IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, st))
}

async fn handle_socket(mut socket: WebSocket, st: HttpState) {
    let mut rx = st.devices.subscribe_events();
    let mut fps_est: f32 = 0.0;
    let mut last_t = Instant::now();

    loop {
        let frame = match rx.recv().await {
            Ok(DeviceEvent::FrameReceived(frame)) => frame,
            Ok(DeviceEvent::PhotoTaken(_)) => continue,
            // Un cliente lento pierde frames, no la conexión.
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => break,
        };

        let dt = last_t.elapsed().as_secs_f32().max(0.001);
        last_t = Instant::now();
        fps_est = 0.9 * fps_est + 0.1 * (1.0 / dt);

        let meta = FrameMeta { width: frame.width, height: frame.height, sequence: frame.sequence, fps_est };
        let json = serde_json::to_string(&WsFrameMetaMessage { r#type: "frame".into(), meta }).unwrap_or_default();

        if socket.send(Message::Text(json.into())).await.is_err() { break; }
        if socket.send(Message::Binary(frame.jpeg.clone().into())).await.is_err() { break; }
    }
}
