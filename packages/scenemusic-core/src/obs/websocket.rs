//! OBS websocket v5 client.
//!
//! One background task owns the socket for the lifetime of a session. It
//! performs the Hello/Identify handshake, forwards queued requests, routes
//! responses back to their callers by request id and publishes notifications
//! to the [`EventHub`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{ObsError, ObsResult};
use crate::events::{CompositorEvent, EventHub, Subscription};
use crate::obs::auth::authentication_string;
use crate::obs::traits::{CompositorConnection, CompositorQueries};
use crate::obs::types::{
    parse_event, CurrentProgramSceneResponse, Envelope, EventFrame, Hello, InputInfo,
    InputListResponse, InputMuteResponse, InputSettingsResponse, InputVolumeResponse,
    RequestResponse, SceneItem, SceneItemEnabledResponse, SceneItemListResponse,
    SceneListResponse, SourceSettings,
};
use crate::protocol_constants::{
    EVENT_SUB_INPUTS, EVENT_SUB_SCENES, EVENT_SUB_SCENE_ITEMS, OBS_RPC_VERSION,
    OBS_WS_TIMEOUT_SECS, OP_EVENT, OP_HELLO, OP_IDENTIFIED, OP_IDENTIFY, OP_REQUEST,
    OP_REQUEST_RESPONSE,
};
use crate::runtime::{TaskSpawner, TokioSpawner};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Shared between the client handle and the session task.
struct Inner {
    hub: Arc<EventHub>,
    connected: AtomicBool,
    connecting: AtomicBool,
    /// Queue into the session task; `None` while no session is open.
    outgoing: Mutex<Option<mpsc::UnboundedSender<Message>>>,
    /// In-flight requests: request id -> response slot.
    pending: DashMap<String, oneshot::Sender<ObsResult<Value>>>,
    /// Cancels the current session. Replaced on every connection attempt.
    session_cancel: Mutex<CancellationToken>,
    ws_timeout: Duration,
}

impl Inner {
    fn handle_frame(&self, text: &str) {
        let envelope: Envelope = match serde_json::from_str(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                log::warn!("[Obs] Ignoring undecodable frame: {}", e);
                return;
            }
        };

        match envelope.op {
            OP_EVENT => {
                let Ok(frame) = serde_json::from_value::<EventFrame>(envelope.d) else {
                    log::warn!("[Obs] Ignoring malformed event frame");
                    return;
                };
                if let Some(event) = parse_event(&frame.event_type, &frame.event_data) {
                    log::debug!("[Obs] Event {}", frame.event_type);
                    self.hub.publish(event);
                }
            }
            OP_REQUEST_RESPONSE => {
                let response = match serde_json::from_value::<RequestResponse>(envelope.d) {
                    Ok(response) => response,
                    Err(e) => {
                        log::warn!("[Obs] Ignoring malformed response: {}", e);
                        return;
                    }
                };
                let Some((_, slot)) = self.pending.remove(&response.request_id) else {
                    log::debug!(
                        "[Obs] Response for unknown request {}",
                        response.request_id
                    );
                    return;
                };
                let result = if response.request_status.result {
                    Ok(response.response_data.unwrap_or(Value::Null))
                } else {
                    Err(ObsError::RequestFailed {
                        request_type: response.request_type,
                        code: response.request_status.code,
                        comment: response.request_status.comment.unwrap_or_default(),
                    })
                };
                let _ = slot.send(result);
            }
            op => log::debug!("[Obs] Ignoring frame with op {}", op),
        }
    }

    fn fail_pending(&self) {
        let ids: Vec<String> = self.pending.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            if let Some((_, slot)) = self.pending.remove(&id) {
                let _ = slot.send(Err(ObsError::NotConnected));
            }
        }
    }
}

/// OBS websocket v5 client.
pub struct ObsWebSocketClient {
    inner: Arc<Inner>,
    spawner: TokioSpawner,
}

impl ObsWebSocketClient {
    /// Creates a client with the default websocket timeout.
    pub fn new(spawner: TokioSpawner) -> Self {
        Self::with_timeout(spawner, Duration::from_secs(OBS_WS_TIMEOUT_SECS))
    }

    pub fn with_timeout(spawner: TokioSpawner, ws_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                hub: Arc::new(EventHub::new()),
                connected: AtomicBool::new(false),
                connecting: AtomicBool::new(false),
                outgoing: Mutex::new(None),
                pending: DashMap::new(),
                session_cancel: Mutex::new(CancellationToken::new()),
                ws_timeout,
            }),
            spawner,
        }
    }

    /// Closes the current session, if any.
    pub fn disconnect(&self) {
        self.inner.session_cancel.lock().cancel();
    }

    async fn request<T: DeserializeOwned>(&self, request_type: &str, data: Value) -> ObsResult<T> {
        let tx = self
            .inner
            .outgoing
            .lock()
            .clone()
            .ok_or(ObsError::NotConnected)?;

        let request_id = Uuid::new_v4().to_string();
        let (slot, response) = oneshot::channel();
        self.inner.pending.insert(request_id.clone(), slot);

        let mut d = json!({ "requestType": request_type, "requestId": request_id });
        if !data.is_null() {
            d["requestData"] = data;
        }
        let frame = json!({ "op": OP_REQUEST, "d": d }).to_string();

        if tx.send(Message::Text(frame.into())).is_err() {
            self.inner.pending.remove(&request_id);
            return Err(ObsError::NotConnected);
        }

        let value = match tokio::time::timeout(self.inner.ws_timeout, response).await {
            Ok(Ok(result)) => result?,
            Ok(Err(_)) => return Err(ObsError::NotConnected),
            Err(_) => {
                self.inner.pending.remove(&request_id);
                return Err(ObsError::Timeout(request_type.to_string()));
            }
        };

        serde_json::from_value(value)
            .map_err(|e| ObsError::InvalidResponse(format!("{request_type}: {e}")))
    }
}

#[async_trait]
impl CompositorConnection for ObsWebSocketClient {
    async fn connect(&self, url: &str, password: &str) -> ObsResult<()> {
        let parsed =
            url::Url::parse(url).map_err(|e| ObsError::WebSocket(format!("{url}: {e}")))?;
        if !matches!(parsed.scheme(), "ws" | "wss") {
            return Err(ObsError::WebSocket(format!("{url}: not a websocket URL")));
        }

        if self.inner.connected.load(Ordering::SeqCst)
            || self.inner.connecting.swap(true, Ordering::SeqCst)
        {
            return Ok(());
        }

        let cancel = {
            let mut guard = self.inner.session_cancel.lock();
            guard.cancel();
            *guard = CancellationToken::new();
            guard.clone()
        };

        self.spawner.spawn(run_session(
            Arc::clone(&self.inner),
            url.to_string(),
            password.to_string(),
            cancel,
        ));
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    fn ws_timeout(&self) -> Duration {
        self.inner.ws_timeout
    }

    fn subscribe(&self) -> Subscription {
        self.inner.hub.subscribe()
    }
}

#[async_trait]
impl CompositorQueries for ObsWebSocketClient {
    async fn list_scenes(&self) -> ObsResult<Vec<String>> {
        let response: SceneListResponse = self.request("GetSceneList", Value::Null).await?;
        Ok(response.scenes.into_iter().map(|s| s.scene_name).collect())
    }

    async fn list_scene_items(&self, scene_name: &str) -> ObsResult<Vec<SceneItem>> {
        let response: SceneItemListResponse = self
            .request("GetSceneItemList", json!({ "sceneName": scene_name }))
            .await?;
        Ok(response.scene_items)
    }

    async fn get_scene_item_enabled(&self, scene_name: &str, item_id: i64) -> ObsResult<bool> {
        let response: SceneItemEnabledResponse = self
            .request(
                "GetSceneItemEnabled",
                json!({ "sceneName": scene_name, "sceneItemId": item_id }),
            )
            .await?;
        Ok(response.scene_item_enabled)
    }

    async fn list_inputs(&self, kind: Option<&str>) -> ObsResult<Vec<InputInfo>> {
        let data = match kind {
            Some(kind) => json!({ "inputKind": kind }),
            None => Value::Null,
        };
        let response: InputListResponse = self.request("GetInputList", data).await?;
        Ok(response.inputs)
    }

    async fn get_input_settings(&self, input_name: &str) -> ObsResult<SourceSettings> {
        let response: InputSettingsResponse = self
            .request("GetInputSettings", json!({ "inputName": input_name }))
            .await?;
        Ok(response.input_settings)
    }

    async fn get_input_volume(&self, input_name: &str) -> ObsResult<f64> {
        let response: InputVolumeResponse = self
            .request("GetInputVolume", json!({ "inputName": input_name }))
            .await?;
        Ok(response.input_volume_mul)
    }

    async fn get_input_mute(&self, input_name: &str) -> ObsResult<bool> {
        let response: InputMuteResponse = self
            .request("GetInputMute", json!({ "inputName": input_name }))
            .await?;
        Ok(response.input_muted)
    }

    async fn get_current_program_scene(&self) -> ObsResult<String> {
        let response: CurrentProgramSceneResponse = self
            .request("GetCurrentProgramScene", Value::Null)
            .await?;
        Ok(response.current_program_scene_name)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session task
// ─────────────────────────────────────────────────────────────────────────────

async fn run_session(inner: Arc<Inner>, url: String, password: String, cancel: CancellationToken) {
    let established = tokio::select! {
        _ = cancel.cancelled() => {
            inner.connecting.store(false, Ordering::SeqCst);
            return;
        }
        result = tokio::time::timeout(inner.ws_timeout, handshake(&url, &password)) => result,
    };

    let ws = match established {
        Ok(Ok(ws)) => ws,
        Ok(Err(e)) => {
            log::warn!("[Obs] Connection to {} failed: {}", url, e);
            inner.connecting.store(false, Ordering::SeqCst);
            return;
        }
        Err(_) => {
            log::warn!("[Obs] Connection to {} timed out", url);
            inner.connecting.store(false, Ordering::SeqCst);
            return;
        }
    };

    let (mut sink, mut stream) = ws.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    *inner.outgoing.lock() = Some(tx);
    inner.connected.store(true, Ordering::SeqCst);
    inner.connecting.store(false, Ordering::SeqCst);

    log::info!("[Obs] Connected to {}", url);
    inner.hub.publish(CompositorEvent::Connected);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
            Some(message) = rx.recv() => {
                if let Err(e) = sink.send(message).await {
                    log::warn!("[Obs] Send failed: {}", e);
                    break;
                }
            }
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => inner.handle_frame(text.as_str()),
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    log::warn!("[Obs] Read failed: {}", e);
                    break;
                }
            },
        }
    }

    inner.outgoing.lock().take();
    inner.connected.store(false, Ordering::SeqCst);
    inner.fail_pending();

    log::info!("[Obs] Disconnected from {}", url);
    inner.hub.publish(CompositorEvent::Disconnected);
}

async fn handshake(url: &str, password: &str) -> ObsResult<WsStream> {
    let (mut ws, _) = tokio_tungstenite::connect_async(url).await?;

    let hello: Hello = serde_json::from_value(read_op(&mut ws, OP_HELLO).await?)
        .map_err(|e| ObsError::Handshake(format!("invalid Hello: {e}")))?;

    let mut identify = json!({
        "rpcVersion": OBS_RPC_VERSION,
        "eventSubscriptions": EVENT_SUB_SCENES | EVENT_SUB_INPUTS | EVENT_SUB_SCENE_ITEMS,
    });
    if let Some(auth) = hello.authentication {
        identify["authentication"] =
            json!(authentication_string(password, &auth.salt, &auth.challenge));
    }

    let frame = json!({ "op": OP_IDENTIFY, "d": identify }).to_string();
    ws.send(Message::Text(frame.into())).await?;

    read_op(&mut ws, OP_IDENTIFIED).await?;
    Ok(ws)
}

/// Reads frames until one with the given op arrives.
async fn read_op(ws: &mut WsStream, op: u8) -> ObsResult<Value> {
    while let Some(frame) = ws.next().await {
        match frame? {
            Message::Text(text) => {
                let envelope: Envelope = serde_json::from_str(text.as_str())
                    .map_err(|e| ObsError::Handshake(e.to_string()))?;
                if envelope.op == op {
                    return Ok(envelope.d);
                }
            }
            Message::Close(frame) => {
                let reason = frame
                    .map(|f| format!("{} {}", u16::from(f.code), f.reason.as_str()))
                    .unwrap_or_default();
                return Err(ObsError::Handshake(format!("closed by OBS: {reason}")));
            }
            _ => {}
        }
    }
    Err(ObsError::Handshake("connection closed".into()))
}
