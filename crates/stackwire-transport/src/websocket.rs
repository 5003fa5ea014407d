//! WebSocket bus using `tokio-tungstenite`: a broker server and its client.

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::registry::{SubscriberId, TopicRegistry};
use crate::{Frame, MemoryBus, Message, MessageBus, QoS, Subscription, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Outbound deliveries buffered per broker connection.
const CONNECTION_QUEUE: usize = 256;

type ServerSink = SplitSink<WebSocketStream<TcpStream>, WsMessage>;
type ClientStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Identifies one client connection to a [`BrokerServer`] in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// BrokerServer
// ---------------------------------------------------------------------------

/// A retained pub/sub broker served over WebSocket.
///
/// The topic table is a [`MemoryBus`]'s, so in-process clients of that bus
/// and remote [`WebSocketBus`] clients share topics and retained payloads.
pub struct BrokerServer {
    listener: TcpListener,
    bus: MemoryBus,
}

impl BrokerServer {
    /// Binds a broker with a fresh topic table.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        Self::bind_with(addr, MemoryBus::new()).await
    }

    /// Binds a broker serving the topics of an existing `bus`.
    pub async fn bind_with(addr: &str, bus: MemoryBus) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "broker listening");
        Ok(Self { listener, bus })
    }

    /// The address actually bound (useful after binding port 0).
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// An in-process client of this broker.
    pub fn bus(&self) -> &MemoryBus {
        &self.bus
    }

    /// Runs the accept loop until the task is dropped.
    ///
    /// Each connection gets its own task. A failed accept is logged and
    /// the loop keeps going.
    pub async fn run(self) -> Result<(), TransportError> {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let id = ConnectionId::next();
                    let registry = Arc::clone(self.bus.registry());
                    tracing::debug!(%id, %addr, "accepted broker connection");
                    tokio::spawn(async move {
                        if let Err(e) = serve_connection(stream, id, registry).await {
                            tracing::debug!(%id, error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

async fn serve_connection(
    stream: TcpStream,
    id: ConnectionId,
    registry: Arc<Mutex<TopicRegistry>>,
) -> Result<(), TransportError> {
    let ws = tokio_tungstenite::accept_async(stream).await.map_err(|e| {
        TransportError::AcceptFailed(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            e,
        ))
    })?;
    let (mut sink, mut stream) = ws.split();
    let (tx, mut outbound) = mpsc::channel::<Message>(CONNECTION_QUEUE);
    let sub_id = registry.lock().await.next_subscriber_id();

    let result = loop {
        tokio::select! {
            incoming = stream.next() => {
                let frame = match incoming {
                    Some(Ok(WsMessage::Text(text))) => Frame::from_json(text.as_bytes()),
                    Some(Ok(WsMessage::Binary(data))) => Frame::from_json(&data),
                    Some(Ok(WsMessage::Close(_))) | None => break Ok(()),
                    Some(Ok(_)) => continue, // ping/pong
                    Some(Err(e)) => break Err(TransportError::ConnectionClosed(e.to_string())),
                };
                let reply = match frame {
                    Ok(frame) => handle_frame(frame, id, sub_id, &tx, &registry).await,
                    Err(e) => Some(Frame::Error {
                        message: format!("malformed frame: {e}"),
                    }),
                };
                if let Some(reply) = reply {
                    if let Err(e) = send_frame(&mut sink, &reply).await {
                        break Err(e);
                    }
                }
            }
            Some(msg) = outbound.recv() => {
                let frame = Frame::Deliver { topic: msg.topic, payload: msg.payload };
                if let Err(e) = send_frame(&mut sink, &frame).await {
                    break Err(e);
                }
            }
        }
    };

    registry.lock().await.unsubscribe(sub_id);
    tracing::debug!(%id, "broker connection closed");
    result
}

/// Applies one client frame. Returns the reply to send, if any.
async fn handle_frame(
    frame: Frame,
    id: ConnectionId,
    sub_id: SubscriberId,
    tx: &mpsc::Sender<Message>,
    registry: &Mutex<TopicRegistry>,
) -> Option<Frame> {
    match frame {
        Frame::Subscribe { topic } => {
            registry.lock().await.subscribe(&topic, sub_id, tx.clone());
            tracing::debug!(%id, %topic, "client subscribed");
            Some(Frame::SubAck { topic })
        }
        Frame::Publish {
            topic,
            payload,
            retain,
        } => {
            let len = payload.len();
            let delivered = registry.lock().await.publish(&topic, payload, retain);
            tracing::debug!(%id, %topic, retain, len, delivered, "client published");
            None
        }
        other => Some(Frame::Error {
            message: format!("unexpected frame from client: {other:?}"),
        }),
    }
}

async fn send_frame(sink: &mut ServerSink, frame: &Frame) -> Result<(), TransportError> {
    let text = frame
        .to_json()
        .map_err(|e| TransportError::ConnectionClosed(e.to_string()))?;
    sink.send(WsMessage::Text(text.into()))
        .await
        .map_err(|e| TransportError::ConnectionClosed(e.to_string()))
}

// ---------------------------------------------------------------------------
// WebSocketBus
// ---------------------------------------------------------------------------

/// A [`MessageBus`] client connected to a [`BrokerServer`].
///
/// One background task reads the socket and routes deliveries to local
/// subscriptions. Clones share the connection.
#[derive(Clone)]
pub struct WebSocketBus {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    url: String,
    sink: Mutex<SplitSink<ClientStream, WsMessage>>,
    routes: Arc<Mutex<Routes>>,
    reader: JoinHandle<()>,
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// Local subscribers and subscriptions awaiting their `SubAck`.
#[derive(Default)]
struct Routes {
    subscribers: HashMap<String, Vec<mpsc::Sender<Message>>>,
    pending_acks: HashMap<String, Vec<oneshot::Sender<()>>>,
    closed: bool,
}

impl Routes {
    fn deliver(&mut self, msg: Message) {
        let Some(subs) = self.subscribers.get_mut(&msg.topic) else {
            tracing::debug!(topic = %msg.topic, "delivery for unknown topic");
            return;
        };
        subs.retain(|tx| match tx.try_send(msg.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(topic = %msg.topic, "subscription queue full, delivery dropped");
                true
            }
            Err(TrySendError::Closed(_)) => false,
        });
    }

    fn ack(&mut self, topic: &str) {
        for waiter in self.pending_acks.remove(topic).unwrap_or_default() {
            let _ = waiter.send(());
        }
    }

    /// Ends every local subscription and fails pending subscribes.
    fn close(&mut self) {
        self.closed = true;
        self.subscribers.clear();
        self.pending_acks.clear();
    }
}

impl WebSocketBus {
    /// Connects to a broker at `url` (e.g. `ws://127.0.0.1:1883`).
    pub async fn connect(url: &str) -> Result<Self, TransportError> {
        let (ws, _) = tokio_tungstenite::connect_async(url).await.map_err(|e| {
            TransportError::ConnectFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        })?;
        let (sink, stream) = ws.split();
        let routes = Arc::new(Mutex::new(Routes::default()));
        let reader = tokio::spawn(read_loop(stream, Arc::clone(&routes)));
        tracing::info!(url, "connected to broker");

        Ok(Self {
            inner: Arc::new(ClientInner {
                url: url.to_string(),
                sink: Mutex::new(sink),
                routes,
                reader,
            }),
        })
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// Sends a close frame. Local subscriptions end when the broker
    /// acknowledges.
    pub async fn close(&self) -> Result<(), TransportError> {
        self.inner
            .sink
            .lock()
            .await
            .close()
            .await
            .map_err(|e| TransportError::ConnectionClosed(e.to_string()))
    }

    async fn send(&self, frame: &Frame) -> Result<(), String> {
        let text = frame.to_json().map_err(|e| e.to_string())?;
        self.inner
            .sink
            .lock()
            .await
            .send(WsMessage::Text(text.into()))
            .await
            .map_err(|e| e.to_string())
    }
}

async fn read_loop(mut stream: SplitStream<ClientStream>, routes: Arc<Mutex<Routes>>) {
    let reason = loop {
        let frame = match stream.next().await {
            Some(Ok(WsMessage::Text(text))) => Frame::from_json(text.as_bytes()),
            Some(Ok(WsMessage::Binary(data))) => Frame::from_json(&data),
            Some(Ok(WsMessage::Close(_))) | None => break "closed by broker".to_string(),
            Some(Ok(_)) => continue,
            Some(Err(e)) => break e.to_string(),
        };
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed frame from broker");
                continue;
            }
        };

        let mut routes = routes.lock().await;
        match frame {
            Frame::Deliver { topic, payload } => {
                tracing::trace!(%topic, len = payload.len(), "delivery");
                routes.deliver(Message { topic, payload });
            }
            Frame::SubAck { topic } => routes.ack(&topic),
            Frame::Error { message } => {
                tracing::warn!(%message, "broker reported an error");
            }
            other => {
                tracing::debug!(?other, "ignoring unexpected frame from broker");
            }
        }
    };

    tracing::info!(%reason, "broker connection ended");
    routes.lock().await.close();
}

impl MessageBus for WebSocketBus {
    async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        retain: bool,
        qos: QoS,
    ) -> Result<(), TransportError> {
        let len = payload.len();
        let frame = Frame::Publish {
            topic: topic.to_string(),
            payload,
            retain,
        };
        self.send(&frame)
            .await
            .map_err(|reason| TransportError::PublishFailed {
                topic: topic.to_string(),
                reason,
            })?;
        tracing::debug!(topic, retain, ?qos, len, "published");
        Ok(())
    }

    async fn subscribe(
        &self,
        topic: &str,
        qos: QoS,
        capacity: usize,
    ) -> Result<Subscription, TransportError> {
        if capacity == 0 {
            return Err(TransportError::SubscribeFailed {
                topic: topic.to_string(),
                reason: "queue capacity must be at least 1".to_string(),
            });
        }
        let (tx, rx) = mpsc::channel(capacity);
        let (ack_tx, ack_rx) = oneshot::channel();
        {
            let mut routes = self.inner.routes.lock().await;
            if routes.closed {
                return Err(TransportError::ConnectionClosed(
                    "broker connection ended".to_string(),
                ));
            }
            // Registered before the Subscribe goes out so the retained
            // delivery that follows the SubAck has somewhere to land.
            routes.subscribers.entry(topic.to_string()).or_default().push(tx);
            routes.pending_acks.entry(topic.to_string()).or_default().push(ack_tx);
        }

        let frame = Frame::Subscribe {
            topic: topic.to_string(),
        };
        self.send(&frame)
            .await
            .map_err(|reason| TransportError::SubscribeFailed {
                topic: topic.to_string(),
                reason,
            })?;
        ack_rx.await.map_err(|_| {
            TransportError::ConnectionClosed(format!("no acknowledgement for {topic}"))
        })?;

        tracing::debug!(topic, ?qos, "subscribed");
        Ok(Subscription::new(topic, rx))
    }
}
