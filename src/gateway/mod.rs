//! HTTP/WebSocket gateway.
//!
//! Thin read-through surface over the local caches: list (payload fields
//! stripped), get-single (full fidelity), the out-of-band map stream, the
//! command endpoint and the `/ws/notify` subscription. Serving stops on the
//! process-wide shutdown signal.


use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use futures::SinkExt;
use futures::StreamExt;
use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;
use tracing::info;
use tracing::warn;
use warp::http::header::CONTENT_TYPE;
use warp::http::Response;
use warp::http::StatusCode;
use warp::hyper::Body;
use warp::ws::Message;
use warp::ws::WebSocket;
use warp::Filter;
use warp::Rejection;
use warp::Reply;

use crate::Cache;
use crate::Cleaning;
use crate::Dispatcher;
use crate::DispatchError;
use crate::GatewayConfig;
use crate::Hub;
use crate::ObjectKey;
use crate::ResourceKind;
use crate::ResourceList;
use crate::Result;
use crate::SystemError;
use crate::Vacuum;
use crate::WatchedResource;

/// Everything the request handlers need, injected by the composition root.
pub struct GatewayContext {
    pub vacuums: Arc<Cache<Vacuum>>,
    pub cleanings: Arc<Cache<Cleaning>>,
    pub hub: Arc<Hub>,
    pub dispatcher: Arc<Dispatcher>,
}

pub struct Gateway {
    context: Arc<GatewayContext>,
    config: GatewayConfig,
}

impl Gateway {
    pub fn new(context: Arc<GatewayContext>, config: GatewayConfig) -> Self {
        Self { context, config }
    }

    pub async fn serve(&self, shutdown: watch::Receiver<()>) -> Result<()> {
        let api = routes(self.context.clone());
        match &self.config.static_dir {
            Some(dir) => {
                info!(wwwroot = %dir.display(), "handling static assets");
                let filter = api.or(warp::fs::dir(dir.clone()));
                Self::bind(filter, self.config.listen_address, shutdown).await
            }
            None => Self::bind(api, self.config.listen_address, shutdown).await,
        }
    }

    async fn bind<F>(filter: F, addr: SocketAddr, mut shutdown: watch::Receiver<()>) -> Result<()>
    where
        F: Filter<Error = Rejection> + Clone + Send + Sync + 'static,
        F::Extract: Reply,
    {
        let (bound, server) = warp::serve(filter)
            .try_bind_with_graceful_shutdown(addr, async move {
                let _ = shutdown.changed().await;
            })
            .map_err(|e| SystemError::Bind {
                addr,
                source: Box::new(e),
            })?;
        info!(listen = %bound, "gateway listening");
        server.await;
        info!("gateway stopped");
        Ok(())
    }
}

/// The full route table. Split out of [`Gateway`] so tests can drive it with
/// `warp::test`.
pub fn routes(
    context: Arc<GatewayContext>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let ctx = warp::any().map(move || context.clone());

    let map = warp::path!("apis" / "fleet" / "v1alpha1" / "namespaces" / String / String / String / "map")
        .and(warp::get())
        .and(ctx.clone())
        .and_then(handle_map);

    let single = warp::path!("apis" / "fleet" / "v1alpha1" / "namespaces" / String / String / String)
        .and(warp::get())
        .and(ctx.clone())
        .and_then(handle_single);

    let list = warp::path!("apis" / "fleet" / "v1alpha1" / String)
        .and(warp::get())
        .and(ctx.clone())
        .and_then(handle_list);

    let command = warp::path!(
        "apis" / "fleet" / "v1alpha1" / "namespaces" / String / "vacuums" / String / "command" / String
    )
    .and(warp::post())
    .and(warp::body::bytes())
    .and(ctx.clone())
    .and_then(handle_command);

    let notify = warp::path!("ws" / "notify")
        .and(warp::ws())
        .and(ctx)
        .map(|ws: warp::ws::Ws, context: Arc<GatewayContext>| {
            let hub = context.hub.clone();
            ws.on_upgrade(move |socket| subscriber_session(socket, hub))
        });

    map.or(command).or(single).or(list).or(notify)
}

async fn handle_list(
    kind: String,
    ctx: Arc<GatewayContext>,
) -> std::result::Result<warp::reply::Response, Infallible> {
    Ok(match kind.parse::<ResourceKind>() {
        Ok(ResourceKind::Vacuums) => list_response(&ctx.vacuums),
        Ok(ResourceKind::Cleanings) => list_response(&ctx.cleanings),
        Err(_) => error_response(StatusCode::NOT_FOUND, &format!("kind {} not found", kind)),
    })
}

async fn handle_single(
    namespace: String,
    kind: String,
    name: String,
    ctx: Arc<GatewayContext>,
) -> std::result::Result<warp::reply::Response, Infallible> {
    let key = ObjectKey::new(&namespace, &name);
    Ok(match kind.parse::<ResourceKind>() {
        Ok(ResourceKind::Vacuums) => single_response(&ctx.vacuums, &key),
        Ok(ResourceKind::Cleanings) => single_response(&ctx.cleanings, &key),
        Err(_) => error_response(StatusCode::NOT_FOUND, &format!("kind {} does not exist", kind)),
    })
}

async fn handle_map(
    namespace: String,
    kind: String,
    name: String,
    ctx: Arc<GatewayContext>,
) -> std::result::Result<warp::reply::Response, Infallible> {
    let key = ObjectKey::new(&namespace, &name);
    Ok(match kind.parse::<ResourceKind>() {
        Ok(ResourceKind::Vacuums) => map_response(&ctx.vacuums, &key),
        Ok(ResourceKind::Cleanings) => map_response(&ctx.cleanings, &key),
        Err(_) => error_response(StatusCode::NOT_FOUND, &format!("kind {} does not exist", kind)),
    })
}

async fn handle_command(
    namespace: String,
    device: String,
    command: String,
    body: Bytes,
    ctx: Arc<GatewayContext>,
) -> std::result::Result<warp::reply::Response, Infallible> {
    match ctx.dispatcher.dispatch(&command, &namespace, &device, body).await {
        Ok(unit) => Ok(json_response(&serde_json::json!({ "unit": unit }))),
        Err(DispatchError::UnknownCommand(command)) => Ok(error_response(
            StatusCode::NOT_FOUND,
            &format!("invalid command {}", command),
        )),
        Err(error) => Ok(error_response(StatusCode::BAD_GATEWAY, &error.to_string())),
    }
}

/// One connected notification subscriber. Registered with the hub for the
/// connection's lifetime, deregistered exactly once on disconnect.
async fn subscriber_session(socket: WebSocket, hub: Arc<Hub>) {
    let (id, mut notifications) = hub.register();
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            payload = notifications.recv() => match payload {
                Some(payload) => {
                    let text = String::from_utf8_lossy(&payload).into_owned();
                    if sink.send(Message::text(text)).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            message = stream.next() => match message {
                Some(Ok(message)) if message.is_close() => break,
                Some(Ok(_)) => {} // inbound frames are ignored
                _ => break,
            },
        }
    }

    hub.unregister(id);
    debug!(subscriber = id, "websocket session closed");
}

fn list_response<R: WatchedResource>(cache: &Cache<R>) -> warp::reply::Response {
    let items: Vec<R> = cache.list().iter().map(WatchedResource::strip_payload).collect();
    json_response(&ResourceList { items })
}

fn single_response<R: WatchedResource>(cache: &Cache<R>, key: &ObjectKey) -> warp::reply::Response {
    match cache.get(key) {
        Some(object) => json_response(&object),
        None => error_response(StatusCode::NOT_FOUND, "not found"),
    }
}

fn map_response<R: WatchedResource>(cache: &Cache<R>, key: &ObjectKey) -> warp::reply::Response {
    match cache.get(key) {
        Some(object) => match object.map_data() {
            Some(data) => png_response(data.clone()),
            None => error_response(StatusCode::NOT_FOUND, "no map available"),
        },
        None => error_response(StatusCode::NOT_FOUND, "not found"),
    }
}

fn json_response<T: Serialize>(value: &T) -> warp::reply::Response {
    warp::reply::json(value).into_response()
}

fn png_response(data: Bytes) -> warp::reply::Response {
    match Response::builder()
        .header(CONTENT_TYPE, "image/png")
        .body(Body::from(data))
    {
        Ok(response) => response,
        Err(_) => error_response(StatusCode::INTERNAL_SERVER_ERROR, "response build failed"),
    }
}

fn error_response(status: StatusCode, message: &str) -> warp::reply::Response {
    warn!(status = status.as_u16(), reason = message, "request failed");
    warp::reply::with_status(message.to_string(), status).into_response()
}
