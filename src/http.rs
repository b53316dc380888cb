//! Contains code pertaining to the HTTP service memberauth exposes: principal lookups, health
//! probes and prometheus metrics.
use crate::auth::UserDetailsService;
use crate::domain::member::MemberError;
use crate::envelope::Envelope;
use crate::{app, metrics};

use http::header::CONTENT_TYPE;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use slog::*;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use std::{net::SocketAddr, result::Result};
use tokio::net::TcpListener;

const PATH_HOME: &str = "/";
const PATH_METRICS: &str = "/metrics";
const PATH_HEALTH: &str = "/health";
const PATH_READINESS: &str = "/ready";
const PATH_PRINCIPALS: &str = "/api/v1/principals/";

const GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

type HttpResponse = Response<UnsyncBoxBody<Bytes, Infallible>>;

// starts an HTTP server that serves principal lookups and exports Prometheus metrics.
pub async fn start(
    log: &Logger,
    bind_addr: &str,
    user_details: Arc<dyn UserDetailsService>,
    mut shutdown: tokio::sync::broadcast::Receiver<()>,
    done: tokio::sync::mpsc::Sender<()>,
) -> Result<(), String> {
    let http_addr: SocketAddr = bind_addr
        .parse()
        .map_err(|e| format!("unable to parse HTTP address {}: {}", bind_addr, e))?;

    let listener = TcpListener::bind(http_addr)
        .await
        .map_err(|e| format!("unable to bind HTTP address {}: {}", bind_addr, e))?;
    let http_server = hyper_util::server::conn::auto::Builder::new(hyper_util::rt::TokioExecutor::new());
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();

    info!(log, "Starting HTTP service."; "address" => &http_addr);
    info!(log, "Exposing {} service home.", app::NAME; "path" => PATH_HOME);
    info!(log, "Exposing principal lookups."; "path" => format!("{}{{username}}", PATH_PRINCIPALS));
    info!(log, "Exposing Prometheus {} exporter endpoint.", app::NAME; "path" => PATH_METRICS);
    info!(log, "Exposing readiness endpoint."; "path" => PATH_READINESS);
    info!(log, "Exposing liveness endpoint."; "path" => PATH_HEALTH);

    let handler = Arc::new(HttpHandler::new(user_details, log));

    loop {
        tokio::select! {
            conn = listener.accept() => {
                let (stream, peer_addr) = match conn {
                    Ok(conn) => conn,
                    Err(e) => {
                        error!(log, "Accept error: {}", e);
                        continue;
                    }
                };
                debug!(log, "Incoming connection accepted: {}", peer_addr);

                let stream = hyper_util::rt::TokioIo::new(stream);
                let handler = Arc::clone(&handler);

                let conn = http_server.serve_connection_with_upgrades(stream, service_fn(move |req: Request<Incoming>| {
                    let handler = Arc::clone(&handler);
                    async move { handler.router(req).await }
                }));

                let conn = graceful.watch(conn.into_owned());

                let log_clone = log.clone();
                tokio::spawn(async move {
                    if let Err(err) = conn.await {
                        error!(log_clone, "connection error: {}", err);
                    }
                    debug!(log_clone, "connection dropped: {}", peer_addr);
                });
            },
            _ = shutdown.recv() => {
                drop(listener);
                info!(log, "Shutting down HTTP server");
                break;
            }
        }
    }

    tokio::select! {
        _ = graceful.shutdown() => info!(log, "HTTP shutdown OK"),
        _ = tokio::time::sleep(GRACEFUL_SHUTDOWN_TIMEOUT) => {
            warn!(log, "Timed out waiting for HTTP connections to close"; "timeout" => format!("{:?}", GRACEFUL_SHUTDOWN_TIMEOUT))
        }
    }
    drop(done);
    Ok(())
}

struct HttpHandler {
    user_details: Arc<dyn UserDetailsService>,
    log: Logger,
}

impl HttpHandler {
    fn new(user_details: Arc<dyn UserDetailsService>, log: &Logger) -> Self {
        HttpHandler {
            user_details,
            log: log.new(o!("module" => "http")),
        }
    }

    async fn router<B>(&self, req: Request<B>) -> Result<HttpResponse, http::Error> {
        let (parts, _) = req.into_parts();
        let path = parts.uri.path();

        let (route, response) = match (&parts.method, path) {
            (&Method::GET, PATH_HOME) | (&Method::GET, "/index.html") => (
                PATH_HOME,
                Response::builder()
                    .header(CONTENT_TYPE, "text/plain; charset=utf-8")
                    .body(full(self.service_home())),
            ),
            (&Method::GET, PATH_METRICS) => (
                PATH_METRICS,
                Response::builder()
                    .header(CONTENT_TYPE, prometheus::TEXT_FORMAT)
                    .body(full(metrics::gather())),
            ),
            (&Method::GET, PATH_HEALTH) => (PATH_HEALTH, Response::builder().status(StatusCode::OK).body(full("OK"))),
            (&Method::GET, PATH_READINESS) => (PATH_READINESS, Response::builder().status(StatusCode::OK).body(full("OK"))),
            (&Method::GET, p) if p.starts_with(PATH_PRINCIPALS) => {
                ("/api/v1/principals/{username}", self.principal(&p[PATH_PRINCIPALS.len()..]).await)
            }
            _ => (
                "unmatched",
                envelope_response(&Envelope::new("404-1", format!("no such resource: {} {}", parts.method, path))),
            ),
        };

        if let Ok(resp) = &response {
            metrics::inc_http_request(route, resp.status().as_u16());
        }
        response
    }

    fn service_home(&self) -> String {
        format!("{} {}\n", app::NAME, app::VERSION)
    }

    async fn principal(&self, raw_username: &str) -> Result<HttpResponse, http::Error> {
        let username = match decode_path_segment(raw_username) {
            Some(username) => username,
            None => return envelope_response(&Envelope::new("400-2", "username is not validly percent-encoded")),
        };
        if username.is_empty() {
            return envelope_response(&Envelope::new("400-1", "username must not be empty"));
        }

        match self.user_details.load_user_by_username(&username).await {
            Ok(user) => match serde_json::to_vec(&user) {
                Ok(body) => Response::builder()
                    .status(StatusCode::OK)
                    .header(CONTENT_TYPE, "application/json")
                    .body(full(body)),
                Err(e) => {
                    error!(self.log, "Could not serialize principal: {}", e; "username" => &username);
                    envelope_response(&Envelope::new("500-1", "could not serialize principal"))
                }
            },
            Err(err @ MemberError::UsernameNotFound { .. }) => {
                envelope_response(&Envelope::new("404-1", err.to_string()))
            }
            Err(err) => {
                error!(self.log, "Member service failure: {}", err; "username" => &username);
                envelope_response(&Envelope::new("503-1", "member service unavailable"))
            }
        }
    }
}

fn full(body: impl Into<Bytes>) -> UnsyncBoxBody<Bytes, Infallible> {
    UnsyncBoxBody::new(Full::new(body.into()))
}

fn envelope_response(envelope: &Envelope) -> Result<HttpResponse, http::Error> {
    Response::builder()
        .status(envelope.status_code())
        .header(CONTENT_TYPE, "application/json")
        .body(full(envelope.to_json()))
}

// Every `%` must start a two hex digit escape and the decoded bytes must be UTF-8.
fn decode_path_segment(segment: &str) -> Option<String> {
    let bytes = segment.as_bytes();
    let well_formed = bytes
        .iter()
        .enumerate()
        .filter(|(_, b)| **b == b'%')
        .all(|(i, _)| bytes.get(i + 1..i + 3).map_or(false, |hex| hex.iter().all(u8::is_ascii_hexdigit)));
    if !well_formed {
        return None;
    }
    urlencoding::decode(segment).ok().map(|decoded| decoded.into_owned())
}
