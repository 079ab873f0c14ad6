//! HTTP boundary.
//!
//! A fixed pool of worker threads shares one `tiny_http` listener. Each
//! worker takes a request, computes its layout, and drives the async part of
//! the pipeline (font fetches) on a shared tokio runtime.
//!
//! | request                                   | response                   |
//! |-------------------------------------------|----------------------------|
//! | `GET {endpoint}?q`                        | `200` PNG                  |
//! | `GET {endpoint}?q` + matching `If-None-Match` | `304`, nothing fetched |
//! | other method on `{endpoint}`              | `405`                      |
//! | other path                                | `404`                      |
//! | font fetch failure                        | `502`, plain text          |
//! | rasterizer failure                        | `500`, plain text          |

use std::io::Read;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tiny_http::{Header, Method, Request, Response};
use tokio::runtime::Handle;

use crate::service::{etag_for, ImageService};
use crate::{Error, Result};

/// Outcome of one request, before it is written to the socket.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Image { png: Vec<u8>, etag: String },
    NotModified { etag: String },
    Text { status: u16, body: String },
}

impl Reply {
    pub fn status(&self) -> u16 {
        match self {
            Reply::Image { .. } => 200,
            Reply::NotModified { .. } => 304,
            Reply::Text { status, .. } => *status,
        }
    }

    fn text(status: u16, body: impl Into<String>) -> Self {
        Reply::Text {
            status,
            body: body.into(),
        }
    }
}

/// Route and answer one request.
///
/// `target` is the raw request target (path plus optional query).
pub fn handle(
    service: &ImageService,
    runtime: &Handle,
    method: &Method,
    target: &str,
    if_none_match: Option<&str>,
) -> Reply {
    let (path, query) = target.split_once('?').unwrap_or((target, ""));
    if path != service.config().endpoint_path {
        return Reply::text(404, "not found");
    }
    if *method != Method::Get {
        return Reply::text(405, "method not allowed");
    }

    let tree = service.layout_for_query(query);
    let etag = match etag_for(&tree) {
        Ok(etag) => etag,
        Err(e) => return failure(target, e),
    };
    if if_none_match.is_some_and(|h| etag_matches(h, &etag)) {
        log::debug!("{} not modified", target);
        return Reply::NotModified { etag };
    }

    match runtime.block_on(service.generate_tree(&tree)) {
        Ok(generated) => Reply::Image {
            png: generated.image.png_data,
            etag: generated.etag,
        },
        Err(e) => failure(target, e),
    }
}

fn failure(target: &str, err: Error) -> Reply {
    log::warn!("request {} failed: {}", target, err);
    match err {
        Error::FontFetchError(_) => Reply::text(502, "font fetch failed"),
        _ => Reply::text(500, "rendering failed"),
    }
}

/// Whether an `If-None-Match` header value matches `etag`. Weak validators
/// compare by their opaque tag.
pub fn etag_matches(header: &str, etag: &str) -> bool {
    header.split(',').map(str::trim).any(|candidate| {
        candidate == "*" || candidate.strip_prefix("W/").unwrap_or(candidate) == etag
    })
}

fn with_headers<R: Read>(mut response: Response<R>, headers: &[(&str, &str)]) -> Response<R> {
    for (name, value) in headers {
        match Header::from_bytes(name.as_bytes(), value.as_bytes()) {
            Ok(header) => response.add_header(header),
            Err(()) => log::warn!("dropping invalid header {}: {}", name, value),
        }
    }
    response
}

fn respond(request: Request, reply: Reply, cache_control: &str) {
    let result = match reply {
        Reply::Image { png, etag } => request.respond(with_headers(
            Response::from_data(png),
            &[
                ("Content-Type", "image/png"),
                ("Cache-Control", cache_control),
                ("ETag", etag.as_str()),
            ],
        )),
        Reply::NotModified { etag } => request.respond(with_headers(
            Response::empty(304),
            &[("Cache-Control", cache_control), ("ETag", etag.as_str())],
        )),
        Reply::Text { status, body } => request.respond(with_headers(
            Response::from_string(body).with_status_code(status),
            &[("Content-Type", "text/plain; charset=utf-8")],
        )),
    };
    if let Err(e) = result {
        log::warn!("failed to write response: {}", e);
    }
}

/// A running listener and its workers.
pub struct ServerHandle {
    addr: SocketAddr,
    http: Arc<tiny_http::Server>,
    workers: Vec<JoinHandle<()>>,
}

impl ServerHandle {
    /// Bound address; useful when the configured port is 0.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Block until every worker exits.
    pub fn join(self) {
        for worker in self.workers {
            let _ = worker.join();
        }
    }

    /// Stop accepting requests and wait for the workers.
    pub fn shutdown(self) {
        for _ in &self.workers {
            self.http.unblock();
        }
        self.join();
    }
}

/// Bind `service.config().bind_addr` and start the worker pool.
pub fn start(service: Arc<ImageService>, runtime: Handle) -> Result<ServerHandle> {
    let config = service.config().clone();
    let http = tiny_http::Server::http(config.bind_addr.as_str())
        .map_err(|e| Error::NetworkError(format!("Failed to bind {}: {}", config.bind_addr, e)))?;
    let addr = http
        .server_addr()
        .to_ip()
        .ok_or_else(|| Error::NetworkError("listener has no IP address".into()))?;
    let http = Arc::new(http);

    let count = config.worker_count();
    log::info!(
        "serving {:?} cards on http://{}{} with {} worker(s)",
        config.template,
        addr,
        config.endpoint_path,
        count
    );

    let mut workers = Vec::with_capacity(count);
    for i in 0..count {
        let http = Arc::clone(&http);
        let service = Arc::clone(&service);
        let runtime = runtime.clone();
        let worker = thread::Builder::new()
            .name(format!("ogcard-worker-{}", i))
            .spawn(move || {
                for request in http.incoming_requests() {
                    let if_none_match = request
                        .headers()
                        .iter()
                        .find(|h| h.field.equiv("If-None-Match"))
                        .map(|h| h.value.as_str().to_string());
                    let target = request.url().to_string();
                    log::debug!("{} {}", request.method(), target);
                    let reply = handle(
                        &service,
                        &runtime,
                        request.method(),
                        &target,
                        if_none_match.as_deref(),
                    );
                    respond(request, reply, &service.config().cache_control);
                }
            })
            .map_err(|e| Error::InitializationError(format!("Failed to spawn worker: {}", e)))?;
        workers.push(worker);
    }

    Ok(ServerHandle {
        addr,
        http,
        workers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::{FontAsset, FontLoader, FontRequest};
    use crate::params::TemplateMode;
    use crate::rendering::layout::LayoutTree;
    use crate::rendering::raster::Rasterizer;
    use crate::rendering::RenderedImage;
    use crate::ServiceConfig;
    use futures::future::BoxFuture;

    struct EchoLoader {
        fail: bool,
    }

    impl FontLoader for EchoLoader {
        fn load<'a>(&'a self, request: &'a FontRequest) -> BoxFuture<'a, Result<Vec<u8>>> {
            Box::pin(async move {
                if self.fail {
                    Err(Error::FontFetchError(request.source.clone()))
                } else {
                    Ok(vec![1])
                }
            })
        }
    }

    struct FixedRasterizer {
        fail: bool,
    }

    impl Rasterizer for FixedRasterizer {
        fn rasterize(&self, tree: &LayoutTree, _fonts: &[FontAsset]) -> Result<RenderedImage> {
            if self.fail {
                return Err(Error::RenderError("boom".into()));
            }
            Ok(RenderedImage {
                width: tree.width,
                height: tree.height,
                png_data: b"png".to_vec(),
            })
        }
    }

    fn service(fetch_fails: bool, render_fails: bool) -> ImageService {
        let config = ServiceConfig {
            template: TemplateMode::Themed,
            ..Default::default()
        };
        ImageService::with_components(
            config,
            Arc::new(EchoLoader { fail: fetch_fails }),
            Arc::new(FixedRasterizer { fail: render_fails }),
        )
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    #[test]
    fn routes_and_methods() {
        let rt = runtime();
        let svc = service(false, false);
        let get = |target: &str| handle(&svc, rt.handle(), &Method::Get, target, None);

        assert_eq!(get("/api/og?title=x").status(), 200);
        assert_eq!(get("/api/og").status(), 200);
        assert_eq!(get("/other?title=x").status(), 404);
        assert_eq!(get("/api/og/extra").status(), 404);
        assert_eq!(
            handle(&svc, rt.handle(), &Method::Post, "/api/og?title=x", None).status(),
            405
        );
    }

    #[test]
    fn matching_etag_short_circuits() {
        let rt = runtime();
        let svc = service(true, true);
        let etag = etag_for(&svc.layout_for_query("title=x&theme=blog")).unwrap();
        let reply = handle(
            &svc,
            rt.handle(),
            &Method::Get,
            "/api/og?title=x&theme=blog",
            Some(&etag),
        );
        assert_eq!(reply, Reply::NotModified { etag });
    }

    #[test]
    fn failures_map_to_status_codes() {
        let rt = runtime();
        let fetch = handle(&service(true, false), rt.handle(), &Method::Get, "/api/og?theme=blog", None);
        assert_eq!(fetch.status(), 502);
        let render = handle(&service(false, true), rt.handle(), &Method::Get, "/api/og?theme=blog", None);
        assert_eq!(render.status(), 500);
        assert!(!matches!(render, Reply::Image { .. }));
    }

    #[test]
    fn if_none_match_forms() {
        let tag = "\"abc\"";
        assert!(etag_matches("\"abc\"", tag));
        assert!(etag_matches("W/\"abc\"", tag));
        assert!(etag_matches("\"x\", \"abc\"", tag));
        assert!(etag_matches("*", tag));
        assert!(!etag_matches("\"abd\"", tag));
        assert!(!etag_matches("abc", tag));
    }
}
