//! 请求上下文中间件。
//!
//! 每个请求：确定 request_id / trace_id（沿用上游 `x-request-id`），
//! 解析操作者（`x-actor`），写入请求扩展、日志 span 与响应头，
//! 结束时记录状态码与耗时。

use axum::{
    body::Body,
    http::{HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use greenhouse_telemetry::request_ids_from;
use std::time::Instant;
use tracing::{Instrument, info};

const REQUEST_ID_HEADER: &str = "x-request-id";
const TRACE_ID_HEADER: &str = "x-trace-id";
const ACTOR_HEADER: &str = "x-actor";

/// 未携带 `x-actor` 时审计记录使用的操作者。
pub const DEFAULT_ACTOR: &str = "api";

/// 审计用的操作者标识，由中间件写入请求扩展。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor(pub String);

impl Actor {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let name = headers
            .get(ACTOR_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_ACTOR);
        Self(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub async fn request_context(mut req: Request<Body>, next: Next) -> Response {
    let incoming = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok());
    let ids = request_ids_from(incoming);
    let actor = Actor::from_headers(req.headers());
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let span = tracing::info_span!(
        "request",
        request_id = %ids.request_id,
        trace_id = %ids.trace_id,
        actor = %actor.as_str(),
        method = %method,
        path = %path
    );
    req.extensions_mut().insert(ids.clone());
    req.extensions_mut().insert(actor);

    let started = Instant::now();
    let mut response = next.run(req).instrument(span.clone()).await;
    span.in_scope(|| {
        info!(
            target: "greenhouse.api",
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request_completed"
        );
    });

    for (name, value) in [
        (REQUEST_ID_HEADER, &ids.request_id),
        (TRACE_ID_HEADER, &ids.trace_id),
    ] {
        if let Ok(value) = HeaderValue::from_str(value) {
            response.headers_mut().insert(name, value);
        }
    }
    response
}
