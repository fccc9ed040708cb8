//! HTTP transport to the Docker Engine API.
//!
//! The engine listens either on a unix socket (the default,
//! `/var/run/docker.sock`) or on TCP. reqwest cannot dial unix sockets, so
//! socket requests go through a one-shot hyper HTTP/1 connection instead.

use std::path::PathBuf;

use bytes::Bytes;

use deckhand_types::error::OrchestratorError;

/// Parsed `DOCKER_HOST` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DockerHost {
    /// Unix domain socket path.
    Unix(PathBuf),
    /// Base URL, e.g. `http://docker:2375`.
    Http(String),
}

impl DockerHost {
    /// Accepts `unix:///path`, `/path`, `tcp://host:port`, `http://...` and `https://...`.
    pub fn parse(host: &str) -> Result<Self, String> {
        let host = host.trim();
        if let Some(path) = host.strip_prefix("unix://") {
            if path.is_empty() {
                return Err("unix socket path is empty".to_string());
            }
            return Ok(DockerHost::Unix(PathBuf::from(path)));
        }
        if host.starts_with('/') {
            return Ok(DockerHost::Unix(PathBuf::from(host)));
        }
        if let Some(addr) = host.strip_prefix("tcp://") {
            if addr.is_empty() {
                return Err("tcp address is empty".to_string());
            }
            return Ok(DockerHost::Http(format!("http://{}", addr.trim_end_matches('/'))));
        }
        if host.starts_with("http://") || host.starts_with("https://") {
            return Ok(DockerHost::Http(host.trim_end_matches('/').to_string()));
        }
        Err(format!("unsupported docker host '{host}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Method {
    Get,
    Post,
}

#[derive(Debug)]
pub(crate) struct EngineRequest {
    pub method: Method,
    /// Path plus query string, starting with `/`.
    pub path: String,
    pub headers: Vec<(&'static str, String)>,
    /// JSON body.
    pub body: Option<Vec<u8>>,
}

#[derive(Debug)]
pub(crate) struct EngineResponse {
    pub status: u16,
    pub body: Bytes,
}

impl EngineResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug)]
pub(crate) enum Transport {
    Unix(PathBuf),
    Http {
        client: reqwest::Client,
        base_url: String,
    },
}

impl Transport {
    pub fn new(host: DockerHost) -> Result<Self, OrchestratorError> {
        match host {
            DockerHost::Unix(path) => Ok(Transport::Unix(path)),
            DockerHost::Http(base_url) => {
                let client = reqwest::Client::builder()
                    .build()
                    .map_err(|e| OrchestratorError::Transport(e.to_string()))?;
                Ok(Transport::Http { client, base_url })
            }
        }
    }

    pub async fn send(&self, request: EngineRequest) -> Result<EngineResponse, OrchestratorError> {
        match self {
            Transport::Unix(path) => send_unix(path, request).await,
            Transport::Http { client, base_url } => send_http(client, base_url, request).await,
        }
    }
}

async fn send_http(
    client: &reqwest::Client,
    base_url: &str,
    request: EngineRequest,
) -> Result<EngineResponse, OrchestratorError> {
    let url = format!("{base_url}{}", request.path);
    let mut builder = match request.method {
        Method::Get => client.get(&url),
        Method::Post => client.post(&url),
    };
    for (name, value) in &request.headers {
        builder = builder.header(*name, value.as_str());
    }
    if let Some(body) = request.body {
        builder = builder
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);
    }

    let response = builder
        .send()
        .await
        .map_err(|e| OrchestratorError::Transport(e.to_string()))?;
    let status = response.status().as_u16();
    let body = response
        .bytes()
        .await
        .map_err(|e| OrchestratorError::Transport(e.to_string()))?;

    Ok(EngineResponse { status, body })
}

#[cfg(unix)]
async fn send_unix(
    socket: &std::path::Path,
    request: EngineRequest,
) -> Result<EngineResponse, OrchestratorError> {
    use http_body_util::{BodyExt, Full};
    use hyper_util::rt::TokioIo;

    let stream = tokio::net::UnixStream::connect(socket).await.map_err(|e| {
        OrchestratorError::Transport(format!("cannot connect to {}: {e}", socket.display()))
    })?;

    let (mut sender, connection) =
        hyper::client::conn::http1::handshake::<_, Full<Bytes>>(TokioIo::new(stream))
            .await
            .map_err(|e| OrchestratorError::Transport(e.to_string()))?;
    tokio::spawn(async move {
        if let Err(error) = connection.await {
            tracing::debug!(%error, "docker socket connection closed with error");
        }
    });

    let method = match request.method {
        Method::Get => hyper::Method::GET,
        Method::Post => hyper::Method::POST,
    };
    let mut builder = hyper::Request::builder()
        .method(method)
        .uri(request.path.as_str())
        .header(hyper::header::HOST, "docker");
    for (name, value) in &request.headers {
        builder = builder.header(*name, value.as_str());
    }
    let body = match request.body {
        Some(body) => {
            builder = builder.header(hyper::header::CONTENT_TYPE, "application/json");
            Full::new(Bytes::from(body))
        }
        None => Full::new(Bytes::new()),
    };
    let http_request = builder
        .body(body)
        .map_err(|e| OrchestratorError::Transport(e.to_string()))?;

    let response = sender
        .send_request(http_request)
        .await
        .map_err(|e| OrchestratorError::Transport(e.to_string()))?;
    let status = response.status().as_u16();
    let body = response
        .into_body()
        .collect()
        .await
        .map_err(|e| OrchestratorError::Transport(e.to_string()))?
        .to_bytes();

    Ok(EngineResponse { status, body })
}

#[cfg(not(unix))]
async fn send_unix(
    socket: &std::path::Path,
    _request: EngineRequest,
) -> Result<EngineResponse, OrchestratorError> {
    Err(OrchestratorError::Transport(format!(
        "unix sockets are not supported on this platform: {}",
        socket.display()
    )))
}
