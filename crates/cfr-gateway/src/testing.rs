//! Canned-response HTTP server for gateway tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, Method, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Router;

/// A request as seen by the server.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    /// Path and query.
    pub target: String,
    pub body: String,
}

#[derive(Default)]
struct Exchange {
    responses: VecDeque<(u16, String)>,
    recorded: Vec<Recorded>,
}

type SharedExchange = Arc<Mutex<Exchange>>;

/// Handle to a running server.
pub struct Responder {
    pub url: String,
    exchange: SharedExchange,
}

impl Responder {
    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<Recorded> {
        self.exchange.lock().unwrap().recorded.clone()
    }
}

/// Serve `responses` in order on `127.0.0.1`, one per request. Requests
/// past the end get a 500.
pub async fn serve(responses: Vec<(u16, String)>) -> Responder {
    let exchange = Arc::new(Mutex::new(Exchange {
        responses: responses.into(),
        recorded: Vec::new(),
    }));
    let app = Router::new()
        .fallback(respond)
        .with_state(exchange.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Responder { url, exchange }
}

async fn respond(
    State(exchange): State<SharedExchange>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> impl IntoResponse {
    let mut exchange = exchange.lock().unwrap();
    exchange.recorded.push(Recorded {
        method,
        target: uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| uri.path().to_string()),
        body: String::from_utf8_lossy(&body).into_owned(),
    });
    let (status, body) = exchange
        .responses
        .pop_front()
        .unwrap_or((500, "no response queued".to_string()));
    (
        StatusCode::from_u16(status).unwrap(),
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn chunked_body_is_recorded_decoded() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let server = serve(vec![(200, "ok".into())]).await;
        let addr = server.url.trim_start_matches("http://");
        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(
                b"POST /tx HTTP/1.1\r\nHost: localhost\r\nTransfer-Encoding: chunked\r\n\
                  Connection: close\r\n\r\n2\r\n01\r\n2\r\n00\r\n0\r\n\r\n",
            )
            .await
            .unwrap();
        let mut reply = String::new();
        stream.read_to_string(&mut reply).await.unwrap();
        assert!(reply.starts_with("HTTP/1.1 200"), "{reply}");

        let requests = server.requests();
        assert_eq!(requests[0].method, Method::POST);
        assert_eq!(requests[0].target, "/tx");
        assert_eq!(requests[0].body, "0100");
    }

    #[tokio::test]
    async fn exhausted_queue_is_server_error() {
        let server = serve(vec![]).await;
        let resp = reqwest::get(format!("{}/fee-estimates", server.url)).await.unwrap();
        assert_eq!(resp.status(), 500);
        assert_eq!(server.requests().len(), 1);
    }
}
