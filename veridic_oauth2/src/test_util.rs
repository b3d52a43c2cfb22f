use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response, StatusCode};

use crate::{HttpTransport, TransportError};

#[derive(Debug)]
enum Reply {
    Respond(StatusCode, Bytes),
    Fail(&'static str),
}

/// A transport that answers every request with the same canned reply and
/// records what it was sent
#[derive(Debug)]
pub(crate) struct FakeTransport {
    reply: Reply,
    delay: Option<Duration>,
    calls: AtomicUsize,
    requests: Mutex<Vec<Request<Bytes>>>,
}

impl FakeTransport {
    fn with_reply(reply: Reply) -> Self {
        Self {
            reply,
            delay: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn json(status: StatusCode, body: serde_json::Value) -> Self {
        Self::with_reply(Reply::Respond(status, Bytes::from(body.to_string())))
    }

    pub(crate) fn raw(status: StatusCode, body: &'static str) -> Self {
        Self::with_reply(Reply::Respond(status, Bytes::from_static(body.as_bytes())))
    }

    pub(crate) fn failing(message: &'static str) -> Self {
        Self::with_reply(Reply::Fail(message))
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_uri(&self) -> Option<String> {
        let requests = self.requests.lock().unwrap();
        requests.last().map(|r| r.uri().to_string())
    }

    pub(crate) fn last_method(&self) -> Option<http::Method> {
        let requests = self.requests.lock().unwrap();
        requests.last().map(|r| r.method().clone())
    }

    pub(crate) fn last_form(&self) -> Vec<(String, String)> {
        let requests = self.requests.lock().unwrap();
        requests
            .last()
            .map(|r| serde_urlencoded::from_bytes(r.body()).unwrap())
            .unwrap_or_default()
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn execute(&self, request: Request<Bytes>) -> Result<Response<Bytes>, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.reply {
            Reply::Respond(status, body) => {
                let mut response = Response::new(body.clone());
                *response.status_mut() = *status;
                Ok(response)
            }
            Reply::Fail(message) => Err(TransportError::other(*message)),
        }
    }
}
