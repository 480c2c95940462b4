//! Scripted in-memory transport for unit tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::{Method, StatusCode};
use url::Url;

use crate::client::Client;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::transport::{Payload, Request, Response, Transport};

pub(crate) const TEST_HOST: &str = "https://api.skiff.dev";

#[derive(Debug, Clone)]
pub(crate) struct Recorded {
    pub method: Method,
    pub url: Url,
    pub payload: Payload,
}

enum Scripted {
    Respond(Response),
    Fail(StatusCode, String),
}

#[derive(Clone, Default)]
pub(crate) struct ScriptedTransport {
    script: Arc<Mutex<VecDeque<Scripted>>>,
    recorded: Arc<Mutex<Vec<Recorded>>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(&self, response: Response) {
        self.script.lock().push_back(Scripted::Respond(response));
    }

    pub(crate) fn ok(&self, body: &str) {
        self.respond(Response::new(StatusCode::OK, body));
    }

    pub(crate) fn fail(&self, status: StatusCode, body: &str) {
        self.script
            .lock()
            .push_back(Scripted::Fail(status, body.to_string()));
    }

    pub(crate) fn client(&self) -> Client {
        let config = ClientConfig::new(TEST_HOST).expect("test host parses");
        Client::with_transport(config, Arc::new(self.clone()))
    }

    pub(crate) fn requests(&self) -> Vec<Recorded> {
        self.recorded.lock().clone()
    }

    pub(crate) fn last_request(&self) -> Recorded {
        self.recorded
            .lock()
            .last()
            .cloned()
            .expect("at least one request was sent")
    }

    pub(crate) fn remaining(&self) -> usize {
        self.script.lock().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn request(&self, request: Request) -> ClientResult<Response> {
        let host = Url::parse(TEST_HOST).expect("test host parses");
        let url = request.target.resolve(&host)?;
        self.recorded.lock().push(Recorded {
            method: request.method,
            url: url.clone(),
            payload: request.payload,
        });
        match self.script.lock().pop_front() {
            Some(Scripted::Respond(response)) => Ok(response),
            Some(Scripted::Fail(status, body)) => Err(ClientError::RequestFailed { status, body }),
            None => Err(ClientError::InvalidResponse(format!(
                "no scripted response left for {url}"
            ))),
        }
    }
}
