//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use audio_mirror::errors::{ApiError, ApiResult};
use audio_mirror::utils::{HttpRequest, HttpResponse, HttpTransport};

/// Transport answering from a table of URL paths and recording every request
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, (u16, Vec<u8>)>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, path: &str, status: u16, body: &str) -> Self {
        self.set_route(path, status, body);
        self
    }

    pub fn set_route(&self, path: &str, status: u16, body: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), (status, body.as_bytes().to_vec()));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> ApiResult<HttpResponse> {
        let route = self.routes.lock().unwrap().get(request.url.path()).cloned();
        let url = request.url.to_string();
        self.requests.lock().unwrap().push(request);

        match route {
            Some((status, body)) => Ok(HttpResponse {
                status,
                content_type: Some("application/json".to_string()),
                content_length: Some(body.len() as u64),
                body,
            }),
            None => Err(ApiError::Transport {
                method: "GET".to_string(),
                url,
                message: "connection refused".to_string(),
            }),
        }
    }
}
