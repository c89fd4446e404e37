//! Shared fixtures: the full router over in-memory stores

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

use lectern_server::{
    api,
    config::JobsConfig,
    jobs::{memory::MemoryJobQueue, worker::JobWorker},
    repository::{memory::MemoryLedgerStore, Repository},
    services::{
        clock::FixedClock,
        email::{MailTransport, OutgoingMail},
        Services,
    },
    AppConfig, AppResult, AppState,
};

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 12).unwrap()
}

/// Keeps every mail instead of sending it
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingMail>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailTransport for RecordingMailer {
    async fn send(&self, mail: &OutgoingMail) -> AppResult<()> {
        self.sent.lock().unwrap().push(mail.clone());
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub services: Arc<Services>,
    pub store: Arc<MemoryLedgerStore>,
    pub queue: Arc<MemoryJobQueue>,
    pub mailer: Arc<RecordingMailer>,
}

impl TestApp {
    pub fn new() -> Self {
        let config = AppConfig::default();
        // Never connected: catalog routes are covered by the live tests
        let pool = PgPoolOptions::new()
            .connect_lazy(&config.database.url)
            .unwrap();

        let store = Arc::new(MemoryLedgerStore::new());
        let queue = Arc::new(MemoryJobQueue::new());
        let mailer = Arc::new(RecordingMailer::default());
        let services = Arc::new(Services::new(
            Repository::new(pool),
            store.clone(),
            mailer.clone(),
            queue.clone(),
            Arc::new(FixedClock(today())),
            &config.loans,
        ));

        let router = api::create_router(AppState {
            config: Arc::new(config),
            services: services.clone(),
        });

        Self {
            router,
            services,
            store,
            queue,
            mailer,
        }
    }

    pub fn worker(&self) -> JobWorker {
        self.services.job_worker(&JobsConfig {
            poll_timeout_secs: 0,
            ..JobsConfig::default()
        })
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body)).await
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None).await
    }
}
