//! HTTP API tests
//!
//! Run with: cargo test --test api_test
//!
//! Each test starts the router on an ephemeral port with a stub chain client
//! and drives it over real HTTP with reqwest.

use std::sync::Arc;
use std::time::Duration;

use bridge_relay::{
    api::{self, RateLimit},
    messages::ChainMessage,
};
use serde_json::{json, Value};

mod helpers {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Instant;

    use async_trait::async_trait;
    use bridge_relay::{
        address::AddressConverter,
        api::{self, AppState, HealthInfo},
        composer::{ComposerConfig, TransactionComposer},
        messages::{TimeoutHeight, TransactionBatch, TransactionResult},
        redact::Redacted,
        signer::{CosmosSigner, SignerSettings},
        BridgeError, ChainClient, ChainClientFactory,
    };

    pub const MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
    pub const EVM: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
    pub const TX_HASH: &str = "9F2D6C3B0E7A41D8B5C2E1F0A9D8C7B6A5F4E3D2C1B0A9F8E7D6C5B4A3F2E1D0";

    /// What the stub should answer
    #[derive(Clone, Copy)]
    pub enum Outcome {
        Accept,
        Reject,
        Unreachable,
    }

    /// Records every connection and submitted batch
    #[derive(Default)]
    pub struct Recorder {
        pub connects: AtomicU32,
        pub batches: Mutex<Vec<(String, TransactionBatch)>>,
    }

    impl Recorder {
        pub fn connects(&self) -> u32 {
            self.connects.load(Ordering::SeqCst)
        }

        pub fn batches(&self) -> Vec<(String, TransactionBatch)> {
            self.batches.lock().unwrap().clone()
        }
    }

    struct StubClient {
        recorder: Arc<Recorder>,
        outcome: Outcome,
    }

    #[async_trait]
    impl ChainClient for StubClient {
        async fn sign_and_broadcast(
            &self,
            signer: &CosmosSigner,
            batch: &TransactionBatch,
        ) -> Result<TransactionResult, BridgeError> {
            self.recorder
                .batches
                .lock()
                .unwrap()
                .push((signer.address_str(), batch.clone()));
            match self.outcome {
                Outcome::Accept => Ok(TransactionResult::new(TX_HASH)),
                Outcome::Reject => Err(BridgeError::Broadcast {
                    code: 5,
                    log: "spendable balance 0ukava is smaller than 2000ukava".to_string(),
                }),
                Outcome::Unreachable => Err(BridgeError::RetryExhausted {
                    attempts: 3,
                    last: Box::new(BridgeError::Connection("connection refused".to_string())),
                }),
            }
        }
    }

    pub struct StubFactory {
        recorder: Arc<Recorder>,
        outcome: Outcome,
    }

    impl ChainClientFactory for StubFactory {
        fn connect(&self) -> Result<Box<dyn ChainClient>, BridgeError> {
            self.recorder.connects.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(StubClient {
                recorder: self.recorder.clone(),
                outcome: self.outcome,
            }))
        }
    }

    pub struct TestServer {
        pub base_url: String,
        pub recorder: Arc<Recorder>,
        pub client: reqwest::Client,
    }

    /// Application state over a stub chain client
    pub fn app_state(outcome: Outcome) -> (AppState, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let factory = Arc::new(StubFactory {
            recorder: recorder.clone(),
            outcome,
        });

        let composer = TransactionComposer::new(
            ComposerConfig {
                token_contract: "0x919C1c267BC06a7039e03fcc2eF738525769109c".to_string(),
                source_port: "transfer".to_string(),
                source_channel: "channel-148".to_string(),
                timeout_height: TimeoutHeight::default(),
                timeout_seconds: 600,
                signer: SignerSettings::default(),
                service_credential: Redacted(MNEMONIC.to_string()),
            },
            factory,
        );

        let state = AppState::new(
            Arc::new(composer),
            AddressConverter::new("sei"),
            HealthInfo {
                cosmos_chain_id: "kava_2222-10".to_string(),
                evm_chain_id: 2222,
                started_at: Instant::now(),
            },
        );
        (state, recorder)
    }

    impl TestServer {
        pub async fn start(outcome: Outcome) -> Self {
            let (state, recorder) = app_state(outcome);

            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, api::router(state)).await.unwrap();
            });

            Self {
                base_url: format!("http://{}", addr),
                recorder,
                client: reqwest::Client::new(),
            }
        }

        pub async fn post(&self, path: &str, body: impl Into<reqwest::Body>) -> (u16, String) {
            let response = self
                .client
                .post(format!("{}{}", self.base_url, path))
                .header("content-type", "application/json")
                .body(body)
                .send()
                .await
                .unwrap();
            let status = response.status().as_u16();
            (status, response.text().await.unwrap())
        }

        pub async fn get(&self, path: &str) -> (u16, String) {
            let response = self
                .client
                .get(format!("{}{}", self.base_url, path))
                .send()
                .await
                .unwrap();
            let status = response.status().as_u16();
            (status, response.text().await.unwrap())
        }
    }
}

use helpers::{Outcome, TestServer, EVM, MNEMONIC, TX_HASH};

fn bridge_body() -> Value {
    json!({
        "sourceAccount": EVM,
        "destinationAccount": "sei1qypqxpq9qcrsszg2pvxq6rs0zqg3yyc5lzv7xu",
        "amount": "1000000",
        "denomination": "erc20/tether/usdt"
    })
}

fn parse(body: &str) -> Value {
    serde_json::from_str(body).unwrap()
}

// ============================================================================
// /bridge
// ============================================================================

#[tokio::test]
async fn test_bridge_empty_body_is_missing_fields() {
    let server = TestServer::start(Outcome::Accept).await;

    let (status, body) = server.post("/bridge", "").await;
    assert_eq!(status, 400);
    assert_eq!(parse(&body), json!({"error": "Missing required fields"}));
    assert_eq!(server.recorder.connects(), 0);
}

#[tokio::test]
async fn test_bridge_each_missing_field_rejected() {
    let server = TestServer::start(Outcome::Accept).await;

    for field in ["sourceAccount", "destinationAccount", "amount", "denomination"] {
        let mut body = bridge_body();
        body.as_object_mut().unwrap().remove(field);

        let (status, text) = server.post("/bridge", body.to_string()).await;
        assert_eq!(status, 400, "missing {}", field);
        assert_eq!(parse(&text)["error"], "Missing required fields");
    }
    assert_eq!(server.recorder.connects(), 0);
}

#[tokio::test]
async fn test_bridge_malformed_json() {
    let server = TestServer::start(Outcome::Accept).await;

    let (status, body) = server.post("/bridge", "{not json").await;
    assert_eq!(status, 400);
    assert_eq!(parse(&body)["error"], "Invalid request body");
    assert_eq!(server.recorder.connects(), 0);
}

#[tokio::test]
async fn test_bridge_invalid_amount() {
    let server = TestServer::start(Outcome::Accept).await;

    let mut body = bridge_body();
    body["amount"] = json!("12.5");
    let (status, text) = server.post("/bridge", body.to_string()).await;
    assert_eq!(status, 400);
    assert!(parse(&text)["error"]
        .as_str()
        .unwrap()
        .contains("Invalid amount"));
    assert_eq!(server.recorder.connects(), 0);
}

#[tokio::test]
async fn test_bridge_success_returns_hash() {
    let server = TestServer::start(Outcome::Accept).await;

    let (status, body) = server.post("/bridge", bridge_body().to_string()).await;
    assert_eq!(status, 200);
    let hash = parse(&body)["transactionHash"].as_str().unwrap().to_string();
    assert!(!hash.is_empty());
    assert_eq!(hash, TX_HASH);

    let batches = server.recorder.batches();
    assert_eq!(batches.len(), 1);
    let (signer, batch) = &batches[0];
    assert!(signer.starts_with("kava1"));
    assert_eq!(batch.describe(), "convert,transfer");

    match batch.messages() {
        [ChainMessage::Convert(convert), ChainMessage::Transfer(transfer)] => {
            assert_eq!(transfer.sender, *signer);
            assert_eq!(transfer.sender, convert.receiver);
            assert_eq!(transfer.source_channel, "channel-148");
            assert_eq!(
                transfer.receiver,
                "sei1qypqxpq9qcrsszg2pvxq6rs0zqg3yyc5lzv7xu"
            );
        }
        other => panic!("unexpected batch: {:?}", other),
    }
}

#[tokio::test]
async fn test_bridge_rejection_is_generic_500() {
    let server = TestServer::start(Outcome::Reject).await;

    let (status, body) = server.post("/bridge", bridge_body().to_string()).await;
    assert_eq!(status, 500);
    assert_eq!(parse(&body), json!({"error": "Internal Server Error"}));
    assert!(!body.contains("spendable"));
}

#[tokio::test]
async fn test_bridge_unreachable_chain_is_500() {
    let server = TestServer::start(Outcome::Unreachable).await;

    let (status, body) = server.post("/bridge", bridge_body().to_string()).await;
    assert_eq!(status, 500);
    assert_eq!(parse(&body)["error"], "Internal Server Error");
}

#[tokio::test]
async fn test_bridge_opaque_source_account_accepted() {
    let server = TestServer::start(Outcome::Accept).await;

    let body = json!({
        "sourceAccount": "addrA",
        "destinationAccount": "addrB",
        "amount": "1000000",
        "denomination": "udenom"
    });
    let (status, text) = server.post("/bridge", body.to_string()).await;
    assert_eq!(status, 200);
    assert!(!parse(&text)["transactionHash"].as_str().unwrap().is_empty());

    let batches = server.recorder.batches();
    let (signer, batch) = &batches[0];
    assert_eq!(batch.memo(), "bridge from addrA");
    match batch.messages() {
        [ChainMessage::Convert(convert), ChainMessage::Transfer(transfer)] => {
            assert_eq!(convert.receiver, *signer);
            assert_eq!(transfer.sender, *signer);
            assert_eq!(transfer.receiver, "addrB");
            assert_eq!(transfer.token.denom, "udenom");
        }
        other => panic!("unexpected batch: {:?}", other),
    }
}

#[tokio::test]
async fn test_bridge_foreign_intermediate_account_is_400() {
    let server = TestServer::start(Outcome::Accept).await;

    let mut body = bridge_body();
    body["intermediateAccount"] = json!("kava1someoneelse");
    let (status, text) = server.post("/bridge", body.to_string()).await;
    assert_eq!(status, 400);
    assert!(parse(&text)["error"]
        .as_str()
        .unwrap()
        .contains("intermediateAccount"));
    assert_eq!(server.recorder.connects(), 0);
}

#[tokio::test]
async fn test_concurrent_bridges_all_submitted() {
    let server = Arc::new(TestServer::start(Outcome::Accept).await);

    let mut handles = Vec::new();
    for _ in 0..5 {
        let server = server.clone();
        handles.push(tokio::spawn(async move {
            server.post("/bridge", bridge_body().to_string()).await
        }));
    }
    for h in handles {
        let (status, _) = h.await.unwrap();
        assert_eq!(status, 200);
    }
    assert_eq!(server.recorder.batches().len(), 5);
}

// ============================================================================
// /convert-address
// ============================================================================

#[tokio::test]
async fn test_convert_address_uses_destination_prefix() {
    let server = TestServer::start(Outcome::Accept).await;

    let (status, body) = server
        .post("/convert-address", json!({"sourceAccount": EVM}).to_string())
        .await;
    assert_eq!(status, 200);
    let converted = parse(&body)["destinationAccountAddress"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(converted.starts_with("sei1"));
    assert_eq!(server.recorder.connects(), 0);
}

#[tokio::test]
async fn test_convert_address_missing_field() {
    let server = TestServer::start(Outcome::Accept).await;

    let (status, body) = server.post("/convert-address", "{}").await;
    assert_eq!(status, 400);
    assert_eq!(parse(&body)["error"], "Missing required fields");
}

#[tokio::test]
async fn test_convert_address_unparseable_is_500() {
    let server = TestServer::start(Outcome::Accept).await;

    let (status, body) = server
        .post("/convert-address", json!({"sourceAccount": "0x1234"}).to_string())
        .await;
    assert_eq!(status, 500);
    assert_eq!(parse(&body)["error"], "Internal Server Error");
}

// ============================================================================
// /ibc-transfer
// ============================================================================

fn transfer_body() -> Value {
    json!({
        "credential": MNEMONIC,
        "sourceAccount": "kava1sender",
        "destinationAccount": "sei1receiver",
        "amount": "2500",
        "denomination": "ukava",
        "channel": "channel-7"
    })
}

#[tokio::test]
async fn test_ibc_transfer_success() {
    let server = TestServer::start(Outcome::Accept).await;

    let (status, body) = server
        .post("/ibc-transfer", transfer_body().to_string())
        .await;
    assert_eq!(status, 200);
    assert_eq!(
        parse(&body),
        json!({"status": "success", "transactionHash": TX_HASH})
    );

    let batches = server.recorder.batches();
    assert_eq!(batches.len(), 1);
    match batches[0].1.messages() {
        [ChainMessage::Transfer(transfer)] => {
            assert_eq!(transfer.source_channel, "channel-7");
            assert_eq!(transfer.token.denom, "ukava");
            assert_eq!(transfer.token.amount, "2500");
        }
        other => panic!("unexpected batch: {:?}", other),
    }
}

#[tokio::test]
async fn test_ibc_transfer_missing_credential() {
    let server = TestServer::start(Outcome::Accept).await;

    let mut body = transfer_body();
    body.as_object_mut().unwrap().remove("credential");
    let (status, text) = server.post("/ibc-transfer", body.to_string()).await;
    assert_eq!(status, 400);
    assert_eq!(parse(&text)["error"], "Missing required fields");
    assert_eq!(server.recorder.connects(), 0);
}

#[tokio::test]
async fn test_ibc_transfer_bad_credential_is_500() {
    let server = TestServer::start(Outcome::Accept).await;

    let mut body = transfer_body();
    body["credential"] = json!("definitely not twelve words");
    let (status, text) = server.post("/ibc-transfer", body.to_string()).await;
    assert_eq!(status, 500);
    assert!(!text.contains("definitely"));
    assert_eq!(server.recorder.connects(), 0);
}

// ============================================================================
// Rate limiting
// ============================================================================

#[tokio::test]
async fn test_rate_limit_answers_429_and_shuts_down() {
    let (state, _) = helpers::app_state(Outcome::Accept);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/healthz", listener.local_addr().unwrap());

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(api::serve(
        listener,
        state,
        RateLimit {
            per_second: 60,
            burst: 1,
        },
        async move {
            let _ = shutdown_rx.await;
        },
    ));

    let client = reqwest::Client::new();
    let first = client.get(&url).send().await.unwrap().status();
    assert_eq!(first.as_u16(), 200);
    let second = client.get(&url).send().await.unwrap().status();
    assert_eq!(second.as_u16(), 429);
    drop(client);

    shutdown_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server did not shut down")
        .unwrap()
        .unwrap();
}

// ============================================================================
// Health & Metrics
// ============================================================================

#[tokio::test]
async fn test_healthz() {
    let server = TestServer::start(Outcome::Accept).await;
    let (status, body) = server.get("/healthz").await;
    assert_eq!(status, 200);
    assert_eq!(body, "OK");
}

#[tokio::test]
async fn test_health_reports_chain_ids() {
    let server = TestServer::start(Outcome::Accept).await;
    let (status, body) = server.get("/health").await;
    assert_eq!(status, 200);
    let health = parse(&body);
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["cosmos_chain_id"], "kava_2222-10");
    assert_eq!(health["evm_chain_id"], 2222);
}

#[tokio::test]
async fn test_metrics_counts_requests() {
    let server = TestServer::start(Outcome::Accept).await;
    server.post("/convert-address", "{}").await;

    let (status, body) = server.get("/metrics").await;
    assert_eq!(status, 200);
    assert!(body.contains("bridge_relay_http_requests_total"));
    assert!(body.contains("endpoint=\"/convert-address\""));
}
