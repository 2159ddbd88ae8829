//! HTTP server for the Opal ledger.
//!
//! Exposes the submission endpoint and the read-side query endpoints over
//! axum, wires the configured validator strategy and the optional anchor
//! worker at process start, and loads its settings from a TOML file.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod wiring;

pub use config::{AnchoringConfig, IssuerConfig, ServerConfig, ValidatorConfig};
pub use error::{ServerError, ServerResult};
pub use server::OpalServer;
pub use wiring::{build_validator, AppState};

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::util::ServiceExt;

    use opal_crypto::SigningKey;
    use opal_store::InMemoryLedger;
    use opal_types::{encode_balance, AccountKey, ByteString, Mutation, Record, TxId};

    fn signer() -> SigningKey {
        SigningKey::from_bytes([42u8; 32])
    }

    fn app() -> axum::Router {
        let storage = Arc::new(InMemoryLedger::new());
        let config = ServerConfig {
            validator: ValidatorConfig::Admin {
                admin_keys: vec![signer().public_key().to_hex()],
            },
            ..ServerConfig::default()
        };
        let validator = build_validator(&config, storage.clone()).unwrap();
        router::build_router(AppState { storage, validator })
    }

    fn issuance_mutation() -> ByteString {
        let issuer = AccountKey::parse("/asset/gold/issuer", "/asset/gold/").unwrap();
        let alice = AccountKey::parse("/account/alice/", "/asset/gold/").unwrap();
        let records = vec![
            Record::new(issuer.record_key(), Some(encode_balance(-100)), ByteString::empty()),
            Record::new(alice.record_key(), Some(encode_balance(100)), ByteString::empty()),
        ];
        let mutation = Mutation::new(
            ByteString::new(b"opal".to_vec()),
            records,
            ByteString::empty(),
        );
        ByteString::new(opal_types::serialize_mutation(&mutation))
    }

    fn submit_body(raw_mutation: &ByteString) -> Body {
        let evidence = signer().sign(TxId::compute(raw_mutation.as_bytes()).as_bytes());
        let body = json!({
            "mutation": raw_mutation.to_hex(),
            "signatures": [evidence],
        });
        Body::from(serde_json::to_vec(&body).unwrap())
    }

    fn post(uri: &str, body: Body) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn submit_and_query_roundtrip() {
        let app = app();
        let raw = issuance_mutation();

        let response = app
            .clone()
            .oneshot(post("/submit", submit_body(&raw)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let submitted = body_json(response).await;
        assert!(submitted["transaction_hash"].is_string());

        let response = app
            .clone()
            .oneshot(get("/query/account?account=/account/alice/"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let accounts = body_json(response).await;
        assert_eq!(accounts[0]["balance"], "100");
        assert_eq!(accounts[0]["asset"], "/asset/gold/");

        let mutation_hash = TxId::compute(raw.as_bytes()).to_hex();
        let response = app
            .clone()
            .oneshot(get(&format!("/query/transaction?mutation_hash={mutation_hash}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(get("/query/subaccounts?account=/account/"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let records = body_json(response).await;
        assert_eq!(records.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rejected_submission_reports_the_reason_code() {
        let app = app();
        let raw = issuance_mutation();
        // Valid mutation, no signatures: the admin validator refuses it.
        let body = json!({ "mutation": raw.to_hex(), "signatures": [] });
        let response = app
            .oneshot(post("/submit", Body::from(serde_json::to_vec(&body).unwrap())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error_code"], "SignatureMissing");
    }

    #[tokio::test]
    async fn malformed_hex_is_a_client_error() {
        let app = app();
        let body = json!({ "mutation": "zz", "signatures": [] });
        let response = app
            .oneshot(post("/submit", Body::from(serde_json::to_vec(&body).unwrap())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error_code"], "InvalidMutation");
    }

    #[tokio::test]
    async fn observer_instance_refuses_submissions() {
        let storage = Arc::new(InMemoryLedger::new());
        let app = router::build_router(AppState {
            storage,
            validator: None,
        });
        let raw = issuance_mutation();
        let response = app
            .oneshot(post("/submit", submit_body(&raw)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    }

    #[tokio::test]
    async fn unknown_transaction_is_not_found() {
        let app = app();
        let missing = TxId::compute(b"missing").to_hex();
        let response = app
            .oneshot(get(&format!("/query/transaction?mutation_hash={missing}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unwritten_record_reads_back_empty() {
        let app = app();
        let key = ByteString::from("/account/alice/:ACC:/asset/gold/").to_hex();
        let response = app.oneshot(get(&format!("/record?key={key}"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let record = body_json(response).await;
        assert!(record["value"].is_null());
        assert_eq!(record["version"], "");
    }
}
