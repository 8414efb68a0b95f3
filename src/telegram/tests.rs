use super::*;
use crate::media::validate_upload;
use crate::spool::RequestSpool;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "4242:TEST-TOKEN";

fn client_for(server: &MockServer) -> TelegramClient {
    TelegramClient::new(&TelegramConfig {
        token: TOKEN.to_string(),
        api_base: server.uri(),
    })
}

async fn validated_png(spool: &RequestSpool) -> ValidatedMedia {
    let upload = spool
        .save(
            MediaSlot::Photo,
            &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A],
            Some("image/png".to_string()),
            Some("original-name.png".to_string()),
        )
        .await
        .unwrap();
    validate_upload(upload).await.unwrap()
}

#[tokio::test]
async fn test_send_photo_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{}/sendPhoto", TOKEN)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": {"message_id": 7}
            })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let root = tempfile::tempdir().unwrap();
    let spool = RequestSpool::create(root.path()).unwrap();
    let media = validated_png(&spool).await;

    let client = client_for(&server);
    let receipt = client.send_media("777", "Fixed caption", &media).await.unwrap();
    assert_eq!(receipt.slot, MediaSlot::Photo);
    assert_eq!(receipt.message_id, Some(7));
}

#[tokio::test]
async fn test_outbound_form_uses_canonical_name_and_sniffed_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let root = tempfile::tempdir().unwrap();
    let spool = RequestSpool::create(root.path()).unwrap();
    let media = validated_png(&spool).await;

    let client = client_for(&server);
    client.send_media("777", "Fixed caption", &media).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url.path(), format!("/bot{}/sendPhoto", TOKEN));

    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("name=\"chat_id\""));
    assert!(body.contains("777"));
    assert!(body.contains("name=\"caption\""));
    assert!(body.contains("Fixed caption"));
    // Canonical filename and sniffed type, not the client-declared ones
    assert!(body.contains("filename=\"photo.jpg\""));
    assert!(body.contains("image/png"));
    assert!(!body.contains("original-name.png"));
}

#[tokio::test]
async fn test_empty_caption_is_omitted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let root = tempfile::tempdir().unwrap();
    let spool = RequestSpool::create(root.path()).unwrap();
    let media = validated_png(&spool).await;

    client_for(&server).send_media("777", "", &media).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(!body.contains("name=\"caption\""));
}

#[tokio::test]
async fn test_upstream_rejection_carries_description() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "ok": false,
            "description": "Bad Request: chat not found"
        })))
        .mount(&server)
        .await;

    let root = tempfile::tempdir().unwrap();
    let spool = RequestSpool::create(root.path()).unwrap();
    let media = validated_png(&spool).await;

    let err = client_for(&server)
        .send_media("777", "Fixed caption", &media)
        .await
        .unwrap_err();
    match err {
        RelayError::UpstreamRejected { slot, description } => {
            assert_eq!(slot, MediaSlot::Photo);
            assert_eq!(description, "Bad Request: chat not found");
        }
        other => panic!("expected UpstreamRejected, got {:?}", other),
    }
}

#[tokio::test]
async fn test_ok_true_without_result_still_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let root = tempfile::tempdir().unwrap();
    let spool = RequestSpool::create(root.path()).unwrap();
    let media = validated_png(&spool).await;

    let receipt = client_for(&server)
        .send_media("777", "Fixed caption", &media)
        .await
        .unwrap();
    assert_eq!(receipt.message_id, None);
}

#[tokio::test]
async fn test_non_json_reply_is_rejected_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
        .mount(&server)
        .await;

    let root = tempfile::tempdir().unwrap();
    let spool = RequestSpool::create(root.path()).unwrap();
    let media = validated_png(&spool).await;

    let err = client_for(&server)
        .send_media("777", "Fixed caption", &media)
        .await
        .unwrap_err();
    match err {
        RelayError::UpstreamRejected { description, .. } => {
            assert!(description.contains("502"), "got: {}", description);
        }
        other => panic!("expected UpstreamRejected, got {:?}", other),
    }
}

#[tokio::test]
async fn test_timeout_maps_to_unreachable_without_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"ok": true}))
                .set_delay(Duration::from_millis(400)),
        )
        .mount(&server)
        .await;

    let root = tempfile::tempdir().unwrap();
    let spool = RequestSpool::create(root.path()).unwrap();
    let media = validated_png(&spool).await;

    let client = TelegramClient {
        http: reqwest::Client::builder()
            .timeout(Duration::from_millis(50))
            .build()
            .unwrap(),
        token: TOKEN.to_string(),
        api_base: server.uri(),
    };

    let err = client
        .send_media("777", "Fixed caption", &media)
        .await
        .unwrap_err();
    match err {
        RelayError::UpstreamUnreachable { reason, .. } => {
            assert_eq!(reason, "timed out");
            assert!(!reason.contains(TOKEN));
        }
        other => panic!("expected UpstreamUnreachable, got {:?}", other),
    }
}

#[tokio::test]
async fn test_connect_failure_never_leaks_token() {
    let client = TelegramClient::new(&TelegramConfig {
        token: TOKEN.to_string(),
        api_base: "http://127.0.0.1:1".to_string(),
    });

    let root = tempfile::tempdir().unwrap();
    let spool = RequestSpool::create(root.path()).unwrap();
    let media = validated_png(&spool).await;

    let err = client
        .send_media("777", "Fixed caption", &media)
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::UpstreamUnreachable { .. }));
    assert!(!err.to_string().contains(TOKEN));
    assert!(!err.client_message().contains(TOKEN));
}
