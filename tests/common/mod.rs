// Shared test helpers; not every binary uses all of them.
#![allow(unused)]

use std::net::SocketAddr;
use std::path::Path;

use mediarelay::config::Config;

pub const TEST_TOKEN: &str = "4242:TEST-TOKEN";
pub const TEST_CAPTION: &str = "Join our channel";
pub const TEST_ORIGIN: &str = "https://app.example.test";

/// A gateway bound to an ephemeral port, torn down with the test.
pub struct TestGateway {
    pub addr: SocketAddr,
    handle: tokio::task::JoinHandle<()>,
}

impl TestGateway {
    pub fn endpoint(&self) -> String {
        format!("http://{}/api/sendMedia", self.addr)
    }

    pub fn health_endpoint(&self) -> String {
        format!("http://{}/api/health", self.addr)
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn start_gateway(api_base: &str, spool_root: &Path) -> TestGateway {
    let mut config = Config::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config.server.spool_dir = Some(spool_root.to_path_buf());
    config.telegram.token = TEST_TOKEN.to_string();
    config.telegram.api_base = api_base.to_string();
    config.policy.allowed_origin = TEST_ORIGIN.to_string();
    config.policy.caption = TEST_CAPTION.to_string();

    let (handle, addr) = mediarelay::gateway::start(config)
        .await
        .expect("gateway should bind an ephemeral port");
    TestGateway { addr, handle }
}

pub fn jpeg_bytes(len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len.max(4)];
    data[..4].copy_from_slice(&[0xFF, 0xD8, 0xFF, 0xE0]);
    data
}

pub fn png_bytes() -> Vec<u8> {
    let mut data = vec![0u8; 256];
    data[..8].copy_from_slice(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]);
    data
}

pub fn gif_bytes() -> Vec<u8> {
    let mut data = vec![0u8; 64];
    data[..6].copy_from_slice(b"GIF89a");
    data
}

pub fn wav_bytes(len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len.max(12)];
    data[..4].copy_from_slice(b"RIFF");
    data[8..12].copy_from_slice(b"WAVE");
    data
}
