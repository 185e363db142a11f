use reqwest::Client;
use std::time::Duration;

pub fn create_client() -> Client {
    Client::builder()
        .user_agent("illust-sync/0.2")
        .timeout(Duration::from_secs(30))
        .build()
        .expect("Failed to create HTTP client")
}
