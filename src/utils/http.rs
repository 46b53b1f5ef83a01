use once_cell::sync::Lazy;
use reqwest::Client;
use std::time::Duration;

// Per-call deadlines are enforced by the orchestrator; this is only a ceiling.
static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(120))
        .build()
        .expect("Failed to build HTTP client")
});

pub fn get_http_client() -> &'static Client {
    &HTTP_CLIENT
}
