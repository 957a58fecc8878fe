// Shared test server for the integration tests in this crate.
use std::sync::{OnceLock, mpsc};
use std::time::Duration;

static BASE_URL: OnceLock<String> = OnceLock::new();

// Start the server on first use and return its base URL.
pub fn ensure_server() -> &'static str {
    BASE_URL.get_or_init(start_server).as_str()
}

fn start_server() -> String {
    let (addr_tx, addr_rx) = mpsc::channel();

    // The server gets its own runtime so it outlives each `#[tokio::test]` runtime.
    std::thread::spawn(move || {
        let runtime = tokio::runtime::Runtime::new().expect("test runtime");
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                .await
                .expect("bind ephemeral test port");
            let addr = listener.local_addr().expect("local addr");
            addr_tx.send(addr).expect("publish test server addr");
            test_server::run(listener).await.expect("server failed");
        });
    });

    // The listener is bound before the address is sent, so connections queue from here on.
    let addr = addr_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("test server did not start in time");
    format!("http://{addr}")
}
