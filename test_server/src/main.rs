#[tokio::main]
async fn main() -> std::io::Result<()> {
    test_server::run_with_config().await
}
