#[tokio::main]
async fn main() -> std::io::Result<()> {
    winter_server::run_with_config().await
}
