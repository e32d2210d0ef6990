#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rigcheck::run().await
}
