#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cynefin_server::run().await
}
