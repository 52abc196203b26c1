#[tokio::main]
async fn main() -> anyhow::Result<()> {
    focussense_lib::run().await
}
