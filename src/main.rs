#[tokio::main]
async fn main() -> anyhow::Result<()> {
    klinika_lib::run().await?;
    Ok(())
}
