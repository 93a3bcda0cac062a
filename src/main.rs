#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = ai_detection_bridge::run().await {
        eprintln!("ai-detection-bridge fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
