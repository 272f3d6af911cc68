use syndicate::{DistributionConfig, Distributor, TrackMetadata, UploadRequest};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = if std::path::Path::new("config.toml").exists() {
        DistributionConfig::from_file("config.toml")?
    } else {
        DistributionConfig::default()
    };

    let file_path = std::env::args().nth(1).unwrap_or_else(|| "uploads/sample.mp3".to_string());
    let asset_id = std::env::args().nth(2).unwrap_or_else(|| "demo001".to_string());

    let distributor = Distributor::builder(config).build()?;

    let request = UploadRequest::new(asset_id, file_path, 1)
        .with_metadata(TrackMetadata::with_title("Demo Upload"));

    for outcome in distributor.dispatch_all(&request).await {
        println!("{}", serde_json::to_string(&outcome)?);
    }

    let snapshot = distributor.aggregator().snapshot().await;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    Ok(())
}
