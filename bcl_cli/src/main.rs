//! One-shot bin collection reminder run.
//!
//! Looks up the next collection in the calendar feed, switches the OpenRGB
//! lighting profiles to match and optionally sends a Bark push notification.
//! Meant to be scheduled externally, e.g. once daily.

use std::path::PathBuf;

use anyhow::Result;
use bcl_core::{
    bark_client, collection_client,
    collection_client::UpcomingCollection,
    config::{Config, LightingConfig},
    openrgb_client,
    openrgb_client::OpenRgbClient,
    profile::{classify, select_profile},
};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command()]
pub struct Arguments {
    /// path to the configuration file
    #[arg(long, default_value = "config.toml")]
    pub config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Arguments::parse();
    let config = Config::load(&args.config)?;
    let calendar_file = config.calendar_path(&args.config);

    let collection =
        collection_client::get(config.calendar_url.as_deref(), &calendar_file).await?;
    let Some(collection) = collection else {
        warn!("no upcoming bin collection events found");
        return Ok(());
    };
    info!(collection = %collection.combined_summary, "next bin collection event");

    apply_lighting(&config.lighting, &collection).await?;

    match &config.notification_key {
        Some(api_key) => {
            let collection_types = classify(&collection.combined_summary);
            match bark_client::send(api_key, collection_types).await {
                Ok(()) => info!("push notification sent"),
                Err(error) => error!(%error, "failed to send push notification"),
            }
        }
        None => warn!("notification key not configured, skipping push notification"),
    }
    Ok(())
}

/// Switch every connected device to the profile matching the collection.
async fn apply_lighting(lighting: &LightingConfig, collection: &UpcomingCollection) -> Result<()> {
    let mut client =
        OpenRgbClient::connect(&lighting.host, lighting.port, &lighting.client_name).await?;
    let devices = client.device_names().await?;
    let profiles = client.list_profiles().await?;
    let selection = select_profile(classify(&collection.combined_summary));
    for device in &devices {
        info!(device = %device, "lighting device found");
        let Some(profile_name) = lighting.profile_name(selection) else {
            error!("unknown bin collection event type");
            continue;
        };
        match openrgb_client::find_profile_index(&profiles, profile_name) {
            Some(index) => {
                client.load_profile_by_index(index).await?;
                info!(profile = %profile_name, "loaded lighting profile");
            }
            None => {
                error!(profile = %profile_name, "no server profile matches the configured name");
            }
        }
    }
    Ok(())
}
