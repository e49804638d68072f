//! CLI command implementations

use crate::output::{format_rows, ChannelRow, CheckRow, OutputFormat};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tuner_core::{
    classify, Capabilities, HttpBackend, OpenRequest, PlaybackBackend, PlayerConfig, PlaylistLoader, SessionId,
};
use url::Url;

/// Print the channels of a playlist
pub async fn list(config: &PlayerConfig, format: &str) -> anyhow::Result<()> {
    let loader = PlaylistLoader::new(config.playlist_timeout())?;
    let playlist = loader.load(&config.playlist).await?;
    let capabilities = Capabilities::default();

    let rows: Vec<ChannelRow> = playlist
        .channels
        .iter()
        .enumerate()
        .map(|(i, channel)| ChannelRow::from_channel(i, channel, capabilities))
        .collect();

    let format = OutputFormat::from(format);
    if format != OutputFormat::Json {
        println!("Playlist: {} ({} channels)\n", playlist.source, playlist.len());
    }
    println!("{}", format_rows(&rows, format));

    Ok(())
}

/// Open and start every channel headlessly and report which ones play
pub async fn check(
    config: &PlayerConfig,
    limit: Option<usize>,
    timeout_secs: u64,
    format: &str,
) -> anyhow::Result<()> {
    let loader = PlaylistLoader::new(config.playlist_timeout())?;
    let playlist = loader.load(&config.playlist).await?;
    let backend = HttpBackend::new(Duration::from_secs(timeout_secs))?;
    let format = OutputFormat::from(format);

    let count = limit.unwrap_or(playlist.len()).min(playlist.len());
    let progress = if format == OutputFormat::Json {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(count as u64)
    };
    progress.set_style(
        ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );

    let mut rows = Vec::with_capacity(count);
    for (i, channel) in playlist.channels.iter().take(count).enumerate() {
        progress.set_message(channel.name.clone());

        let variant = classify(&channel.url, backend.capabilities());
        let outcome = match Url::parse(&channel.url) {
            Ok(url) => {
                let request = OpenRequest {
                    session_id: SessionId::new(),
                    url: &url,
                    variant,
                    tuning: &config.tuning,
                };
                match backend.open(request).await {
                    Ok(mut session) => {
                        let started = session.start().await;
                        session.release().await;
                        started.map_err(|e| e.to_string())
                    }
                    Err(e) => Err(e.to_string()),
                }
            }
            Err(e) => Err(format!("invalid URL: {}", e)),
        };

        rows.push(CheckRow {
            number: i + 1,
            name: channel.name.clone(),
            variant: variant.to_string(),
            result: match &outcome {
                Ok(()) => "PASS".to_string(),
                Err(reason) => format!("FAIL ({})", reason),
            },
            ok: outcome.is_ok(),
        });
        progress.inc(1);
    }
    progress.finish_and_clear();

    let passed = rows.iter().filter(|r| r.ok).count();
    let failed = rows.len() - passed;

    println!("{}", format_rows(&rows, format));
    if format != OutputFormat::Json {
        println!(
            "\nResults: {} passed, {} failed",
            style(passed).green(),
            if failed > 0 { style(failed).red() } else { style(failed).dim() }
        );
    }

    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}
