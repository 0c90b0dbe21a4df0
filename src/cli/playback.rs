use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tabled::Table;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::{
    cli::open_store,
    config::Settings,
    error, info,
    management::{
        DeviceIdentity, PlaybackSession, PlaybackToggle, TokenStore,
    },
    spotify::{auth::TokenBroker, player::PlayerClient},
    success,
    types::TrackTableRow,
    utils::TimeBucket,
    warning,
};

async fn open_session(settings: Settings) -> PlaybackSession {
    let identity = match DeviceIdentity::load().await {
        Ok(identity) => identity,
        Err(e) => error!(
            "No device identity found. Please run jukebox login\n Error: {}",
            e
        ),
    };

    let store = open_store(&settings);
    let player = PlayerClient::new(&settings);
    let broker = TokenBroker::new(Arc::new(settings), TokenStore::new(Arc::clone(&store)));
    PlaybackSession::new(identity.uid, store, broker, player)
}

/// Lists the tracks that would be played right now.
pub async fn now(settings: Settings) {
    let session = open_session(settings).await;
    let bucket = TimeBucket::now();

    match session.select_tracks(bucket).await {
        Ok(tracks) if tracks.is_empty() => warning!(
            "No tracks added on day {} at hour {}.",
            bucket.day,
            bucket.hour
        ),
        Ok(mut tracks) => {
            tracks.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
            let rows: Vec<TrackTableRow> = tracks.iter().map(TrackTableRow::from).collect();
            println!("{}", Table::new(rows));
        }
        Err(e) => error!("Cannot load tracks. Err: {}", e),
    }
}

pub async fn play(settings: Settings) {
    let session = open_session(settings).await;
    match session.play_now().await {
        Ok(count) => success!("Playing {} tracks.", count),
        Err(e) => error!("Cannot start playback. Err: {}", e),
    }
}

pub async fn resume(settings: Settings) {
    let session = open_session(settings).await;
    match session.resume().await {
        Ok(()) => success!("Resumed."),
        Err(e) => error!("Cannot resume playback. Err: {}", e),
    }
}

pub async fn pause(settings: Settings) {
    let session = open_session(settings).await;
    match session.pause().await {
        Ok(()) => success!("Paused."),
        Err(e) => error!("Cannot pause playback. Err: {}", e),
    }
}

pub async fn device(settings: Settings, device_id: String) {
    let session = open_session(settings).await;
    match session.save_device_id(&device_id).await {
        Ok(()) => success!("Device {} saved for user {}.", device_id, session.user_id()),
        Err(e) => error!("Cannot save device id. Err: {}", e),
    }
}

/// Single-button play/pause: every line on stdin is a button press.
pub async fn toggle(settings: Settings) {
    let session = open_session(settings).await;
    let mut toggle = PlaybackToggle::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(Duration::from_millis(100));

    info!("Press Enter to play or pause, Ctrl-D to quit.");
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(_)) => {
                    if !toggle.press(Utc::now()) {
                        warning!("Too fast, ignoring press.");
                    } else if toggle.is_playing() {
                        info!("Fading in...");
                    } else {
                        info!("Fading out...");
                    }
                }
                Ok(None) => break,
                Err(e) => error!("Cannot read input. Err: {}", e),
            },
            _ = ticker.tick() => {
                let Some(command) = toggle.tick(Utc::now()) else {
                    continue;
                };
                match session.apply(command).await {
                    Ok(_) if toggle.is_playing() => success!("Playing."),
                    Ok(_) => success!("Paused."),
                    Err(e) => warning!("Player command failed: {}", e),
                }
            }
        }
    }
}
