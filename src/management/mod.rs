mod account;
mod auth;
mod ingest;
mod playback;
mod tracks;

pub use account::DeviceIdentity;
pub use account::IdentityError;
pub use account::IdentityProvider;
pub use account::Profile;
pub use account::StoreIdentityProvider;
pub use account::provision_account;
pub use auth::TokenStore;
pub use ingest::IngestSummary;
pub use ingest::IngestionOrchestrator;
pub use playback::DEBOUNCE_MS;
pub use playback::FADE_IN_MS;
pub use playback::FADE_OUT_MS;
pub use playback::PlaybackError;
pub use playback::PlaybackSession;
pub use playback::PlaybackToggle;
pub use playback::PlayerCommand;
pub use playback::ToggleState;
pub use playback::is_stale;
pub use tracks::IngestReport;
pub use tracks::TrackIngestor;
