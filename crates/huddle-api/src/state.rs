//! Application state wiring the store and the coordinator together.
//!
//! `LobbyService` is generic over its store and collaborators; AppState pins
//! it to the SQLite store, the log-only notifier and the TOML translator.

use std::path::PathBuf;
use std::sync::Arc;

use huddle_core::service::lobby::LobbyService;
use huddle_infra::config::{load_config, resolve_data_dir};
use huddle_infra::i18n::TomlTranslator;
use huddle_infra::notify::LogNotifier;
use huddle_infra::sqlite::pool::database_url;
use huddle_infra::sqlite::store::SqliteStore;
use huddle_types::config::HuddleConfig;

pub type ConcreteLobbyService = LobbyService<SqliteStore, LogNotifier, TomlTranslator>;

/// Shared application state, used by both CLI commands and HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub lobby: Arc<ConcreteLobbyService>,
    pub config: Arc<HuddleConfig>,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Resolve the data directory, load config, open (and migrate) the database.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_config(&data_dir).await;

        let store = SqliteStore::open(&database_url(&data_dir)).await?;

        let translator = match &config.translations_dir {
            Some(dir) => TomlTranslator::load(dir, &config.default_language).await,
            None => TomlTranslator::new(config.default_language.clone()),
        };

        Ok(Self::from_parts(store, translator, config, data_dir))
    }

    pub fn from_parts(
        store: SqliteStore,
        translator: TomlTranslator,
        config: HuddleConfig,
        data_dir: PathBuf,
    ) -> Self {
        let lobby = LobbyService::new(
            store,
            LogNotifier::new(),
            translator,
            config.mailbox_retention,
        )
        .with_spyfall_locations(config.spyfall_locations.clone());
        Self {
            lobby: Arc::new(lobby),
            config: Arc::new(config),
            data_dir,
        }
    }

    pub fn store(&self) -> &SqliteStore {
        self.lobby.store()
    }
}
