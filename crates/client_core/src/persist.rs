//! Durable session slice. Only the user's identity and the current phase
//! survive a restart; everything else is refetched.

use std::str::FromStr;

use async_trait::async_trait;
use shared::domain::Phase;
use storage::Storage;
use tokio::sync::Mutex;
use tracing::warn;

const USER_NAME_KEY: &str = "user_name";
const CURRENT_PHASE_KEY: &str = "current_phase";

/// The fields restored when a session store opens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedSession {
    pub user_name: Option<String>,
    pub phase: Option<Phase>,
}

/// Where the durable session slice lives. The store only ever writes one
/// field at a time, so partial failures leave the other field intact.
#[async_trait]
pub trait SessionPersistence: Send + Sync {
    async fn load(&self) -> anyhow::Result<PersistedSession>;
    async fn save_user_name(&self, name: &str) -> anyhow::Result<()>;
    async fn save_phase(&self, phase: Phase) -> anyhow::Result<()>;
    async fn clear(&self) -> anyhow::Result<()>;
}

/// Sqlite-backed persistence.
pub struct DurableSessionStore {
    store: Storage,
}

impl DurableSessionStore {
    pub async fn open(database_url: &str) -> anyhow::Result<Self> {
        let store = Storage::new(database_url).await?;
        Ok(Self { store })
    }

    pub fn with_storage(store: Storage) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SessionPersistence for DurableSessionStore {
    async fn load(&self) -> anyhow::Result<PersistedSession> {
        let user_name = self.store.load_value(USER_NAME_KEY).await?;
        let phase = match self.store.load_value(CURRENT_PHASE_KEY).await? {
            Some(raw) => match Phase::from_str(&raw) {
                Ok(phase) => Some(phase),
                Err(err) => {
                    warn!(%err, "ignoring unparseable persisted phase");
                    None
                }
            },
            None => None,
        };
        Ok(PersistedSession { user_name, phase })
    }

    async fn save_user_name(&self, name: &str) -> anyhow::Result<()> {
        self.store.save_value(USER_NAME_KEY, name).await
    }

    async fn save_phase(&self, phase: Phase) -> anyhow::Result<()> {
        self.store.save_value(CURRENT_PHASE_KEY, phase.as_str()).await
    }

    async fn clear(&self) -> anyhow::Result<()> {
        self.store.delete_value(USER_NAME_KEY).await?;
        self.store.delete_value(CURRENT_PHASE_KEY).await?;
        Ok(())
    }
}

/// In-memory persistence for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemorySessionStore {
    inner: Mutex<PersistedSession>,
}

#[async_trait]
impl SessionPersistence for MemorySessionStore {
    async fn load(&self) -> anyhow::Result<PersistedSession> {
        Ok(self.inner.lock().await.clone())
    }

    async fn save_user_name(&self, name: &str) -> anyhow::Result<()> {
        self.inner.lock().await.user_name = Some(name.to_string());
        Ok(())
    }

    async fn save_phase(&self, phase: Phase) -> anyhow::Result<()> {
        self.inner.lock().await.phase = Some(phase);
        Ok(())
    }

    async fn clear(&self) -> anyhow::Result<()> {
        *self.inner.lock().await = PersistedSession::default();
        Ok(())
    }
}
