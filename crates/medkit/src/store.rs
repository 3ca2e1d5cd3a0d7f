//! Backend session: builds a `Runtime` for the active profile and writes
//! a memory store back to its JSON file after the command ran.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use medkit_config::{BackendKind, ResolvedProfile};
use medkit_domain::{Backends, MemoryBackend, Runtime, StoreSnapshot};

use crate::cli::GlobalOpts;
use crate::config;
use crate::error::CliError;

/// A store file bound to the in-memory backend serving it.
struct BoundStore {
    path: PathBuf,
    backend: Arc<MemoryBackend>,
    baseline: StoreSnapshot,
}

pub struct Session {
    profile: ResolvedProfile,
    runtime: Runtime,
    store: Option<BoundStore>,
}

impl Session {
    /// Resolve the active profile, build its runtime and initialize it.
    pub async fn open(global: &GlobalOpts) -> Result<Self, CliError> {
        let cfg = config::load_config()?;
        let profile = config::resolve_profile(global, &cfg)?;

        let (backends, store) = match profile.backend {
            BackendKind::Default => (Backends::unsupported(), None),
            BackendKind::Memory => {
                let snapshot = match profile.store {
                    Some(ref path) => read_store(path)?,
                    None => StoreSnapshot::default(),
                };
                let backend = Arc::new(MemoryBackend::from_snapshot(snapshot));
                let store = profile.store.clone().map(|path| BoundStore {
                    path,
                    baseline: backend.snapshot(),
                    backend: backend.clone(),
                });
                (Backends::shared(backend), store)
            }
        };

        debug!(
            profile = %profile.name,
            backend = %profile.backend,
            store = ?profile.store,
            "opening session"
        );
        let runtime = Runtime::new(profile.runtime.clone(), backends);
        runtime.initialize().await?;

        Ok(Self {
            profile,
            runtime,
            store,
        })
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn profile_name(&self) -> &str {
        &self.profile.name
    }

    /// Write the store back if the command changed it.
    pub fn persist(&self) -> Result<bool, CliError> {
        let Some(ref store) = self.store else {
            return Ok(false);
        };
        let current = store.backend.snapshot();
        if current == store.baseline {
            return Ok(false);
        }
        write_store(&store.path, &current)?;
        debug!(path = %store.path.display(), "store written");
        Ok(true)
    }
}

// ── Store file I/O ──────────────────────────────────────────────────

/// Read a store file. A missing file is an empty store.
pub fn read_store(path: &Path) -> Result<StoreSnapshot, CliError> {
    if !path.exists() {
        return Ok(StoreSnapshot::default());
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|source| CliError::Store {
        path: path.display().to_string(),
        source,
    })
}

pub fn write_store(path: &Path, snapshot: &StoreSnapshot) -> Result<(), CliError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(snapshot).map_err(|source| CliError::Store {
        path: path.display().to_string(),
        source,
    })?;
    std::fs::write(path, json + "\n")?;
    Ok(())
}
