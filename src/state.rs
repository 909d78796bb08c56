use anyhow::{bail, Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::Config;
use crate::db::Database;
use crate::session::SessionStore;
use crate::storage::UploadStore;

/// Shared handles passed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub uploads: Arc<UploadStore>,
    pub sessions: Arc<SessionStore>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Open the database, create the schema and seed admins, prepare the
    /// upload directory and drop files no image row points at.
    pub fn open(config: Config) -> Result<Self> {
        let uploads = UploadStore::new(&config.upload_dir);
        uploads.ensure_dir()?;
        // Everything under the upload dir is served publicly and swept.
        if is_within(&config.db_path, uploads.dir())? {
            bail!(
                "Database {:?} must not live inside the upload directory {:?}",
                config.db_path,
                config.upload_dir
            );
        }

        let db = Database::open(&config.db_path, config.pool_size)?;
        db.initialize()?;
        info!("Database ready at {:?}", config.db_path);

        let seeded = db.seed_admins()?;
        if seeded > 0 {
            info!("Seeded {} admin account(s)", seeded);
        }

        let orphans = uploads.sweep_orphans(&db.image_filenames()?)?;
        for name in &orphans {
            warn!("Removed orphaned upload {:?}", name);
        }

        if config.uses_default_secret() {
            warn!("Using the default secret key; set GALLERY_SECRET_KEY before deploying");
        }

        let sessions = SessionStore::new(
            &config.secret_key,
            Duration::from_secs(config.session_ttl_secs),
        );

        Ok(Self {
            db,
            uploads: Arc::new(uploads),
            sessions: Arc::new(sessions),
            config: Arc::new(config),
        })
    }
}

/// Whether `path` (which may not exist yet) sits at or below `dir`.
fn is_within(path: &Path, dir: &Path) -> Result<bool> {
    let dir = dir
        .canonicalize()
        .with_context(|| format!("Failed to resolve {:?}", dir))?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    // Resolve the nearest existing ancestor and re-append the rest.
    let mut existing = parent;
    let mut missing = Vec::new();
    while !existing.exists() {
        match (existing.file_name(), existing.parent()) {
            (Some(name), Some(up)) => {
                missing.push(name.to_os_string());
                existing = if up.as_os_str().is_empty() { Path::new(".") } else { up };
            }
            _ => break,
        }
    }
    let mut resolved = existing
        .canonicalize()
        .with_context(|| format!("Failed to resolve {:?}", existing))?;
    resolved.extend(missing.iter().rev());
    Ok(resolved.starts_with(&dir))
}
