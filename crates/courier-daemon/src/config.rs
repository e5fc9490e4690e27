use std::path::PathBuf;

use anyhow::Context;

pub struct Config {
    pub db_path: PathBuf,
    pub data_dir: PathBuf,
    pub snapshot_path: PathBuf,
    pub sync_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let db_path: PathBuf = var("COURIER_DB_PATH")
            .unwrap_or_else(|| "courier.db".into())
            .into();
        let data_dir: PathBuf = var("COURIER_DATA_DIR")
            .unwrap_or_else(|| "./data".into())
            .into();
        let snapshot_path: PathBuf = var("COURIER_SNAPSHOT_PATH")
            .unwrap_or_else(|| "snapshot.json".into())
            .into();
        let sync_interval_secs: u64 = match var("COURIER_SYNC_INTERVAL_SECS") {
            Some(v) => v
                .parse()
                .with_context(|| format!("COURIER_SYNC_INTERVAL_SECS is not a number: {:?}", v))?,
            None => 15,
        };
        if sync_interval_secs == 0 {
            anyhow::bail!("COURIER_SYNC_INTERVAL_SECS must be at least 1");
        }

        // Artifact paths are joined onto this, keep it independent of later cwd changes
        let data_dir = if data_dir.is_absolute() {
            data_dir
        } else {
            std::env::current_dir()
                .context("cannot resolve the current directory")?
                .join(data_dir)
        };

        Ok(Self {
            db_path,
            data_dir,
            snapshot_path,
            sync_interval_secs,
        })
    }
}
