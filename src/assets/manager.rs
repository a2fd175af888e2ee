use super::cache::AssetCache;
use super::{AssetError, AvatarModel, ClipInfo, VisualHandle};
use crate::config::AssetSettings;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Loads an avatar model by source name.
#[async_trait]
pub trait AvatarLoader: Send + Sync {
    async fn load(&self, source: &str) -> Result<AvatarModel, AssetError>;
}

#[derive(Debug, Deserialize)]
struct AvatarManifest {
    #[serde(default)]
    clips: Vec<ClipInfo>,
}

/// Reads `<root>/<source>.json` manifests listing a model's clips.
///
/// Manifests are parsed once per source; every load still gets a fresh
/// visual handle since each avatar needs its own instance.
#[derive(Debug)]
pub struct ManifestLoader {
    root: PathBuf,
    cache: Mutex<AssetCache<String, Vec<ClipInfo>>>,
}

impl ManifestLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: Mutex::new(AssetCache::new()),
        }
    }

    fn manifest_path(&self, source: &str) -> PathBuf {
        self.root.join(format!("{source}.json"))
    }

    async fn read_clips(&self, source: &str) -> Result<Vec<ClipInfo>, AssetError> {
        let path = self.manifest_path(source);
        let data = tokio::fs::read_to_string(&path).await.map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                AssetError::NotFound {
                    source_name: source.to_string(),
                }
            } else {
                AssetError::Io {
                    source_name: source.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;
        let manifest: AvatarManifest =
            serde_json::from_str(&data).map_err(|e| AssetError::InvalidManifest {
                source_name: source.to_string(),
                reason: e.to_string(),
            })?;
        info!("Loaded model manifest {} ({} clips)", path.display(), manifest.clips.len());
        Ok(manifest.clips)
    }
}

#[async_trait]
impl AvatarLoader for ManifestLoader {
    async fn load(&self, source: &str) -> Result<AvatarModel, AssetError> {
        let mut cache = self.cache.lock().await;
        let key = source.to_string();
        let clips = match cache.get(&key) {
            Some(clips) => clips.clone(),
            None => {
                let clips = self.read_clips(source).await?;
                cache.insert(key, clips.clone());
                clips
            }
        };
        Ok(AvatarModel {
            handle: VisualHandle::next(),
            clips,
        })
    }
}

/// In-memory models, for headless runs and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticLoader {
    models: HashMap<String, Vec<ClipInfo>>,
}

impl StaticLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, source: impl Into<String>, clips: Vec<ClipInfo>) -> Self {
        self.models.insert(source.into(), clips);
        self
    }

    /// The stock soldier rig with its idle, walk and run cycles.
    pub fn soldier() -> Self {
        Self::new().with_model(
            "Soldier",
            vec![
                ClipInfo::new("Idle", 2.0),
                ClipInfo::new("Run", 0.73),
                ClipInfo::new("TPose", 0.03),
                ClipInfo::new("Walk", 1.07),
            ],
        )
    }
}

#[async_trait]
impl AvatarLoader for StaticLoader {
    async fn load(&self, source: &str) -> Result<AvatarModel, AssetError> {
        let clips = self.models.get(source).cloned().ok_or_else(|| AssetError::NotFound {
            source_name: source.to_string(),
        })?;
        debug!("Instantiated static model {}", source);
        Ok(AvatarModel {
            handle: VisualHandle::next(),
            clips,
        })
    }
}

/// Load the local avatar and pick the loader used for peers.
///
/// Only a missing manifest can fall back to the built-in soldier, and only
/// when `builtin_fallback` is set. Any other failure is returned.
pub async fn load_local_avatar(
    settings: &AssetSettings,
) -> Result<(Arc<dyn AvatarLoader>, AvatarModel), AssetError> {
    let manifests = ManifestLoader::new(&settings.root);
    let loaded = manifests.load(&settings.avatar_model).await;
    match loaded {
        Ok(model) => {
            let loader: Arc<dyn AvatarLoader> = Arc::new(manifests);
            Ok((loader, model))
        }
        Err(AssetError::NotFound { source_name }) if settings.builtin_fallback => {
            warn!("Model '{}' not found; using built-in soldier model", source_name);
            let fallback = StaticLoader::soldier();
            let model = fallback.load(&settings.avatar_model).await?;
            let loader: Arc<dyn AvatarLoader> = Arc::new(fallback);
            Ok((loader, model))
        }
        Err(e) => Err(e),
    }
}
