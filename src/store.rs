use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::config::StoreConfig;
use crate::error::{BridgeError, Result};

/// Key-value cache for the plan id of the last successfully provisioned device.
#[async_trait]
pub trait PlanIdStore: Send + Sync {
    async fn load_plan_id(&self) -> Result<Option<String>>;

    async fn save_plan_id(&self, plan_id: &str) -> Result<()>;

    /// Remove any cached provisioning data.
    async fn clear(&self) -> Result<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PreferenceGroup {
    plan_id: String,
    updated_at: DateTime<Utc>,
}

/// Preferences file holding named groups; only our group is touched, others are preserved.
pub struct FilePlanIdStore {
    path: PathBuf,
    preference_name: String,
}

impl FilePlanIdStore {
    pub fn new(path: impl Into<PathBuf>, preference_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            preference_name: preference_name.into(),
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(&config.path, &config.preference_name)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_groups(&self) -> Result<Map<String, Value>> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&text)? {
            Value::Object(groups) => Ok(groups),
            _ => Err(BridgeError::Store(format!(
                "{} does not contain a JSON object",
                self.path.display()
            ))),
        }
    }

    async fn write_groups(&self, groups: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let text = serde_json::to_string_pretty(groups)?;
        tokio::fs::write(&self.path, text).await?;
        Ok(())
    }
}

#[async_trait]
impl PlanIdStore for FilePlanIdStore {
    async fn load_plan_id(&self) -> Result<Option<String>> {
        let groups = self.read_groups().await?;
        let Some(group) = groups.get(&self.preference_name) else {
            return Ok(None);
        };

        let group: PreferenceGroup = serde_json::from_value(group.clone()).map_err(|e| {
            BridgeError::Store(format!("Invalid {} entry: {e}", self.preference_name))
        })?;
        Ok(Some(group.plan_id))
    }

    async fn save_plan_id(&self, plan_id: &str) -> Result<()> {
        let mut groups = self.read_groups().await?;
        let group = PreferenceGroup {
            plan_id: plan_id.to_string(),
            updated_at: Utc::now(),
        };
        groups.insert(self.preference_name.clone(), serde_json::to_value(group)?);
        self.write_groups(&groups).await?;

        tracing::info!(path = %self.path.display(), "Cached plan id");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut groups = self.read_groups().await?;
        if groups.remove(&self.preference_name).is_some() {
            self.write_groups(&groups).await?;
            tracing::info!(path = %self.path.display(), "Cleared cached plan id");
        }
        Ok(())
    }
}

/// Plan id cache that lives only as long as the process.
#[derive(Default)]
pub struct InMemoryPlanIdStore {
    plan_id: RwLock<Option<String>>,
}

impl InMemoryPlanIdStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PlanIdStore for InMemoryPlanIdStore {
    async fn load_plan_id(&self) -> Result<Option<String>> {
        Ok(self.plan_id.read().await.clone())
    }

    async fn save_plan_id(&self, plan_id: &str) -> Result<()> {
        *self.plan_id.write().await = Some(plan_id.to_string());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.plan_id.write().await = None;
        Ok(())
    }
}
