use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChurnConfig {
    pub database_path:       String,
    /// Absent, or pointing at a missing file, means heuristic scoring.
    pub model_bundle_path:   Option<String>,
    /// `None` keeps the unseeded confidence jitter of the heuristic path.
    pub confidence_seed:     Option<u64>,
    pub history_page_size:   usize,
    pub customer_list_limit: usize,
    pub high_risk_list_limit: usize,
    pub daily_list_limit:    usize,
}

impl Default for ChurnConfig {
    fn default() -> Self {
        Self {
            database_path:        "churn.db".into(),
            model_bundle_path:    None,
            confidence_seed:      None,
            history_page_size:    50,
            customer_list_limit:  50,
            high_risk_list_limit: 100,
            daily_list_limit:     1000,
        }
    }
}

impl ChurnConfig {
    /// Load from a JSON file. Omitted keys take their defaults.
    /// In tests, use ChurnConfig::default_test().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: ChurnConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.check()?;
        Ok(config)
    }

    /// In-memory database, no bundle, deterministic jitter.
    pub fn default_test() -> Self {
        Self {
            database_path:   ":memory:".into(),
            confidence_seed: Some(0xC4E5_F1CA),
            ..Self::default()
        }
    }

    fn check(&self) -> anyhow::Result<()> {
        if self.database_path.trim().is_empty() {
            anyhow::bail!("database_path must not be empty");
        }
        if self.history_page_size == 0 {
            anyhow::bail!("history_page_size must be > 0");
        }
        Ok(())
    }
}
