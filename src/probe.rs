use std::sync::Arc;

use crate::backend::{ProbeError, RecordSource};

/// One-shot reachability check against a single remote table.
///
/// Reads at most one row of the `count` column. Any successful response,
/// empty or not, counts as reachable. There is no timeout and no retry.
#[derive(Clone)]
pub struct StatusProbe {
    source: Arc<dyn RecordSource>,
    table: String,
}

impl StatusProbe {
    pub fn new(source: Arc<dyn RecordSource>, table: impl Into<String>) -> Self {
        StatusProbe {
            source,
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub async fn check(&self) -> Result<(), ProbeError> {
        match self.source.select(&self.table, "count", 1).await {
            Ok(_) => {
                tracing::info!("backend reachable: table `{}` answered", self.table);
                Ok(())
            }
            Err(e) => {
                tracing::error!("backend connection test failed: {}", e);
                Err(e)
            }
        }
    }
}
