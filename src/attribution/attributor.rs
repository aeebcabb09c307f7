use crate::attribution::strategy::{
    select_strategy, Attribution, AttributionStrategy, LogEntryStrategy, OnCallWindowStrategy,
    StrategyKind,
};
use crate::enrichment::BatchEnricher;
use crate::error::Result;
use crate::models::{Incident, TimeRange, User};
use crate::source::IncidentSource;
use std::sync::Arc;
use tracing::info;

/// Builds the attribution strategy matching a requested window
pub struct IncidentAttributor {
    source: Arc<dyn IncidentSource>,
    batch: BatchEnricher,
}

impl IncidentAttributor {
    pub fn new(source: Arc<dyn IncidentSource>, batch: BatchEnricher) -> Self {
        Self { source, batch }
    }

    /// Strategy for the window, ready to filter pages.
    ///
    /// The on-call window scan fetches the user's on-calls here, so its failure
    /// surfaces before any incident is listed.
    pub async fn strategy_for(
        &self,
        user: &User,
        window: &TimeRange,
    ) -> Result<Box<dyn AttributionStrategy>> {
        let kind = select_strategy(window);
        info!(
            strategy = %kind,
            window_secs = window.duration().num_seconds(),
            "Selected attribution strategy"
        );

        Ok(match kind {
            StrategyKind::LogEntryScan => Box::new(LogEntryStrategy::new(
                Arc::clone(&self.source),
                self.batch,
            )),
            StrategyKind::OnCallWindowScan => Box::new(
                OnCallWindowStrategy::prepare(self.source.as_ref(), user, window).await?,
            ),
        })
    }

    /// Attribute a single batch of incidents
    pub async fn attribute(
        &self,
        incidents: Vec<Incident>,
        user: &User,
        window: &TimeRange,
    ) -> Result<Attribution> {
        self.strategy_for(user, window)
            .await?
            .attribute(incidents, user)
            .await
    }
}
