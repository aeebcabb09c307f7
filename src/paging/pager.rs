use crate::attribution::{AttributionStrategy, IncidentAttributor, StrategyKind};
use crate::error::{AppError, Result};
use crate::models::{Incident, TimeRange, User};
use crate::source::{IncidentPage, IncidentQuery, IncidentSource};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use strum::Display;
use tracing::{debug, info, warn};

/// Incidents requested per page
pub const PAGE_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum PagerState {
    Fetching,
    Attributing,
    Done,
}

/// Everything collected for one user and window
#[derive(Debug)]
pub struct PagerOutcome {
    /// Attributed incidents in listing order, pages appended in order
    pub incidents: Vec<Incident>,
    pub strategy: StrategyKind,
    pub pages: usize,
    /// Recoverable per-page failures
    pub partial_errors: Vec<AppError>,
    /// Paging stopped early on request
    pub cancelled: bool,
}

/// Drives paginated incident retrieval and per-page attribution
pub struct IncidentPager {
    source: Arc<dyn IncidentSource>,
    attributor: IncidentAttributor,
    cancel: Option<Arc<AtomicBool>>,
}

impl IncidentPager {
    pub fn new(source: Arc<dyn IncidentSource>, attributor: IncidentAttributor) -> Self {
        Self {
            source,
            attributor,
            cancel: None,
        }
    }

    /// Stop before the next page once the flag is set
    pub fn with_cancellation(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    /// Collect the incidents of `user` in `window`.
    ///
    /// A user without teams cannot list incidents at all and yields `NoTeams`.
    pub async fn collect(&self, user: &User, window: &TimeRange) -> Result<PagerOutcome> {
        if !user.has_teams() {
            return Err(AppError::NoTeams {
                user: user.name.clone(),
            });
        }

        let strategy = self.attributor.strategy_for(user, window).await?;
        let query = IncidentQuery::for_window(window, user.team_ids(), PAGE_LIMIT);

        let mut outcome = PagerOutcome {
            incidents: Vec::new(),
            strategy: strategy.kind(),
            pages: 0,
            partial_errors: Vec::new(),
            cancelled: false,
        };

        let mut state = PagerState::Fetching;
        let mut offset = 0;
        let mut page = IncidentPage::default();

        while state != PagerState::Done {
            debug!(state = %state, offset, "Pager step");
            state = match state {
                PagerState::Fetching => {
                    if self.cancelled() {
                        warn!(offset, "Paging cancelled before next page");
                        outcome.cancelled = true;
                        PagerState::Done
                    } else {
                        page = self.source.list_incidents(&query.at_offset(offset)).await?;
                        outcome.pages += 1;
                        PagerState::Attributing
                    }
                }
                PagerState::Attributing => {
                    let more = page.more;
                    let listed = std::mem::take(&mut page.incidents);
                    self.attribute_page(strategy.as_ref(), listed, user, &mut outcome)
                        .await?;

                    if more {
                        offset += PAGE_LIMIT;
                        PagerState::Fetching
                    } else {
                        PagerState::Done
                    }
                }
                PagerState::Done => PagerState::Done,
            };
        }

        info!(
            user_id = %user.id,
            strategy = %outcome.strategy,
            pages = outcome.pages,
            incidents = outcome.incidents.len(),
            partial_errors = outcome.partial_errors.len(),
            "Incident collection completed"
        );

        Ok(outcome)
    }

    async fn attribute_page(
        &self,
        strategy: &dyn AttributionStrategy,
        listed: Vec<Incident>,
        user: &User,
        outcome: &mut PagerOutcome,
    ) -> Result<()> {
        let attribution = strategy.attribute(listed, user).await?;
        outcome.incidents.extend(attribution.incidents);
        match attribution.partial {
            Some(partial) if partial.is_recoverable() => {
                warn!(error = %partial, "Page attributed with missing data");
                outcome.partial_errors.push(partial);
            }
            Some(fatal) => return Err(fatal),
            None => {}
        }
        Ok(())
    }
}
