use crate::attribution::IncidentAttributor;
use crate::cli::output::{self, group_on_calls};
use crate::cli::Commands;
use crate::config::{ConfigField, ConfigStore, PdConfig, Settings};
use crate::enrichment::{BatchEnricher, NoteEnricher};
use crate::error::{AppError, Result};
use crate::models::{IncidentDetail, TimeRange, User};
use crate::paging::{IncidentPager, PagerOutcome, PAGE_LIMIT};
use crate::report::{ReportRenderer, ShiftReport};
use crate::schedule::ShiftSchedule;
use crate::source::{IncidentSource, PagerDutyClient};
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, Utc};
use std::io::Write;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

const SET_OWN_SHIFT: &str = "set-own-shift";

/// Default look-back of `list-alerts` without `--from`
const DEFAULT_LIST_WINDOW_HOURS: i64 = 24;

/// Everything a command needs besides its arguments
pub struct CommandContext {
    settings: Settings,
    store: Arc<dyn ConfigStore>,
    source: Option<Arc<dyn IncidentSource>>,
    /// Reference time for calculations (defaults to now, but can be overridden for testing)
    reference_time: Option<DateTime<Utc>>,
    local_offset_minutes: Option<i32>,
    cancel: Arc<AtomicBool>,
}

impl CommandContext {
    pub fn new(settings: Settings, store: Arc<dyn ConfigStore>) -> Self {
        Self {
            settings,
            store,
            source: None,
            reference_time: None,
            local_offset_minutes: None,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Use a fixed incident source instead of the PagerDuty API
    pub fn with_source(mut self, source: Arc<dyn IncidentSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_reference_time(mut self, reference_time: DateTime<Utc>) -> Self {
        self.reference_time = Some(reference_time);
        self
    }

    pub fn with_local_offset(mut self, minutes: i32) -> Self {
        self.local_offset_minutes = Some(minutes);
        self
    }

    /// Flag that stops incident paging before the next page
    pub fn cancellation(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    fn now(&self) -> DateTime<Utc> {
        self.reference_time.unwrap_or_else(Utc::now)
    }

    fn local_offset_minutes(&self) -> i32 {
        self.local_offset_minutes
            .unwrap_or_else(|| Local::now().offset().local_minus_utc() / 60)
    }

    fn batch(&self) -> BatchEnricher {
        BatchEnricher::new(self.settings.parallelism)
    }

    fn schedule(&self, config: &PdConfig) -> Result<ShiftSchedule> {
        let schedule = config.schedule()?;
        if schedule.is_empty() {
            return Err(AppError::Configuration(
                "no shift-times configured, add them to the configuration file".to_string(),
            ));
        }
        Ok(match self.reference_time {
            Some(at) => schedule.with_reference_time(at),
            None => schedule,
        })
    }

    fn source(&self, config: &PdConfig) -> Result<Arc<dyn IncidentSource>> {
        if let Some(source) = &self.source {
            return Ok(Arc::clone(source));
        }
        let client = PagerDutyClient::new(
            config.require_token()?,
            self.settings.api_url.clone(),
            self.settings.request_timeout(),
        )?;
        Ok(Arc::new(client))
    }

    fn pager(&self, source: Arc<dyn IncidentSource>) -> IncidentPager {
        let attributor = IncidentAttributor::new(Arc::clone(&source), self.batch());
        IncidentPager::new(source, attributor).with_cancellation(self.cancellation())
    }
}

/// Run one command, writing its report to `out`
pub async fn run(command: Commands, ctx: &CommandContext, out: &mut (dyn Write + Send)) -> Result<()> {
    match command {
        Commands::CurrentShift => current_shift(ctx, out),
        Commands::OnCall => on_call(ctx, out).await,
        Commands::ListAlerts { id, from, to } => {
            list_alerts(ctx, id.as_deref(), from.as_deref(), to.as_deref(), out).await
        }
        Commands::ShiftReport { id, template, date } => {
            shift_report(ctx, id.as_deref(), template.as_deref(), date.as_deref(), out).await
        }
        Commands::SetOwnShift { name } => set_own_shift(ctx, name.as_deref(), out),
        Commands::SetToken { token } => set_token(ctx, &token, out),
    }
}

fn current_shift(ctx: &CommandContext, out: &mut (dyn Write + Send)) -> Result<()> {
    let config = ctx.store.load()?;
    let status = ctx.schedule(&config)?.status();

    let Some(current) = status.current else {
        writeln!(out, "At the moment, no shift is in charge.")?;
        return Ok(());
    };

    writeln!(out, "At the moment, {} is in charge.", current.name)?;
    if let (Some(next), Some(minutes)) = (status.next, status.minutes_until_next) {
        writeln!(
            out,
            "The next shift will be {} in {} hours",
            next.name,
            output::hours_minutes(minutes)
        )?;
    }
    Ok(())
}

async fn on_call(ctx: &CommandContext, out: &mut (dyn Write + Send)) -> Result<()> {
    let config = ctx.store.load()?;
    let source = ctx.source(&config)?;

    let user = source.current_user().await?;
    let on_calls = source.list_on_calls(&user.id, None).await?;
    let groups = group_on_calls(&on_calls);

    if groups.is_empty() {
        writeln!(
            out,
            "You are fine, there seem to be no on-call listed for your user.\nHave a nice day."
        )?;
        return Ok(());
    }

    writeln!(out, "It turns out, you are on-call.")?;
    for group in groups {
        writeln!(out)?;
        writeln!(
            out,
            "on-call from {} to {}",
            output::local_time(&group.window.start),
            output::local_time(&group.window.end)
        )?;
        for policy in group.policies {
            writeln!(out, "  {} | {}", policy.summary, policy.html_url)?;
        }
    }
    Ok(())
}

async fn list_alerts(
    ctx: &CommandContext,
    id: Option<&str>,
    from: Option<&str>,
    to: Option<&str>,
    out: &mut (dyn Write + Send),
) -> Result<()> {
    let config = ctx.store.load()?;
    let source = ctx.source(&config)?;
    let user = source.resolve_user(id).await?;

    let end = match to {
        Some(value) => parse_instant("--to", value, true)?,
        None => ctx.now(),
    };
    let start = match from {
        Some(value) => parse_instant("--from", value, false)?,
        None => end - Duration::hours(DEFAULT_LIST_WINDOW_HOURS),
    };
    let window = TimeRange::new(start, end);

    let outcome = collect_or_report_no_teams(ctx, Arc::clone(&source), &user, &window, out).await?;
    let Some(outcome) = outcome else {
        return Ok(());
    };

    let notes = NoteEnricher::new(source, ctx.batch());
    let mut partial_errors = outcome.partial_errors;
    let mut number = 0;

    for page in outcome.incidents.chunks(PAGE_LIMIT) {
        let (details, partial) = notes.enrich(page.to_vec()).await;
        partial_errors.extend(partial);
        for detail in &details {
            number += 1;
            write_incident(out, number, detail)?;
        }
    }

    if number == 0 {
        writeln!(out, "No incidents found for {}.", user.name)?;
    }
    write_partial_errors(out, &partial_errors)?;

    if outcome.cancelled {
        writeln!(
            out,
            "Warning: interrupted after {} page(s), the listing is incomplete",
            outcome.pages
        )?;
        return Err(interrupted(outcome.pages));
    }
    Ok(())
}

fn write_incident(out: &mut (dyn Write + Send), number: usize, detail: &IncidentDetail) -> Result<()> {
    let incident = &detail.incident;
    writeln!(out)?;
    writeln!(out, "{}. {}", number, incident.title)?;

    if incident.has_distinct_description() {
        writeln!(out, "   Description:")?;
        for line in incident.description.lines() {
            writeln!(out, "      {}", line)?;
        }
    }

    writeln!(out, "   Link: {}", incident.html_link)?;
    writeln!(
        out,
        "   Time: {} - {} ({})",
        output::local_time(&incident.created_at),
        output::local_time(&incident.last_status_change_at),
        output::duration(incident.duration())
    )?;

    if !detail.notes.is_empty() {
        writeln!(out, "   Notes:")?;
        // newest first
        for (i, note) in detail.notes.iter().rev().enumerate() {
            let content = note.content.lines().collect::<Vec<_>>().join("\n         ");
            writeln!(out, "      {}. {}", i + 1, content)?;
            writeln!(
                out,
                "         (by {} at {})",
                note.author_name,
                output::note_time(&note.created_at)
            )?;
        }
    }
    Ok(())
}

async fn shift_report(
    ctx: &CommandContext,
    id: Option<&str>,
    template: Option<&str>,
    date: Option<&str>,
    out: &mut (dyn Write + Send),
) -> Result<()> {
    let (Some(id), Some(template), Some(date)) = (id, template, date) else {
        return Err(AppError::Validation(
            "Please use all flags: --id, --template and --date".to_string(),
        ));
    };

    let config = ctx.store.load()?;
    let schedule = ctx.schedule(&config)?;
    let own_shift = schedule.own_shift().cloned().ok_or_else(|| {
        AppError::Configuration(format!(
            "own shift is not configured, please run `pd-shift {}` first",
            SET_OWN_SHIFT
        ))
    })?;
    let template = config.template(template)?;
    let date = ShiftReport::parse_date(date)?;
    let window = ShiftReport::window(date)?;

    let source = ctx.source(&config)?;
    let user = source.resolve_user(Some(id)).await?;
    let outcome = ctx.pager(source).collect(&user, &window).await?;
    if outcome.cancelled {
        return Err(interrupted(outcome.pages));
    }

    let report = ShiftReport::new(&user.name, date, &own_shift, outcome.incidents);
    let rendered = ReportRenderer::new().render(template, &report)?;
    writeln!(out, "{}", rendered)?;
    write_partial_errors(out, &outcome.partial_errors)?;
    Ok(())
}

fn set_own_shift(ctx: &CommandContext, name: Option<&str>, out: &mut (dyn Write + Send)) -> Result<()> {
    let config = ctx.store.load()?;
    let schedule = ctx.schedule(&config)?;

    let Some(name) = name else {
        let offset = ctx.local_offset_minutes();
        let shift = schedule
            .probable_shift_for_local_offset(offset)
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "no shift covers the midday of your time zone, please run `pd-shift {}` followed by your shift name",
                    SET_OWN_SHIFT
                ))
            })?;
        ctx.store.update(ConfigField::OwnShift, &shift.name)?;
        info!(shift = %shift.name, utc_offset_minutes = offset, "Own shift guessed from time zone");

        writeln!(out, "You've been added to {} because of your timezone.", shift.name)?;
        writeln!(
            out,
            "If this is not the right shift, please run the '{}' command followed by your shift name.",
            SET_OWN_SHIFT
        )?;
        return Ok(());
    };

    let shift = schedule.find_by_name_or_alias(name).ok_or_else(|| {
        let names: Vec<&str> = schedule.shifts().iter().map(|s| s.alias()).collect();
        AppError::Validation(format!(
            "Your input was invalid. Please run the '{}' command followed by one of these: {}",
            SET_OWN_SHIFT,
            names.join(" / ")
        ))
    })?;
    ctx.store.update(ConfigField::OwnShift, &shift.name)?;
    writeln!(out, "You've been added to {}", shift.name)?;
    Ok(())
}

fn set_token(ctx: &CommandContext, token: &str, out: &mut (dyn Write + Send)) -> Result<()> {
    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::Validation("the authtoken cannot be empty".to_string()));
    }
    ctx.store.update(ConfigField::Authtoken, token)?;
    writeln!(out, "The authtoken has been stored.")?;
    Ok(())
}

/// Collect incidents, turning the no-teams condition into a message instead of a failure
async fn collect_or_report_no_teams(
    ctx: &CommandContext,
    source: Arc<dyn IncidentSource>,
    user: &User,
    window: &TimeRange,
    out: &mut (dyn Write + Send),
) -> Result<Option<PagerOutcome>> {
    match ctx.pager(source).collect(user, window).await {
        Ok(outcome) => Ok(Some(outcome)),
        Err(AppError::NoTeams { user }) => {
            writeln!(
                out,
                "This PagerDuty account ({}) is not part of any teams. To use this function, the account must be part of at least one team.",
                user
            )?;
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn interrupted(pages: usize) -> AppError {
    AppError::Interrupted(format!("incident paging stopped after {} page(s)", pages))
}

fn write_partial_errors(out: &mut (dyn Write + Send), errors: &[AppError]) -> Result<()> {
    for error in errors {
        warn!(error = %error, "Output is missing data");
        writeln!(out, "Warning: {}", error)?;
    }
    Ok(())
}

/// RFC 3339 instant, or a bare date taken as the start (or end) of that UTC day
fn parse_instant(flag: &str, value: &str, end_of_day: bool) -> Result<DateTime<Utc>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Ok(instant.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        AppError::Validation(format!(
            "{} expects an RFC 3339 time or YYYY-MM-DD, got {:?}",
            flag, value
        ))
    })?;
    let time = if end_of_day {
        NaiveTime::from_hms_opt(23, 59, 59)
    } else {
        NaiveTime::from_hms_opt(0, 0, 0)
    };
    time.map(|time| date.and_time(time).and_utc())
        .ok_or_else(|| AppError::Internal(format!("invalid day bound for {}", date)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_instant() {
        let start = parse_instant("--from", "2024-01-15", false).unwrap();
        let end = parse_instant("--to", "2024-01-15", true).unwrap();
        assert_eq!(start.to_rfc3339(), "2024-01-15T00:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2024-01-15T23:59:59+00:00");

        let exact = parse_instant("--from", "2024-01-15T10:30:00+02:00", false).unwrap();
        assert_eq!(exact.to_rfc3339(), "2024-01-15T08:30:00+00:00");

        assert!(matches!(
            parse_instant("--from", "last week", false),
            Err(AppError::Validation(_))
        ));
    }
}
