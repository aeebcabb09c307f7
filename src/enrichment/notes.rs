use crate::enrichment::batch::BatchEnricher;
use crate::error::{AppError, Result};
use crate::models::{Incident, IncidentDetail, Note, NoteDetail};
use crate::source::IncidentSource;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// Display name used when a note author cannot be looked up
pub const UNKNOWN_AUTHOR: &str = "unknown";

/// Attaches notes, with resolved author names, to attributed incidents
pub struct NoteEnricher {
    source: Arc<dyn IncidentSource>,
    batch: BatchEnricher,
    /// Author id -> display name, kept for the whole run
    authors: Arc<DashMap<String, String>>,
}

impl NoteEnricher {
    pub fn new(source: Arc<dyn IncidentSource>, batch: BatchEnricher) -> Self {
        Self {
            source,
            batch,
            authors: Arc::new(DashMap::new()),
        }
    }

    /// Fetch notes for every incident of a page.
    ///
    /// Incidents whose notes could not be fetched are kept with an empty note list;
    /// the failures come back as a partial-fetch error.
    pub async fn enrich(&self, incidents: Vec<Incident>) -> (Vec<IncidentDetail>, Option<AppError>) {
        let source = Arc::clone(&self.source);
        let authors = Arc::clone(&self.authors);

        let outcome = self
            .batch
            .enrich(&incidents, move |incident: Incident| {
                let source = Arc::clone(&source);
                let authors = Arc::clone(&authors);
                async move { fetch_note_details(source.as_ref(), &authors, &incident.id).await }
            })
            .await;

        let partial = outcome.partial_error("note");
        let details = incidents
            .into_iter()
            .zip(outcome.results)
            .map(|(incident, notes)| IncidentDetail { incident, notes })
            .collect();

        (details, partial)
    }

    pub fn cached_authors(&self) -> usize {
        self.authors.len()
    }
}

async fn fetch_note_details(
    source: &dyn IncidentSource,
    authors: &DashMap<String, String>,
    incident_id: &str,
) -> Result<Vec<NoteDetail>> {
    let notes = source.list_notes(incident_id).await?;
    let mut details = Vec::with_capacity(notes.len());
    for note in notes {
        let author_name = author_name(source, authors, &note).await;
        details.push(NoteDetail {
            content: note.content,
            author_name,
            created_at: note.created_at,
        });
    }
    Ok(details)
}

async fn author_name(
    source: &dyn IncidentSource,
    authors: &DashMap<String, String>,
    note: &Note,
) -> String {
    if let Some(name) = authors.get(&note.author_id) {
        return name.clone();
    }

    match source.get_user(&note.author_id).await {
        Ok(user) => {
            authors.insert(note.author_id.clone(), user.name.clone());
            user.name
        }
        Err(e) => {
            debug!(author_id = %note.author_id, error = %e, "Note author lookup failed");
            UNKNOWN_AUTHOR.to_string()
        }
    }
}
