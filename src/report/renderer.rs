use crate::error::Result;
use crate::report::shift_report::{categorize, ShiftReport};
use handlebars::{handlebars_helper, Handlebars};
use serde_json::Value;
use tracing::debug;

handlebars_helper!(category: |name: str, incidents: Json| {
    let items = incidents.as_array().cloned().unwrap_or_default();
    let matched = categorize(name, &items, |incident| {
        incident.get("title").and_then(Value::as_str).unwrap_or_default()
    });
    serde_json::to_value(matched).unwrap_or(Value::Null)
});

/// Renders shift reports from user-supplied handlebars templates
pub struct ReportRenderer {
    handlebars: Handlebars<'static>,
}

impl Default for ReportRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportRenderer {
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        // reports are plain text
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars.register_helper("category", Box::new(category));
        Self { handlebars }
    }

    pub fn render(&self, template: &str, report: &ShiftReport) -> Result<String> {
        debug!(
            incidents = report.incidents.len(),
            template_len = template.len(),
            "Rendering shift report"
        );
        Ok(self.handlebars.render_template(template, report)?)
    }
}
