//! Cron expression parsing and next-occurrence calculation.

use chrono::{DateTime, Local, Utc};
use croner::Cron;
use croner::errors::CronError;
use croner::parser::{CronParser, Seconds};

/// A parsed cron schedule, evaluated in the local timezone.
///
/// Accepts five fields (minute precision), six fields (leading seconds),
/// or seven fields (trailing year). Five-field expressions fire at second
/// zero. Day-of-week follows standard cron: 0 and 7 are Sunday, 1 is
/// Monday. Parsing matches the rules the production timer applies, so
/// `next_after` agrees with when ticks actually fire.
#[derive(Debug, Clone)]
pub struct CronSchedule {
    expression: String,
    normalized: String,
    cron: Cron,
}

impl CronSchedule {
    /// Parse a cron expression.
    pub fn parse(expression: &str) -> Result<Self, CronError> {
        let normalized = normalize(expression);
        let cron = parser().parse(&normalized)?;

        Ok(Self {
            expression: expression.trim().to_string(),
            normalized,
            cron,
        })
    }

    /// The expression as written.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// The expression with an explicit seconds field.
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// First occurrence strictly after `after`.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let local = after.with_timezone(&Local);
        self.cron
            .find_next_occurrence(&local, false)
            .ok()
            .map(|next| next.with_timezone(&Utc))
    }
}

/// Parser configured like the `tokio-cron-scheduler` timer.
fn parser() -> CronParser {
    CronParser::builder()
        .seconds(Seconds::Required)
        .dom_and_dow(true)
        .build()
}

/// Prepend a zero seconds field to five-field expressions.
fn normalize(expression: &str) -> String {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    if fields.len() == 5 {
        format!("0 {}", fields.join(" "))
    } else {
        fields.join(" ")
    }
}
