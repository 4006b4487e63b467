use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::datetime::EventStart;
use crate::error::{CalendarError, CalendarResult};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventDetails {
    #[serde(default)]
    pub short_title: Option<String>,

    #[serde(default)]
    pub link: Option<String>,

    #[serde(default)]
    pub hover_title: Option<String>,

    #[serde(default)]
    pub date: Option<String>,

    #[serde(default, alias = "day_span")]
    pub days_span: Option<u32>,

    #[serde(default)]
    pub color: Option<String>,
}

impl EventDetails {
    pub fn new(short_title: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            short_title: Some(short_title.into()),
            date: Some(date.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    #[must_use]
    pub fn hover_title(mut self, hover_title: impl Into<String>) -> Self {
        self.hover_title = Some(hover_title.into());
        self
    }

    #[must_use]
    pub fn days_span(mut self, days: u32) -> Self {
        self.days_span = Some(days);
        self
    }

    #[must_use]
    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    short_title: String,
    hover_title: String,
    link: String,
    raw_date: String,
    start: EventStart,
    day_span: u32,
    color: String,
}

impl Event {
    pub fn from_details(details: EventDetails, tz: Tz) -> CalendarResult<Self> {
        let short_title = details
            .short_title
            .filter(|title| !title.trim().is_empty())
            .ok_or_else(|| CalendarError::validation("must have short_title"))?;

        let raw_date = details
            .date
            .filter(|date| !date.trim().is_empty())
            .ok_or_else(|| CalendarError::validation("must have date"))?;

        let day_span = details.days_span.unwrap_or(1);
        if day_span == 0 {
            return Err(CalendarError::validation(format!(
                "days_span must be at least 1 for {short_title:?}"
            )));
        }

        let start = EventStart::parse(&raw_date, tz)?;

        Ok(Self {
            short_title,
            hover_title: details.hover_title.unwrap_or_default(),
            link: details.link.unwrap_or_default(),
            raw_date,
            start,
            day_span,
            color: normalize_color(details.color.as_deref().unwrap_or_default()),
        })
    }

    pub fn short_title(&self) -> &str {
        &self.short_title
    }

    pub fn hover_title(&self) -> &str {
        &self.hover_title
    }

    pub fn link(&self) -> &str {
        &self.link
    }

    pub fn raw_date(&self) -> &str {
        &self.raw_date
    }

    pub fn start(&self) -> EventStart {
        self.start
    }

    pub fn day_span(&self) -> u32 {
        self.day_span
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start.covers(self.day_span, date)
    }
}

/// Turns a color tag into something that can be appended to a class list:
/// `""` stays empty, `"red"` becomes `" red"`, and inner whitespace is
/// joined with dashes so the tag stays one class.
pub fn normalize_color(raw: &str) -> String {
    let token = raw.split_whitespace().collect::<Vec<_>>().join("-");
    if token.is_empty() {
        token
    } else {
        format!(" {token}")
    }
}
