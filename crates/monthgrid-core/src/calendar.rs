use std::fmt;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use maud::Markup;

use crate::config::{CalendarConfig, CalendarOptions};
use crate::error::CalendarResult;
use crate::event::{Event, EventDetails};
use crate::grid::{Grid, GridRenderer};
use crate::store::EventStore;

#[derive(Debug, Clone)]
pub struct Calendar {
    config: CalendarConfig,
    events: EventStore,
}

impl Calendar {
    pub fn new(opts: &CalendarOptions) -> CalendarResult<Self> {
        Self::with_clock(opts, Utc::now())
    }

    pub fn with_clock(opts: &CalendarOptions, now: DateTime<Utc>) -> CalendarResult<Self> {
        let config = CalendarConfig::from_options_at(opts, now)?;
        let events = EventStore::new(config.timezone());
        Ok(Self { config, events })
    }

    pub fn config(&self) -> &CalendarConfig {
        &self.config
    }

    pub fn events(&self) -> &EventStore {
        &self.events
    }

    pub fn set_show_time_in_short_title(&mut self, on: bool) {
        self.config.set_show_time_in_short_title(on);
    }

    pub fn set_show_nonactive_month_name(&mut self, on: bool) {
        self.config.set_show_nonactive_month_name(on);
    }

    pub fn set_show_active_month_name_on_first(&mut self, on: bool) {
        self.config.set_show_active_month_name_on_first(on);
    }

    pub fn set_hide_previous_month(&mut self, on: bool) {
        self.config.set_hide_previous_month(on);
    }

    pub fn set_hide_next_month(&mut self, on: bool) {
        self.config.set_hide_next_month(on);
    }

    pub fn set_num_weeks_visible(&mut self, weeks: u32) -> CalendarResult<()> {
        self.config.set_num_weeks_visible(weeks)
    }

    pub fn add_event_details(&mut self, details: EventDetails) -> CalendarResult<&Event> {
        self.events.add_details(details)
    }

    pub fn add_event(
        &mut self,
        text: &str,
        date: &str,
        days: u32,
        color: &str,
    ) -> CalendarResult<&Event> {
        self.events.add(text, date, days, color)
    }

    pub fn add_event_full(
        &mut self,
        short_title: &str,
        link: &str,
        hover_title: &str,
        date: &str,
        days: u32,
        color: &str,
    ) -> CalendarResult<&Event> {
        self.events
            .add_full(short_title, link, hover_title, date, days, color)
    }

    pub fn load_events(&mut self, path: &Path) -> anyhow::Result<usize> {
        self.events.extend_from_jsonl(path)
    }

    pub fn sort(&mut self) {
        self.events.sort();
    }

    pub fn events_on(&self, date: NaiveDate) -> impl Iterator<Item = &Event> + '_ {
        self.events.events_on(date)
    }

    pub fn grid(&self) -> Grid {
        self.renderer().build()
    }

    pub fn render(&self) -> Markup {
        self.renderer().render()
    }

    fn renderer(&self) -> GridRenderer<'_> {
        GridRenderer::new(&self.config, &self.events)
    }
}

impl fmt::Display for Calendar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render().into_string())
    }
}
