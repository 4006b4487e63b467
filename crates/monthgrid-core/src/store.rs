use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;
use chrono_tz::Tz;
use tracing::{debug, info};

use crate::error::CalendarResult;
use crate::event::{Event, EventDetails};

#[derive(Debug, Clone)]
pub struct EventStore {
    timezone: Tz,
    events: Vec<Event>,
}

impl EventStore {
    pub fn new(timezone: Tz) -> Self {
        Self {
            timezone,
            events: Vec::new(),
        }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    #[tracing::instrument(skip(self, details), fields(title = ?details.short_title, date = ?details.date))]
    pub fn add_details(&mut self, details: EventDetails) -> CalendarResult<&Event> {
        let event = Event::from_details(details, self.timezone)?;
        debug!(
            span = event.day_span(),
            color = %event.color().trim(),
            "registered event"
        );
        self.events.push(event);
        Ok(&self.events[self.events.len() - 1])
    }

    pub fn add(
        &mut self,
        short_title: &str,
        date: &str,
        days_span: u32,
        color: &str,
    ) -> CalendarResult<&Event> {
        self.add_details(
            EventDetails::new(short_title, date)
                .days_span(days_span)
                .color(color),
        )
    }

    pub fn add_full(
        &mut self,
        short_title: &str,
        link: &str,
        hover_title: &str,
        date: &str,
        days_span: u32,
        color: &str,
    ) -> CalendarResult<&Event> {
        self.add_details(
            EventDetails::new(short_title, date)
                .link(link)
                .hover_title(hover_title)
                .days_span(days_span)
                .color(color),
        )
    }

    #[tracing::instrument(skip(self), fields(count = self.events.len()))]
    pub fn sort(&mut self) {
        self.events.sort_by_key(|event| event.start().sort_key());
    }

    pub fn events_on(&self, date: NaiveDate) -> impl Iterator<Item = &Event> + '_ {
        self.events.iter().filter(move |event| event.covers(date))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> + '_ {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    #[tracing::instrument(skip(path))]
    pub fn load_jsonl(path: &Path, timezone: Tz) -> anyhow::Result<Self> {
        let mut store = Self::new(timezone);
        store.extend_from_jsonl(path)?;
        Ok(store)
    }

    #[tracing::instrument(skip(self, path))]
    pub fn extend_from_jsonl(&mut self, path: &Path) -> anyhow::Result<usize> {
        debug!(file = %path.display(), "loading events jsonl");
        let file = fs::File::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        let reader = BufReader::new(file);

        let mut added = 0;
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let details: EventDetails = serde_json::from_str(trimmed)
                .with_context(|| format!("failed parsing {} line {}", path.display(), idx + 1))?;
            self.add_details(details)
                .with_context(|| format!("rejected event at {} line {}", path.display(), idx + 1))?;
            added += 1;
        }

        info!(file = %path.display(), count = added, "loaded events");
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::EventStore;
    use crate::event::EventDetails;

    fn store() -> EventStore {
        EventStore::new(chrono_tz::America::New_York)
    }

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).expect("valid date")
    }

    fn titles_on(store: &EventStore, date: NaiveDate) -> Vec<String> {
        store
            .events_on(date)
            .map(|event| event.short_title().to_string())
            .collect()
    }

    #[test]
    fn multi_day_event_covers_each_day_of_span() {
        let mut store = store();
        store
            .add("Conference", "2024-03-10", 3, "")
            .expect("add event");

        assert!(titles_on(&store, day(3, 9)).is_empty());
        assert_eq!(titles_on(&store, day(3, 10)), vec!["Conference"]);
        assert_eq!(titles_on(&store, day(3, 11)), vec!["Conference"]);
        assert_eq!(titles_on(&store, day(3, 12)), vec!["Conference"]);
        assert!(titles_on(&store, day(3, 13)).is_empty());
    }

    #[test]
    fn rejected_add_leaves_store_untouched() {
        let mut store = store();
        store.add("Kept", "2024-03-01", 1, "").expect("add event");

        let missing_title = EventDetails {
            date: Some("2024-03-02".to_string()),
            ..EventDetails::default()
        };
        assert!(store.add_details(missing_title).is_err());
        let missing_date = EventDetails {
            short_title: Some("Lost".to_string()),
            ..EventDetails::default()
        };
        assert!(store.add_details(missing_date).is_err());
        assert!(store.add("Bad", "2024-03-02", 0, "").is_err());

        assert_eq!(store.len(), 1);
    }

    #[test]
    fn lookups_follow_insertion_order_until_sorted() {
        let mut store = store();
        store.add("Late", "2024-03-05 15:00", 1, "").expect("add");
        store.add("Span", "2024-03-04", 2, "").expect("add");
        store.add("Early", "2024-03-05 08:00", 1, "").expect("add");

        assert_eq!(titles_on(&store, day(3, 5)), vec!["Late", "Span", "Early"]);

        store.sort();
        assert_eq!(titles_on(&store, day(3, 5)), vec!["Span", "Early", "Late"]);
    }

    #[test]
    fn sort_is_stable_for_equal_starts() {
        let mut store = store();
        store.add("B", "2024-03-07", 1, "").expect("add");
        store.add("First", "2024-03-07", 1, "").expect("add");
        store.add("A", "2024-03-01", 1, "").expect("add");
        store.add("Second", "2024-03-07", 1, "").expect("add");

        store.sort();
        let order: Vec<&str> = store.iter().map(|event| event.short_title()).collect();
        assert_eq!(order, vec!["A", "B", "First", "Second"]);

        let starts: Vec<_> = store.iter().map(|event| event.start().sort_key()).collect();
        assert!(starts.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn add_full_keeps_link_and_tooltip() {
        let mut store = store();
        let event = store
            .add_full(
                "Demo",
                "https://example.com/demo",
                "Quarterly demo",
                "2024-03-14 14:00",
                1,
                "blue",
            )
            .expect("add event");
        assert_eq!(event.link(), "https://example.com/demo");
        assert_eq!(event.hover_title(), "Quarterly demo");
        assert_eq!(event.color(), " blue");
    }
}
