use chrono::{Datelike, Days, NaiveDate};
use maud::Markup;
use tracing::debug;

use crate::config::CalendarConfig;
use crate::datetime::{self, short_time_label};
use crate::event::Event;
use crate::render;
use crate::store::EventStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Leading,
    Current,
    Trailing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthLabelKind {
    NonActive,
    ActiveFirst,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthLabel {
    pub kind: MonthLabelKind,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFragment {
    pub title: String,
    pub time_prefix: Option<String>,
    pub hover_title: Option<String>,
    pub link: Option<String>,
    pub color: String,
}

impl EventFragment {
    fn from_event(event: &Event, config: &CalendarConfig) -> Self {
        let time_prefix = if config.show_time_in_short_title() && event.raw_date().contains(':') {
            event.start().time.map(short_time_label)
        } else {
            None
        };

        Self {
            title: event.short_title().to_string(),
            time_prefix,
            hover_title: non_empty(event.hover_title()),
            link: non_empty(event.link()),
            color: event.color().to_string(),
        }
    }

    pub fn display_title(&self) -> String {
        match &self.time_prefix {
            Some(prefix) => format!("{prefix} {}", self.title),
            None => self.title.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridCell {
    pub date: NaiveDate,
    pub kind: CellKind,
    pub is_selected: bool,
    pub hidden: bool,
    pub is_last_leading: bool,
    pub month_label: Option<MonthLabel>,
    pub events: Vec<EventFragment>,
}

impl GridCell {
    pub fn is_current_month(&self) -> bool {
        self.kind == CellKind::Current
    }

    pub fn is_overflow(&self) -> bool {
        !self.is_current_month()
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn day_label(&self) -> Option<u32> {
        (!self.hidden).then(|| self.date.day())
    }

    pub fn count_title(&self) -> String {
        let count = self.event_count();
        format!("{count} event{}", if count == 1 { "" } else { "s" })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    pub label: String,
    pub first_weekday: u32,
    pub days_in_month: u32,
    pub cells: Vec<GridCell>,
}

impl Grid {
    pub fn cells_of(&self, kind: CellKind) -> impl Iterator<Item = &GridCell> + '_ {
        self.cells.iter().filter(move |cell| cell.kind == kind)
    }

    pub fn selected(&self) -> Option<&GridCell> {
        self.cells.iter().find(|cell| cell.is_selected)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GridRenderer<'a> {
    config: &'a CalendarConfig,
    store: &'a EventStore,
}

impl<'a> GridRenderer<'a> {
    pub fn new(config: &'a CalendarConfig, store: &'a EventStore) -> Self {
        Self { config, store }
    }

    #[tracing::instrument(skip(self), fields(active = %self.config.active_date()))]
    pub fn build(&self) -> Grid {
        let config = self.config;
        let active = config.active_date();
        let first = datetime::first_of_month(active);
        let first_weekday = datetime::first_weekday_of_month(active);
        let days_in_month = datetime::days_in_month(active.year(), active.month());

        let total = 7 * i64::from(config.num_weeks_visible());
        let remaining = total - i64::from(days_in_month) - i64::from(first_weekday);
        let trailing = if config.hide_next_month() {
            0
        } else {
            u64::try_from(remaining).unwrap_or(0)
        };

        let mut cells =
            Vec::with_capacity(first_weekday as usize + days_in_month as usize + trailing as usize);

        for back in (1..=u64::from(first_weekday)).rev() {
            let date = first - Days::new(back);
            let hidden = config.hide_previous_month();
            let month_label = (config.show_nonactive_month_name()
                && !hidden
                && back == u64::from(first_weekday))
            .then(|| MonthLabel {
                kind: MonthLabelKind::NonActive,
                text: date.format("%b").to_string(),
            });

            cells.push(GridCell {
                date,
                kind: CellKind::Leading,
                is_selected: false,
                hidden,
                is_last_leading: back == 1,
                month_label,
                events: if hidden {
                    Vec::new()
                } else {
                    self.fragments_on(date)
                },
            });
        }

        for offset in 0..u64::from(days_in_month) {
            let date = first + Days::new(offset);
            let month_label = (config.show_active_month_name_on_first() && offset == 0).then(|| {
                MonthLabel {
                    kind: MonthLabelKind::ActiveFirst,
                    text: date.format("%b").to_string(),
                }
            });

            cells.push(GridCell {
                date,
                kind: CellKind::Current,
                is_selected: date == active,
                hidden: false,
                is_last_leading: false,
                month_label,
                events: self.fragments_on(date),
            });
        }

        let next_first = first + Days::new(u64::from(days_in_month));
        for offset in 0..trailing {
            let date = next_first + Days::new(offset);
            let month_label = (config.show_nonactive_month_name() && offset == 0).then(|| {
                MonthLabel {
                    kind: MonthLabelKind::NonActive,
                    text: date.format("%b").to_string(),
                }
            });

            cells.push(GridCell {
                date,
                kind: CellKind::Trailing,
                is_selected: false,
                hidden: false,
                is_last_leading: false,
                month_label,
                events: self.fragments_on(date),
            });
        }

        debug!(
            leading = first_weekday,
            current = days_in_month,
            trailing,
            cells = cells.len(),
            "built month grid"
        );

        Grid {
            label: first.format("%B %Y").to_string(),
            first_weekday,
            days_in_month,
            cells,
        }
    }

    pub fn render(&self) -> Markup {
        render::render_grid(&self.build())
    }

    fn fragments_on(&self, date: NaiveDate) -> Vec<EventFragment> {
        self.store
            .events_on(date)
            .map(|event| EventFragment::from_event(event, self.config))
            .collect()
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{CellKind, Grid, GridRenderer, MonthLabelKind};
    use crate::config::{CalendarConfig, CalendarOptions};
    use crate::store::EventStore;

    fn config(active: &str, weeks: u32) -> CalendarConfig {
        CalendarConfig::from_options(&CalendarOptions {
            active_date: Some(active.to_string()),
            num_weeks_visible: weeks,
            ..CalendarOptions::default()
        })
        .expect("valid config")
    }

    fn build(config: &CalendarConfig, store: &EventStore) -> Grid {
        GridRenderer::new(config, store).build()
    }

    fn empty_store(config: &CalendarConfig) -> EventStore {
        EventStore::new(config.timezone())
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn march_2024_five_weeks() {
        let cfg = config("2024-03-15", 5);
        let grid = build(&cfg, &empty_store(&cfg));

        assert_eq!(grid.label, "March 2024");
        assert_eq!(grid.first_weekday, 5);
        assert_eq!(grid.days_in_month, 31);

        let leading: Vec<_> = grid.cells_of(CellKind::Leading).map(|c| c.date).collect();
        assert_eq!(
            leading,
            (25..=29).map(|d| day(2024, 2, d)).collect::<Vec<_>>()
        );
        assert_eq!(grid.cells_of(CellKind::Current).count(), 31);
        assert_eq!(grid.cells_of(CellKind::Trailing).count(), 0);
        assert_eq!(grid.cells.len(), 36);

        let selected = grid.selected().expect("selected cell");
        assert_eq!(selected.date, day(2024, 3, 15));
        assert_eq!(grid.cells.iter().filter(|c| c.is_selected).count(), 1);
    }

    #[test]
    fn total_cells_fill_requested_weeks() {
        for month in 1..=12 {
            for weeks in 1..=7 {
                let cfg = config(&format!("2024-{month:02}-01"), weeks);
                let grid = build(&cfg, &empty_store(&cfg));

                let leading = grid.cells_of(CellKind::Leading).count() as u32;
                assert_eq!(leading, grid.first_weekday);

                let needed = grid.first_weekday + grid.days_in_month;
                let expected = needed.max(7 * weeks) as usize;
                assert_eq!(grid.cells.len(), expected, "month {month} weeks {weeks}");
            }
        }
    }

    #[test]
    fn phases_are_contiguous_dates() {
        let cfg = config("2024-02-10", 6);
        let grid = build(&cfg, &empty_store(&cfg));
        assert!(
            grid.cells
                .windows(2)
                .all(|pair| pair[0].date.succ_opt() == Some(pair[1].date))
        );
        let kinds: Vec<_> = grid.cells.iter().map(|c| c.kind).collect();
        let first_current = kinds.iter().position(|k| *k == CellKind::Current);
        assert_eq!(first_current, Some(4));
        assert_eq!(grid.cells.last().map(|c| c.kind), Some(CellKind::Trailing));
    }

    #[test]
    fn month_starting_sunday_has_no_leading_cells() {
        let mut cfg = config("2024-09-05", 5);
        cfg.set_show_nonactive_month_name(true);
        let grid = build(&cfg, &empty_store(&cfg));
        assert_eq!(grid.first_weekday, 0);
        assert_eq!(grid.cells_of(CellKind::Leading).count(), 0);
        assert_eq!(grid.cells[0].date, day(2024, 9, 1));
        assert_eq!(grid.cells.len(), 35);
        assert!(grid.cells_of(CellKind::Current).all(|c| c.month_label.is_none()));

        let first_trailing = grid
            .cells_of(CellKind::Trailing)
            .next()
            .expect("october overflow");
        assert_eq!(first_trailing.date, day(2024, 10, 1));
        let label = first_trailing.month_label.as_ref().expect("october label");
        assert_eq!(label.kind, MonthLabelKind::NonActive);
        assert_eq!(label.text, "Oct");
        assert_eq!(
            grid.cells.iter().filter(|c| c.month_label.is_some()).count(),
            1
        );
    }

    #[test]
    fn hidden_previous_month_keeps_slots_but_drops_content() {
        let mut cfg = config("2024-03-15", 5);
        cfg.set_hide_previous_month(true);
        cfg.set_show_nonactive_month_name(true);
        let mut store = empty_store(&cfg);
        store.add("Leap", "2024-02-29", 1, "").expect("add");
        store.add("Span", "2024-02-27", 5, "").expect("add");

        let grid = build(&cfg, &store);
        let leading: Vec<_> = grid.cells_of(CellKind::Leading).collect();
        assert_eq!(leading.len(), 5);
        for cell in &leading {
            assert!(cell.hidden);
            assert_eq!(cell.day_label(), None);
            assert!(cell.events.is_empty());
            assert!(cell.month_label.is_none());
            assert_eq!(cell.count_title(), "0 events");
        }
        assert!(leading[4].is_last_leading);

        let march_first = grid
            .cells_of(CellKind::Current)
            .next()
            .expect("day one");
        assert_eq!(march_first.event_count(), 1);
    }

    #[test]
    fn hidden_next_month_emits_no_trailing_cells() {
        let mut cfg = config("2024-02-10", 6);
        cfg.set_hide_next_month(true);
        let grid = build(&cfg, &empty_store(&cfg));
        assert_eq!(grid.cells_of(CellKind::Trailing).count(), 0);
        assert_eq!(grid.cells.len(), 4 + 29);
    }

    #[test]
    fn overflow_cells_show_events_from_neighbor_months() {
        let cfg = config("2024-02-10", 6);
        let mut store = empty_store(&cfg);
        store.add("New year trip", "2024-01-29", 5, "").expect("add");
        store.add("March kickoff", "2024-03-02", 1, "").expect("add");

        let grid = build(&cfg, &store);
        let titles = |date: NaiveDate| -> Vec<String> {
            grid.cells
                .iter()
                .find(|c| c.date == date)
                .map(|c| c.events.iter().map(|f| f.title.clone()).collect())
                .unwrap_or_default()
        };

        assert_eq!(titles(day(2024, 1, 29)), vec!["New year trip"]);
        assert_eq!(titles(day(2024, 2, 2)), vec!["New year trip"]);
        assert!(titles(day(2024, 2, 3)).is_empty());
        assert_eq!(titles(day(2024, 3, 2)), vec!["March kickoff"]);
    }

    #[test]
    fn time_prefix_follows_flag() {
        let mut cfg = config("2024-03-15", 5);
        let mut store = empty_store(&cfg);
        store
            .add_details(
                crate::event::EventDetails::new("Standup", "2024-03-10 09:00").days_span(1),
            )
            .expect("add");
        store.add("Allday", "2024-03-10", 1, "").expect("add");

        let grid = build(&cfg, &store);
        let cell = grid
            .cells
            .iter()
            .find(|c| c.date == day(2024, 3, 10))
            .expect("cell");
        let shown: Vec<_> = cell.events.iter().map(|f| f.display_title()).collect();
        assert_eq!(shown, vec!["9a Standup", "Allday"]);
        assert_eq!(cell.count_title(), "2 events");

        cfg.set_show_time_in_short_title(false);
        let grid = build(&cfg, &store);
        let cell = grid
            .cells
            .iter()
            .find(|c| c.date == day(2024, 3, 10))
            .expect("cell");
        assert_eq!(cell.events[0].display_title(), "Standup");
    }

    #[test]
    fn month_labels_follow_flags() {
        let mut cfg = config("2024-02-10", 6);
        let grid = build(&cfg, &empty_store(&cfg));
        assert!(grid.cells.iter().all(|c| c.month_label.is_none()));

        cfg.set_show_nonactive_month_name(true);
        cfg.set_show_active_month_name_on_first(true);
        let grid = build(&cfg, &empty_store(&cfg));
        let labelled: Vec<_> = grid
            .cells
            .iter()
            .filter_map(|c| c.month_label.as_ref().map(|l| (c.date, l.kind, l.text.clone())))
            .collect();
        assert_eq!(
            labelled,
            vec![
                (day(2024, 1, 28), MonthLabelKind::NonActive, "Jan".to_string()),
                (day(2024, 2, 1), MonthLabelKind::ActiveFirst, "Feb".to_string()),
                (day(2024, 3, 1), MonthLabelKind::NonActive, "Mar".to_string()),
            ]
        );
    }
}
