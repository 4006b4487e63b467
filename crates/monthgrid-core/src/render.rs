use std::io::Write;

use maud::{Markup, html};
use unicode_width::UnicodeWidthStr;

use crate::datetime::{WEEKDAY_NAMES, short_time_label};
use crate::grid::{EventFragment, Grid, GridCell, MonthLabel, MonthLabelKind};
use crate::store::EventStore;

pub fn render_grid(grid: &Grid) -> Markup {
    html! {
        div.calendar {
            div.header {
                div."month-year" { (grid.label) }
            }
            div.days {
                @for name in WEEKDAY_NAMES {
                    div.day_name { (name) }
                }
                @for cell in &grid.cells {
                    (render_cell(cell))
                }
            }
        }
    }
}

fn render_cell(cell: &GridCell) -> Markup {
    html! {
        div.day_num.ignore[cell.is_overflow()].hidemonth[cell.hidden].last[cell.is_last_leading].selected[cell.is_selected]
            title=(cell.count_title()) {
            @if let Some(label) = &cell.month_label {
                (render_month_label(label))
            }
            @if let Some(day) = cell.day_label() {
                span { (day) }
            }
            @for fragment in &cell.events {
                (render_fragment(fragment))
            }
        }
    }
}

fn render_month_label(label: &MonthLabel) -> Markup {
    match label.kind {
        MonthLabelKind::NonActive => html! { span.nonactivemonth { (label.text) } },
        MonthLabelKind::ActiveFirst => html! { span.activemonthname { (label.text) } },
    }
}

fn render_fragment(fragment: &EventFragment) -> Markup {
    let class = format!("event{}", fragment.color);
    let title = fragment.display_title();
    html! {
        div class=(class) title=[fragment.hover_title.as_deref()] {
            @if let Some(link) = &fragment.link {
                a href=(link) { (title) }
            } @else {
                (title)
            }
        }
    }
}

#[tracing::instrument(skip(writer, store), fields(count = store.len()))]
pub fn write_agenda<W: Write>(writer: W, store: &EventStore) -> anyhow::Result<()> {
    let headers = vec![
        "Date".to_string(),
        "Time".to_string(),
        "Days".to_string(),
        "Title".to_string(),
    ];

    let rows = store
        .iter()
        .map(|event| {
            let start = event.start();
            let time = start.time.map(short_time_label).unwrap_or_default();
            vec![
                start.date.format("%Y-%m-%d").to_string(),
                time,
                event.day_span().to_string(),
                event.short_title().to_string(),
            ]
        })
        .collect();

    write_table(writer, headers, rows)
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(cell.as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let padding = widths[idx].saturating_sub(UnicodeWidthStr::width(cell.as_str()));
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}
