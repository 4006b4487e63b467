pub mod calendar;
pub mod cli;
pub mod config;
pub mod datetime;
pub mod error;
pub mod event;
pub mod grid;
pub mod render;
pub mod store;

use std::ffi::OsString;
use std::io::Write;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

pub use calendar::Calendar;
pub use config::{
  CalendarConfig,
  CalendarOptions
};
pub use error::{
  CalendarError,
  CalendarResult
};
pub use event::{
  Event,
  EventDetails
};
pub use grid::{
  Grid,
  GridCell,
  GridRenderer
};
pub use store::EventStore;

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting monthgrid"
  );
  debug!(?pre.overrides, "preprocessed option overrides");

  let mut opts = config::load_options(
    cli.config.as_deref()
  )?;
  opts
    .apply_overrides(
      pre.overrides.into_iter().chain(
        cli
          .overrides
          .into_iter()
          .map(|kv| (kv.key, kv.value))
      )
    )
    .context(
      "failed to apply option \
       overrides"
    )?;
  if let Some(date) = cli.date {
    opts.active_date = Some(date);
  }
  if let Some(weeks) = cli.weeks {
    opts.num_weeks_visible = weeks;
  }

  let mut calendar =
    Calendar::new(&opts).context(
      "invalid calendar options"
    )?;

  for path in &cli.events {
    calendar
      .load_events(path)
      .with_context(|| {
        format!(
          "failed to load events from \
           {}",
          path.display()
        )
      })?;
  }

  let mut out = Vec::new();
  if cli.agenda {
    calendar.sort();
    render::write_agenda(
      &mut out,
      calendar.events()
    )?;
  } else {
    writeln!(out, "{calendar}")?;
  }

  cli::write_output(
    cli.output.as_deref(),
    &out
  )?;

  info!(
    events = calendar.events().len(),
    "done"
  );
  Ok(())
}
