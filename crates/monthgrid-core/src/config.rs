use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Datelike,
  Days,
  NaiveDate,
  Utc
};
use chrono_tz::Tz;
use serde::{
  Deserialize,
  Serialize
};
use tracing::{
  debug,
  info,
  warn
};

use crate::datetime;
use crate::error::{
  CalendarError,
  CalendarResult
};

const CONFIG_ENV_VAR: &str =
  "MONTHGRID_CONFIG";
const CONFIG_DIR_NAME: &str =
  "monthgrid";
const CONFIG_FILE_NAME: &str =
  "config.toml";
pub const DEFAULT_NUM_WEEKS_VISIBLE:
  u32 = 5;

#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Serialize,
  Deserialize
)]
#[serde(default, deny_unknown_fields)]
pub struct CalendarOptions {
  pub timezone: Option<String>,
  pub active_date: Option<String>,
  pub show_time_in_short_title: bool,
  pub show_nonactive_month_name: bool,
  pub show_active_month_name_on_first:
    bool,
  pub num_weeks_visible: u32,
  pub hide_previous_month: bool,
  pub hide_next_month: bool
}

impl Default for CalendarOptions {
  fn default() -> Self {
    Self {
      timezone: None,
      active_date: None,
      show_time_in_short_title: true,
      show_nonactive_month_name: false,
      show_active_month_name_on_first:
        false,
      num_weeks_visible:
        DEFAULT_NUM_WEEKS_VISIBLE,
      hide_previous_month: false,
      hide_next_month: false
    }
  }
}

impl CalendarOptions {
  pub fn apply_override(
    &mut self,
    key: &str,
    value: &str
  ) -> CalendarResult<()> {
    let key = key.trim();
    let key = key
      .strip_prefix("opt.")
      .unwrap_or(key);
    let value = value.trim();
    debug!(key = %key, value = %value, "applying override");

    match key {
      | "timezone" => {
        self.timezone =
          Some(value.to_string());
      }
      | "active_date" => {
        self.active_date =
          Some(value.to_string());
      }
      | "show_time_in_short_title" => {
        self.show_time_in_short_title =
          parse_bool(key, value)?;
      }
      | "show_nonactive_month_name" => {
        self.show_nonactive_month_name =
          parse_bool(key, value)?;
      }
      | "show_active_month_name_on_first" => {
        self
          .show_active_month_name_on_first =
          parse_bool(key, value)?;
      }
      | "hide_previous_month" => {
        self.hide_previous_month =
          parse_bool(key, value)?;
      }
      | "hide_next_month" => {
        self.hide_next_month =
          parse_bool(key, value)?;
      }
      | "num_weeks_visible" => {
        let weeks = value
          .parse::<u32>()
          .map_err(|_| {
            CalendarError::config(format!(
              "{value} is an invalid \
               amount of weeks"
            ))
          })?;
        self.num_weeks_visible =
          validate_num_weeks(weeks)?;
      }
      | other => {
        return Err(CalendarError::config(
          format!(
            "unknown option: {other}"
          )
        ));
      }
    }

    Ok(())
  }

  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) -> CalendarResult<()>
  where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      self.apply_override(&k, &v)?;
    }
    Ok(())
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarConfig {
  timezone: Tz,
  active_date: NaiveDate,
  show_time_in_short_title: bool,
  show_nonactive_month_name: bool,
  show_active_month_name_on_first:
    bool,
  num_weeks_visible: u32,
  hide_previous_month: bool,
  hide_next_month: bool
}

impl CalendarConfig {
  pub fn from_options(
    opts: &CalendarOptions
  ) -> CalendarResult<Self> {
    Self::from_options_at(
      opts,
      Utc::now()
    )
  }

  #[tracing::instrument(skip(opts, now))]
  pub fn from_options_at(
    opts: &CalendarOptions,
    now: DateTime<Utc>
  ) -> CalendarResult<Self> {
    let num_weeks_visible =
      validate_num_weeks(
        opts.num_weeks_visible
      )?;
    let timezone =
      datetime::parse_timezone(
        opts.timezone.as_deref()
      )?;
    let active_date =
      datetime::parse_active_date(
        opts
          .active_date
          .as_deref()
          .unwrap_or("now"),
        timezone,
        now
      )?;
    validate_grid_range(
      active_date,
      num_weeks_visible
    )?;

    info!(
      timezone = %timezone,
      active_date = %active_date,
      weeks = num_weeks_visible,
      "built calendar config"
    );

    Ok(Self {
      timezone,
      active_date,
      show_time_in_short_title: opts
        .show_time_in_short_title,
      show_nonactive_month_name: opts
        .show_nonactive_month_name,
      show_active_month_name_on_first:
        opts
          .show_active_month_name_on_first,
      num_weeks_visible,
      hide_previous_month: opts
        .hide_previous_month,
      hide_next_month: opts
        .hide_next_month
    })
  }

  pub fn timezone(&self) -> Tz {
    self.timezone
  }

  pub fn active_date(
    &self
  ) -> NaiveDate {
    self.active_date
  }

  pub fn active_year(&self) -> i32 {
    self.active_date.year()
  }

  pub fn active_month(&self) -> u32 {
    self.active_date.month()
  }

  pub fn active_day(&self) -> u32 {
    self.active_date.day()
  }

  pub fn show_time_in_short_title(
    &self
  ) -> bool {
    self.show_time_in_short_title
  }

  pub fn show_nonactive_month_name(
    &self
  ) -> bool {
    self.show_nonactive_month_name
  }

  pub fn show_active_month_name_on_first(
    &self
  ) -> bool {
    self.show_active_month_name_on_first
  }

  pub fn num_weeks_visible(
    &self
  ) -> u32 {
    self.num_weeks_visible
  }

  pub fn hide_previous_month(
    &self
  ) -> bool {
    self.hide_previous_month
  }

  pub fn hide_next_month(
    &self
  ) -> bool {
    self.hide_next_month
  }

  pub fn set_show_time_in_short_title(
    &mut self,
    on: bool
  ) {
    self.show_time_in_short_title = on;
  }

  pub fn set_show_nonactive_month_name(
    &mut self,
    on: bool
  ) {
    self.show_nonactive_month_name = on;
  }

  pub fn set_show_active_month_name_on_first(
    &mut self,
    on: bool
  ) {
    self
      .show_active_month_name_on_first =
      on;
  }

  pub fn set_hide_previous_month(
    &mut self,
    on: bool
  ) {
    self.hide_previous_month = on;
  }

  pub fn set_hide_next_month(
    &mut self,
    on: bool
  ) {
    self.hide_next_month = on;
  }

  pub fn set_num_weeks_visible(
    &mut self,
    weeks: u32
  ) -> CalendarResult<()> {
    let weeks = validate_num_weeks(weeks)?;
    validate_grid_range(
      self.active_date,
      weeks
    )?;
    self.num_weeks_visible = weeks;
    Ok(())
  }
}

pub fn validate_num_weeks(
  weeks: u32
) -> CalendarResult<u32> {
  if weeks < 1 {
    return Err(CalendarError::config(
      format!(
        "invalid number of visible \
         weeks: must be greater than 0, \
         got {weeks}"
      )
    ));
  }
  Ok(weeks)
}

// Every cell date, from the first leading day to the last trailing day,
// has to exist in the chrono calendar.
pub fn validate_grid_range(
  active_date: NaiveDate,
  weeks: u32
) -> CalendarResult<()> {
  let first =
    datetime::first_of_month(active_date);
  let leading =
    datetime::first_weekday_of_month(
      active_date
    );
  let days = datetime::days_in_month(
    active_date.year(),
    active_date.month()
  );
  let cells = (u64::from(leading)
    + u64::from(days))
  .max(7 * u64::from(weeks));

  let last = first
    .checked_sub_days(Days::new(
      u64::from(leading)
    ))
    .and_then(|start| {
      start.checked_add_days(Days::new(
        cells - 1
      ))
    });
  if last.is_none() {
    return Err(CalendarError::config(
      format!(
        "active date {active_date} with \
         {weeks} visible weeks falls \
         outside the supported date \
         range"
      )
    ));
  }
  Ok(())
}

#[tracing::instrument(skip(
  override_path
))]
pub fn load_options(
  override_path: Option<&Path>
) -> anyhow::Result<CalendarOptions> {
  let Some(path) =
    resolve_config_path(override_path)?
  else {
    warn!(
      "no config file found; using \
       defaults"
    );
    return Ok(CalendarOptions::default());
  };

  info!(config = %path.display(), "loading config");
  let text = fs::read_to_string(&path)
    .with_context(|| {
      format!(
        "failed to read {}",
        path.display()
      )
    })?;

  toml::from_str::<CalendarOptions>(
    &text
  )
  .with_context(|| {
    format!(
      "failed to parse {}",
      path.display()
    )
  })
}

fn resolve_config_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    let path = expand_tilde(path);
    if !path.exists() {
      return Err(anyhow!(
        "config file does not exist: \
         {}",
        path.display()
      ));
    }
    return Ok(Some(path));
  }

  if let Ok(raw) =
    std::env::var(CONFIG_ENV_VAR)
  {
    let trimmed = raw.trim();
    if trimmed == "/dev/null" {
      return Ok(None);
    }
    if !trimmed.is_empty() {
      return Ok(Some(expand_tilde(
        Path::new(trimmed)
      )));
    }
  }

  let Some(config_dir) =
    dirs::config_dir()
  else {
    debug!(
      "cannot determine config \
       directory"
    );
    return Ok(None);
  };
  let candidate = config_dir
    .join(CONFIG_DIR_NAME)
    .join(CONFIG_FILE_NAME);
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn parse_bool(
  key: &str,
  value: &str
) -> CalendarResult<bool> {
  match value
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "1" | "y" | "yes" | "on"
    | "true" => Ok(true),
    | "0" | "n" | "no" | "off"
    | "false" => Ok(false),
    | other => {
      Err(CalendarError::config(
        format!(
          "invalid boolean for {key}: \
           {other}"
        )
      ))
    }
  }
}
