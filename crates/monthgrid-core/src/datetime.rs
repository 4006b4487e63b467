use chrono::{
  DateTime,
  Datelike,
  Duration,
  Months,
  NaiveDate,
  NaiveDateTime,
  NaiveTime,
  Timelike,
  Utc
};
use chrono_tz::Tz;
use regex::Regex;

use crate::error::{
  CalendarError,
  CalendarResult
};

pub const DEFAULT_TIMEZONE: &str =
  "America/New_York";

const DATETIME_FORMATS: [&str; 4] = [
  "%Y-%m-%d %H:%M:%S",
  "%Y-%m-%d %H:%M",
  "%Y-%m-%dT%H:%M:%S",
  "%Y-%m-%dT%H:%M"
];

pub const WEEKDAY_NAMES: [&str; 7] = [
  "Sun", "Mon", "Tue", "Wed", "Thu",
  "Fri", "Sat"
];

pub fn parse_timezone(
  raw: Option<&str>
) -> CalendarResult<Tz> {
  let trimmed =
    raw.map(str::trim).unwrap_or("");
  if trimmed.is_empty() {
    tracing::debug!(
      timezone = DEFAULT_TIMEZONE,
      "no timezone configured; using default"
    );
    return DEFAULT_TIMEZONE
      .parse::<Tz>()
      .map_err(|err| {
        CalendarError::config(format!(
          "default timezone \
           {DEFAULT_TIMEZONE} is \
           invalid: {err}"
        ))
      });
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::debug!(
        timezone = %trimmed,
        "configured calendar timezone"
      );
      Ok(tz)
    }
    | Err(err) => {
      tracing::error!(
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      Err(CalendarError::config(
        format!(
          "unknown timezone: {trimmed}"
        )
      ))
    }
  }
}

#[tracing::instrument(skip(now), fields(input = input))]
pub fn parse_active_date(
  input: &str,
  tz: Tz,
  now: DateTime<Utc>
) -> CalendarResult<NaiveDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();
  let today =
    now.with_timezone(&tz).date_naive();

  match lower.as_str() {
    | "" | "now" | "today" => {
      return Ok(today);
    }
    | "tomorrow" => {
      return shift_days(today, 1);
    }
    | "yesterday" => {
      return shift_days(today, -1);
    }
    | _ => {}
  }

  let rel_re = Regex::new(
    r"^(?P<sign>[+-])(?P<num>\d+)\s*(?P<unit>days?|d|weeks?|w|months?|m)$"
  )
  .map_err(|e| {
    CalendarError::config(format!(
      "internal regex compile \
       failure: {e}"
    ))
  })?;

  if let Some(caps) =
    rel_re.captures(&lower)
  {
    let negative = caps
      .name("sign")
      .is_some_and(|m| m.as_str() == "-");
    let num: u32 = caps
      .name("num")
      .map(|m| m.as_str())
      .unwrap_or_default()
      .parse()
      .map_err(|_| {
        CalendarError::config(format!(
          "relative amount out of \
           range: {input}"
        ))
      })?;
    let unit = caps
      .name("unit")
      .map(|m| m.as_str())
      .unwrap_or_default();

    return match unit.chars().next() {
      | Some('d') => {
        let days = i64::from(num);
        shift_days(
          today,
          if negative { -days } else { days }
        )
      }
      | Some('w') => {
        let days = i64::from(num) * 7;
        shift_days(
          today,
          if negative { -days } else { days }
        )
      }
      | _ => {
        let months = Months::new(num);
        let shifted = if negative {
          today.checked_sub_months(months)
        } else {
          today.checked_add_months(months)
        };
        shifted.ok_or_else(|| {
          CalendarError::config(format!(
            "active date out of range: \
             {input}"
          ))
        })
      }
    };
  }

  if let Ok(dt) =
    DateTime::parse_from_rfc3339(token)
  {
    return Ok(
      dt.with_timezone(&tz).date_naive()
    );
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return Ok(date);
  }

  for fmt in DATETIME_FORMATS {
    if let Ok(ndt) =
      NaiveDateTime::parse_from_str(
        token, fmt
      )
    {
      return Ok(ndt.date());
    }
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      &format!("{token}-01"),
      "%Y-%m-%d"
    )
  {
    return Ok(date);
  }

  Err(CalendarError::config(format!(
    "unrecognized active date: \
     {input} (supported: now, today, \
     tomorrow, yesterday, +Nd/+Nw/+Nm, \
     YYYY-MM, YYYY-MM-DD, YYYY-MM-DD \
     HH:MM, RFC3339)"
  )))
}

fn shift_days(
  date: NaiveDate,
  days: i64
) -> CalendarResult<NaiveDate> {
  date
    .checked_add_signed(Duration::days(
      days
    ))
    .ok_or_else(|| {
      CalendarError::config(format!(
        "active date out of range: \
         {date} {days:+} days"
      ))
    })
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash
)]
pub struct EventStart {
  pub date: NaiveDate,
  pub time: Option<NaiveTime>
}

impl EventStart {
  pub fn parse(
    raw: &str,
    tz: Tz
  ) -> CalendarResult<Self> {
    let token = raw.trim();

    if let Ok(dt) =
      DateTime::parse_from_rfc3339(token)
    {
      let local = dt.with_timezone(&tz);
      return Ok(Self {
        date: local.date_naive(),
        time: Some(local.time())
      });
    }

    if let Ok(date) =
      NaiveDate::parse_from_str(
        token, "%Y-%m-%d"
      )
    {
      return Ok(Self {
        date,
        time: None
      });
    }

    for fmt in DATETIME_FORMATS {
      if let Ok(ndt) =
        NaiveDateTime::parse_from_str(
          token, fmt
        )
      {
        return Ok(Self {
          date: ndt.date(),
          time: Some(ndt.time())
        });
      }
    }

    Err(CalendarError::validation(
      format!(
        "unrecognized event date: {raw}"
      )
    ))
  }

  #[must_use]
  pub fn sort_key(&self) -> NaiveDateTime {
    self.date.and_time(
      self.time.unwrap_or(NaiveTime::MIN)
    )
  }

  /// Whether `[date, date + span - 1]` contains `day`.
  #[must_use]
  pub fn covers(
    &self,
    span: u32,
    day: NaiveDate
  ) -> bool {
    let offset =
      day.signed_duration_since(self.date)
        .num_days();
    offset >= 0
      && offset < i64::from(span)
  }
}

/// Compact clock label: `9a`, `2p`, `9:30a`, `12p`.
#[must_use]
pub fn short_time_label(
  time: NaiveTime
) -> String {
  let (is_pm, hour) = time.hour12();
  let suffix =
    if is_pm { 'p' } else { 'a' };
  if time.minute() == 0 {
    format!("{hour}{suffix}")
  } else {
    format!(
      "{hour}:{:02}{suffix}",
      time.minute()
    )
  }
}

#[must_use]
pub fn first_of_month(
  date: NaiveDate
) -> NaiveDate {
  date
    .with_day(1)
    .unwrap_or(date)
}

#[must_use]
pub fn days_in_month(
  year: i32,
  month: u32
) -> u32 {
  match month {
    | 4 | 6 | 9 | 11 => 30,
    | 2 => {
      if NaiveDate::from_ymd_opt(
        year, 2, 29
      )
      .is_some()
      {
        29
      } else {
        28
      }
    }
    | _ => 31
  }
}

#[must_use]
pub fn first_weekday_of_month(
  date: NaiveDate
) -> u32 {
  first_of_month(date)
    .weekday()
    .num_days_from_sunday()
}
