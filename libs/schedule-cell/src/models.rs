// libs/schedule-cell/src/models.rs
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_database::DatabaseError;

/// Width of every bookable slot.
pub const SLOT_MINUTES: u32 = 30;

/// Window used when a professional has no active hours for the weekday: 08:00 up to the 17:30 slot.
pub const DEFAULT_GRID_START: (u32, u32) = (8, 0);
pub const DEFAULT_GRID_END: (u32, u32) = (18, 0);

// ==============================================================================
// PROFESSIONALS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ProfessionalType {
    #[serde(alias = "psicologo")]
    Psychologist,
    #[serde(alias = "psiquiatra")]
    Psychiatrist,
}

impl FromStr for ProfessionalType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "psychologist" | "psicologo" | "psicólogo" => Ok(ProfessionalType::Psychologist),
            "psychiatrist" | "psiquiatra" => Ok(ProfessionalType::Psychiatrist),
            other => Err(format!("unknown professional type '{}'", other)),
        }
    }
}

impl fmt::Display for ProfessionalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfessionalType::Psychologist => write!(f, "psychologist"),
            ProfessionalType::Psychiatrist => write!(f, "psychiatrist"),
        }
    }
}

/// Identifies the calendar a booking targets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ProfessionalRef {
    pub id: Uuid,
    pub professional_type: ProfessionalType,
}

impl ProfessionalRef {
    pub fn new(id: Uuid, professional_type: ProfessionalType) -> Self {
        Self { id, professional_type }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Professional {
    pub id: Uuid,
    pub professional_type: ProfessionalType,
    pub display_name: String,
    pub consultation_fee_cents: i64,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl Professional {
    pub fn reference(&self) -> ProfessionalRef {
        ProfessionalRef::new(self.id, self.professional_type)
    }
}

fn default_true() -> bool {
    true
}

// ==============================================================================
// WORKING HOURS
// ==============================================================================

/// One weekday of a professional's week. Weekday 0 is Monday.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkingHours {
    pub professional_id: Uuid,
    pub weekday: u8,
    #[serde(with = "clock_time")]
    pub start_time: NaiveTime,
    #[serde(with = "clock_time")]
    pub end_time: NaiveTime,
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingHoursEntry {
    #[serde(alias = "dia_semana")]
    pub weekday: u8,
    #[serde(with = "clock_time", alias = "horario_inicio")]
    pub start_time: NaiveTime,
    #[serde(with = "clock_time", alias = "horario_fim")]
    pub end_time: NaiveTime,
    #[serde(default = "default_true", alias = "ativo")]
    pub active: bool,
}

impl From<&WorkingHours> for WorkingHoursEntry {
    fn from(hours: &WorkingHours) -> Self {
        Self {
            weekday: hours.weekday,
            start_time: hours.start_time,
            end_time: hours.end_time,
            active: hours.active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaceWorkingHoursRequest {
    /// Admins may edit another professional's week; professionals always edit their own.
    pub professional_id: Option<Uuid>,
    #[serde(alias = "horarios")]
    pub entries: Vec<WorkingHoursEntry>,
}

// ==============================================================================
// SLOTS
// ==============================================================================

/// A 30-minute candidate appointment start. Derived on every query, never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Slot {
    /// Clinic-local time of day, `HH:MM`.
    pub time: String,
    pub starts_at: DateTime<Utc>,
    pub available: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SlotSource {
    WorkingHours,
    DefaultGrid,
    UnknownProfessional,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaySchedule {
    pub professional: ProfessionalRef,
    pub date: NaiveDate,
    pub source: SlotSource,
    pub slots: Vec<Slot>,
    /// Set when an upstream read failed and a fallback was used.
    pub degraded: bool,
}

pub fn slot_label(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// 0 = Monday … 6 = Sunday.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_monday() as u8
}

pub fn is_on_grid(time: NaiveTime) -> bool {
    time.second() == 0 && time.nanosecond() == 0 && time.minute() % SLOT_MINUTES == 0
}

// ==============================================================================
// CLINIC TIME
// ==============================================================================

/// Fixed offset that defines the clinic's calendar date and time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClinicTimezone {
    offset: FixedOffset,
}

impl ClinicTimezone {
    pub fn from_offset_minutes(minutes: i32) -> Self {
        let offset = FixedOffset::east_opt(minutes.saturating_mul(60)).unwrap_or_else(|| {
            tracing::warn!("Clinic UTC offset of {} minutes is out of range, using UTC", minutes);
            Utc.fix()
        });
        Self { offset }
    }

    pub fn utc() -> Self {
        Self { offset: Utc.fix() }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// UTC instant of a clinic-local date and time. `None` outside chrono's range.
    pub fn at(&self, date: NaiveDate, time: NaiveTime) -> Option<DateTime<Utc>> {
        let local = date.and_time(time);
        let utc = local.checked_sub_signed(Duration::seconds(self.offset.local_minus_utc() as i64))?;
        Some(Utc.from_utc_datetime(&utc))
    }

    /// Half-open UTC range `[start, end)` covering one clinic-local date.
    pub fn day_bounds(&self, date: NaiveDate) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let start = self.at(date, NaiveTime::MIN)?;
        let end = start.checked_add_signed(Duration::days(1))?;
        Some((start, end))
    }

    /// Rejects dates whose clinic day cannot be expressed as UTC instants.
    pub fn check_date(&self, date: NaiveDate) -> Result<NaiveDate, ScheduleError> {
        self.day_bounds(date)
            .map(|_| date)
            .ok_or_else(|| ScheduleError::Validation(format!("Date {} is out of range", date)))
    }

    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    pub fn local_time(&self, instant: DateTime<Utc>) -> NaiveTime {
        instant.with_timezone(&self.offset).time()
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Upstream unavailable: {0}")]
    Upstream(String),
}

impl From<DatabaseError> for ScheduleError {
    fn from(e: DatabaseError) -> Self {
        ScheduleError::Upstream(e.to_string())
    }
}

/// `HH:MM` on the way out; accepts `HH:MM` or `HH:MM:SS` on the way in.
pub mod clock_time {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub fn parse(raw: &str) -> Result<NaiveTime, String> {
        let raw = raw.trim();
        NaiveTime::parse_from_str(raw, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
            .map_err(|_| format!("invalid time of day '{}', expected HH:MM", raw))
    }
}
