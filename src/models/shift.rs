use crate::error::{AppError, Result};
use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Minutes in one day, the length of the shift ring
pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// Minutes since midnight, always in `[0, 1440)`.
///
/// 3:30 am is stored as 210 (3 * 60 + 30).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay(0);

    /// Create from a minute count, rejecting values outside the day
    pub fn new(minutes: u16) -> Result<Self> {
        if minutes >= MINUTES_PER_DAY {
            return Err(AppError::Validation(format!(
                "time of day must be below {} minutes, got {}",
                MINUTES_PER_DAY, minutes
            )));
        }
        Ok(Self(minutes))
    }

    /// Create from any signed minute count, wrapping it onto the day ring
    pub fn wrapping(minutes: i64) -> Self {
        Self(minutes.rem_euclid(MINUTES_PER_DAY as i64) as u16)
    }

    pub fn from_hm(hours: u16, minutes: u16) -> Result<Self> {
        if hours >= 24 || minutes >= 60 {
            return Err(AppError::Validation(format!(
                "invalid time of day {:02}:{:02}",
                hours, minutes
            )));
        }
        Ok(Self(hours * 60 + minutes))
    }

    /// Parse the end bound of a shift, where `24:00` is accepted as midnight
    pub fn parse_end(s: &str) -> Result<Self> {
        if s.trim() == "24:00" {
            return Ok(Self::MIDNIGHT);
        }
        s.parse()
    }

    /// UTC minute-of-day projection of an instant
    pub fn of_instant(instant: &DateTime<Utc>) -> Self {
        Self((instant.hour() * 60 + instant.minute()) as u16)
    }

    pub fn minutes(self) -> u16 {
        self.0
    }

    pub fn hours_part(self) -> u16 {
        self.0 / 60
    }

    pub fn minutes_part(self) -> u16 {
        self.0 % 60
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hours_part(), self.minutes_part())
    }
}

/// Parses the `HH:MM` notation used in the shift definitions (`00:00` to `23:59`)
impl FromStr for TimeOfDay {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || AppError::Configuration(format!("invalid shift time {:?}, expected HH:MM", s));

        let (hours, minutes) = s.trim().split_once(':').ok_or_else(invalid)?;
        if hours.len() != 2 || minutes.len() != 2 {
            return Err(invalid());
        }
        let hours: u16 = hours.parse().map_err(|_| invalid())?;
        let minutes: u16 = minutes.parse().map_err(|_| invalid())?;

        Self::from_hm(hours, minutes).map_err(|_| invalid())
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A named, daily repeating coverage window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shift {
    pub name: String,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl Shift {
    pub fn new(name: impl Into<String>, start: TimeOfDay, end: TimeOfDay) -> Self {
        Self {
            name: name.into(),
            start,
            end,
        }
    }

    /// Whether the shift runs past midnight
    pub fn wraps_midnight(&self) -> bool {
        self.start > self.end
    }

    /// Last word of the name, accepted as a short alias ("EU" for "Shift EU")
    pub fn alias(&self) -> &str {
        self.name.rsplit(' ').next().unwrap_or(&self.name)
    }
}

/// Shift as written in the configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftDefinition {
    pub name: String,
    pub start: String,
    pub end: String,
}

impl ShiftDefinition {
    pub fn to_shift(&self) -> Result<Shift> {
        Ok(Shift {
            name: self.name.clone(),
            start: self.start.parse()?,
            end: TimeOfDay::parse_end(&self.end)?,
        })
    }
}

impl From<&Shift> for ShiftDefinition {
    fn from(shift: &Shift) -> Self {
        Self {
            name: shift.name.clone(),
            start: shift.start.to_string(),
            end: shift.end.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_time_of_day() {
        assert_eq!("03:30".parse::<TimeOfDay>().unwrap().minutes(), 210);
        assert_eq!("00:00".parse::<TimeOfDay>().unwrap(), TimeOfDay::MIDNIGHT);
        assert_eq!("23:59".parse::<TimeOfDay>().unwrap().minutes(), 1439);
    }

    #[test]
    fn test_parse_rejects_out_of_range_and_garbage() {
        assert!("24:00".parse::<TimeOfDay>().is_err());
        assert!("12:60".parse::<TimeOfDay>().is_err());
        assert!("7:00".parse::<TimeOfDay>().is_err());
        assert!("noon".parse::<TimeOfDay>().is_err());
    }

    #[test]
    fn test_end_bound_accepts_24_00() {
        assert_eq!(TimeOfDay::parse_end("24:00").unwrap(), TimeOfDay::MIDNIGHT);
        assert_eq!(TimeOfDay::parse_end("16:00").unwrap().minutes(), 960);
        assert!(TimeOfDay::parse_end("24:01").is_err());

        let def = ShiftDefinition {
            name: "US".to_string(),
            start: "16:00".to_string(),
            end: "24:00".to_string(),
        };
        let shift = def.to_shift().unwrap();
        assert_eq!(shift.end, TimeOfDay::MIDNIGHT);
        assert!(shift.wraps_midnight());

        let def = ShiftDefinition {
            start: "24:00".to_string(),
            ..def
        };
        assert!(def.to_shift().is_err());
    }

    #[test]
    fn test_display_round_trips() {
        let t = TimeOfDay::from_hm(6, 5).unwrap();
        assert_eq!(t.to_string(), "06:05");
        assert_eq!(t.to_string().parse::<TimeOfDay>().unwrap(), t);
    }

    #[test]
    fn test_wrapping() {
        assert_eq!(TimeOfDay::wrapping(1440).minutes(), 0);
        assert_eq!(TimeOfDay::wrapping(-60).minutes(), 1380);
        assert_eq!(TimeOfDay::wrapping(2160 - 120).minutes(), 600);
    }

    #[test]
    fn test_of_instant_uses_utc_minutes() {
        let instant = Utc.with_ymd_and_hms(2024, 3, 1, 8, 20, 59).unwrap();
        assert_eq!(TimeOfDay::of_instant(&instant).minutes(), 500);
    }

    #[test]
    fn test_shift_alias() {
        let shift = Shift::new("Shift EU", TimeOfDay::MIDNIGHT, TimeOfDay::MIDNIGHT);
        assert_eq!(shift.alias(), "EU");
        let shift = Shift::new("APAC", TimeOfDay::MIDNIGHT, TimeOfDay::MIDNIGHT);
        assert_eq!(shift.alias(), "APAC");
    }

    #[test]
    fn test_definition_conversion() {
        let def = ShiftDefinition {
            name: "US".to_string(),
            start: "16:00".to_string(),
            end: "00:00".to_string(),
        };
        let shift = def.to_shift().unwrap();
        assert_eq!(shift.start.minutes(), 960);
        assert!(shift.wraps_midnight());
        assert_eq!(ShiftDefinition::from(&shift), def);
    }
}
