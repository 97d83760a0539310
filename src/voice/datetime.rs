//! Date and time extraction from free speech.
//!
//! Both extractors walk an ordered rule list and keep the first rule that
//! resolves. More specific phrases ("day after tomorrow", "next friday") sit
//! ahead of the generic ones ("friday") so they win, and every high-confidence
//! date rule is tried before any medium one. A rule whose captured numbers are
//! out of range does not count as a match and the walk continues.

use super::{collapse_whitespace, remove_phrase, Confidence};
use chrono::{Datelike, Days, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::debug;

const WEEKDAYS: &str = "monday|tuesday|wednesday|thursday|friday|saturday|sunday";
const MONTHS: &str = "january|february|march|april|may|june|july|august|september|october|november|december|sept|jan|feb|mar|apr|jun|jul|aug|sep|oct|nov|dec";
const PREFIX: &str = r"(?:(?:on|by|due) )?";

#[derive(Clone, Debug, PartialEq)]
pub struct DateDetectionResult {
    pub detected_date: Option<NaiveDateTime>,
    pub matched_text: Option<String>,
    pub confidence: Confidence,
    pub original_text: String,
    pub cleaned_text: String,
}

impl DateDetectionResult {
    fn unmatched(text: &str) -> Self {
        DateDetectionResult {
            detected_date: None,
            matched_text: None,
            confidence: Confidence::Low,
            original_text: text.to_string(),
            cleaned_text: text.to_string(),
        }
    }
}

/// A validated wall-clock time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeOfDay(NaiveTime);

impl TimeOfDay {
    /// `None` unless `hour` is in 0..=23 and `minute` in 0..=59.
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(TimeOfDay)
    }

    /// `None` unless `hour` is in 1..=12.
    fn twelve_hour(hour: u32, minute: u32, pm: bool) -> Option<Self> {
        if !(1..=12).contains(&hour) {
            return None;
        }
        let hour = match (hour, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, true) => h + 12,
            (h, false) => h,
        };
        Self::new(hour, minute)
    }

    /// A bare hour with no meridiem. 1 to 7 are read as afternoon/evening.
    fn bare_hour(hour: u32) -> Option<Self> {
        if (1..=7).contains(&hour) {
            Self::new(hour + 12, 0)
        } else {
            Self::new(hour, 0)
        }
    }

    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    pub fn minute(&self) -> u32 {
        self.0.minute()
    }

    pub fn as_naive_time(&self) -> NaiveTime {
        self.0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TimeDetectionResult {
    pub time: Option<TimeOfDay>,
    pub matched_text: Option<String>,
    pub confidence: Confidence,
}

#[derive(Clone, Copy, Debug)]
enum DateRule {
    Offset(u64),
    Weekday { next_week: bool },
    InDays,
    InWeeks,
    EndOfWeek,
    Weekend,
    MonthDay,
    DayMonth,
}

struct DatePattern {
    regex: Regex,
    rule: DateRule,
    confidence: Confidence,
}

fn date_pattern(pattern: &str, rule: DateRule, confidence: Confidence) -> DatePattern {
    DatePattern {
        regex: Regex::new(pattern).unwrap(),
        rule,
        confidence,
    }
}

static DATE_PATTERNS: Lazy<Vec<DatePattern>> = Lazy::new(|| {
    use Confidence::{High, Medium};
    vec![
        date_pattern(
            &format!(r"\b{PREFIX}(?:the )?day after tomorrow\b"),
            DateRule::Offset(2),
            High,
        ),
        date_pattern(
            &format!(r"\b{PREFIX}(?:tomorrow|tmrw)\b"),
            DateRule::Offset(1),
            High,
        ),
        date_pattern(
            &format!(r"\b{PREFIX}(?:today|tonight)\b"),
            DateRule::Offset(0),
            High,
        ),
        date_pattern(
            &format!(r"\b{PREFIX}next ({WEEKDAYS})\b"),
            DateRule::Weekday { next_week: true },
            High,
        ),
        date_pattern(
            &format!(r"\b{PREFIX}this ({WEEKDAYS})\b"),
            DateRule::Weekday { next_week: false },
            High,
        ),
        date_pattern(r"\bin (\d{1,3}) days?\b", DateRule::InDays, High),
        date_pattern(r"\bin a week\b", DateRule::Offset(7), High),
        date_pattern(r"\bin (\d{1,2}) weeks?\b", DateRule::InWeeks, High),
        date_pattern(
            &format!(r"\b{PREFIX}next week\b"),
            DateRule::Offset(7),
            Medium,
        ),
        date_pattern(
            &format!(r"\b{PREFIX}(?:the )?end of (?:the |this )?week\b"),
            DateRule::EndOfWeek,
            Medium,
        ),
        date_pattern(
            &format!(r"\b{PREFIX}(?:this |the )?weekend\b"),
            DateRule::Weekend,
            Medium,
        ),
        date_pattern(
            &format!(r"\b{PREFIX}({MONTHS})\.? (\d{{1,2}})(?:st|nd|rd|th)?\b"),
            DateRule::MonthDay,
            High,
        ),
        date_pattern(
            &format!(r"\b{PREFIX}(?:the )?(\d{{1,2}})(?:st|nd|rd|th)? (?:of )?({MONTHS})\b"),
            DateRule::DayMonth,
            High,
        ),
        date_pattern(
            &format!(r"\b{PREFIX}({WEEKDAYS})\b"),
            DateRule::Weekday { next_week: false },
            Medium,
        ),
    ]
});

impl DatePattern {
    fn resolve(&self, caps: &Captures<'_>, today: NaiveDate) -> Option<NaiveDate> {
        match self.rule {
            DateRule::Offset(days) => today.checked_add_days(Days::new(days)),
            DateRule::Weekday { next_week } => {
                let target = parse_weekday(caps.get(1)?.as_str())?;
                upcoming_weekday(today, target, next_week)
            }
            DateRule::InDays => {
                let days: u64 = caps.get(1)?.as_str().parse().ok()?;
                today.checked_add_days(Days::new(days))
            }
            DateRule::InWeeks => {
                let weeks: u64 = caps.get(1)?.as_str().parse().ok()?;
                today.checked_add_days(Days::new(weeks * 7))
            }
            DateRule::EndOfWeek => {
                let friday = Weekday::Fri.num_days_from_monday() as i64;
                let ahead = (friday - today.weekday().num_days_from_monday() as i64).rem_euclid(7);
                today.checked_add_days(Days::new(ahead as u64))
            }
            DateRule::Weekend => upcoming_weekday(today, Weekday::Sat, false),
            DateRule::MonthDay => {
                let month = parse_month(caps.get(1)?.as_str())?;
                let day = caps.get(2)?.as_str().parse().ok()?;
                next_calendar_date(today, month, day)
            }
            DateRule::DayMonth => {
                let day = caps.get(1)?.as_str().parse().ok()?;
                let month = parse_month(caps.get(2)?.as_str())?;
                next_calendar_date(today, month, day)
            }
        }
    }
}

fn parse_weekday(name: &str) -> Option<Weekday> {
    name.parse::<Weekday>().ok()
}

fn parse_month(name: &str) -> Option<u32> {
    let month = match &name[..name.len().min(3)] {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// Next occurrence of `target`, never today. `next_week` pushes one more week out.
fn upcoming_weekday(today: NaiveDate, target: Weekday, next_week: bool) -> Option<NaiveDate> {
    let mut days = target.num_days_from_monday() as i64 - today.weekday().num_days_from_monday() as i64;
    if days <= 0 {
        days += 7;
    }
    if next_week {
        days += 7;
    }
    today.checked_add_days(Days::new(days as u64))
}

/// The given month/day this year, or next year if it has already passed.
fn next_calendar_date(today: NaiveDate, month: u32, day: u32) -> Option<NaiveDate> {
    let date = NaiveDate::from_ymd_opt(today.year(), month, day)?;
    if date < today {
        NaiveDate::from_ymd_opt(today.year() + 1, month, day)
    } else {
        Some(date)
    }
}

/// Deadlines without a time fall due at the very end of the day.
fn end_of_day(date: NaiveDate) -> Option<NaiveDateTime> {
    date.and_hms_milli_opt(23, 59, 59, 999)
}

#[derive(Clone, Copy, Debug)]
enum TimeRule {
    TwelveHourMinutes,
    TwelveHour,
    TwentyFourHour,
    AtHour,
    Named,
    OClock,
}

struct TimePattern {
    regex: Regex,
    rule: TimeRule,
    confidence: Confidence,
}

fn time_pattern(pattern: &str, rule: TimeRule, confidence: Confidence) -> TimePattern {
    TimePattern {
        regex: Regex::new(pattern).unwrap(),
        rule,
        confidence,
    }
}

static TIME_PATTERNS: Lazy<Vec<TimePattern>> = Lazy::new(|| {
    use Confidence::{High, Medium};
    vec![
        time_pattern(
            r"\b(?:(?:at|by|around) )?(\d{1,2}):(\d{2}) ?(a\.m\.|p\.m\.|am\b|pm\b)",
            TimeRule::TwelveHourMinutes,
            High,
        ),
        time_pattern(
            r"\b(?:(?:at|by|around) )?(\d{1,2}) ?(a\.m\.|p\.m\.|am\b|pm\b)",
            TimeRule::TwelveHour,
            High,
        ),
        time_pattern(
            r"\b(?:(?:at|by|around) )?(\d{1,2}):(\d{2})\b",
            TimeRule::TwentyFourHour,
            High,
        ),
        // an invalid 12-hour reading ("at 13 pm") still swallows the meridiem
        time_pattern(
            r"\b(?:at|around) (\d{1,2})(?: ?(?:a\.m\.|p\.m\.|am\b|pm\b)|\b)",
            TimeRule::AtHour,
            Medium,
        ),
        time_pattern(
            r"\b(?:(?:at|by|around) )?(noon|midday|midnight)\b",
            TimeRule::Named,
            High,
        ),
        time_pattern(
            r"\b(?:(?:in the|this|by|at) )?(morning|afternoon|evening|tonight|night)\b",
            TimeRule::Named,
            Medium,
        ),
        time_pattern(
            r"\b(?:(?:at|by|around) )?(\d{1,2}) ?o'?clock\b",
            TimeRule::OClock,
            Medium,
        ),
    ]
});

impl TimePattern {
    fn resolve(&self, caps: &Captures<'_>) -> Option<TimeOfDay> {
        let number = |i: usize| -> Option<u32> { caps.get(i)?.as_str().parse().ok() };
        let is_pm = |i: usize| caps.get(i).map_or(false, |m| m.as_str().starts_with('p'));
        match self.rule {
            TimeRule::TwelveHourMinutes => TimeOfDay::twelve_hour(number(1)?, number(2)?, is_pm(3)),
            TimeRule::TwelveHour => TimeOfDay::twelve_hour(number(1)?, 0, is_pm(2)),
            TimeRule::TwentyFourHour => TimeOfDay::new(number(1)?, number(2)?),
            TimeRule::AtHour => TimeOfDay::bare_hour(number(1)?),
            TimeRule::OClock => {
                let hour = number(1)?;
                if (1..=12).contains(&hour) {
                    TimeOfDay::bare_hour(hour)
                } else {
                    None
                }
            }
            TimeRule::Named => match caps.get(1)?.as_str() {
                "noon" | "midday" => TimeOfDay::new(12, 0),
                "midnight" => TimeOfDay::new(0, 0),
                "morning" => TimeOfDay::new(9, 0),
                "afternoon" => TimeOfDay::new(14, 0),
                "evening" => TimeOfDay::new(18, 0),
                "tonight" | "night" => TimeOfDay::new(20, 0),
                _ => None,
            },
        }
    }
}

pub fn detect_date_from_text(text: &str) -> DateDetectionResult {
    detect_date_from_text_at(text, Local::now().naive_local())
}

pub fn detect_date_from_text_at(text: &str, now: NaiveDateTime) -> DateDetectionResult {
    let lower = text.to_lowercase();
    let today = now.date();
    let tiers = [Confidence::High, Confidence::Medium];
    let ordered = tiers
        .iter()
        .flat_map(|tier| DATE_PATTERNS.iter().filter(move |p| p.confidence == *tier));
    for pattern in ordered {
        for caps in pattern.regex.captures_iter(&lower) {
            let Some(date) = pattern.resolve(&caps, today).and_then(end_of_day) else {
                continue;
            };
            let matched = caps[0].trim().to_string();
            debug!(rule = ?pattern.rule, %matched, %date, "date expression detected");
            return DateDetectionResult {
                detected_date: Some(date),
                cleaned_text: collapse_whitespace(&remove_phrase(text, &matched)),
                matched_text: Some(matched),
                confidence: pattern.confidence,
                original_text: text.to_string(),
            };
        }
    }
    DateDetectionResult::unmatched(text)
}

pub fn detect_time_from_text(text: &str) -> TimeDetectionResult {
    let lower = text.to_lowercase();
    for pattern in TIME_PATTERNS.iter() {
        for caps in pattern.regex.captures_iter(&lower) {
            if let Some(time) = pattern.resolve(&caps) {
                let matched = caps[0].trim().to_string();
                debug!(rule = ?pattern.rule, %matched, "time expression detected");
                return TimeDetectionResult {
                    time: Some(time),
                    matched_text: Some(matched),
                    confidence: pattern.confidence,
                };
            }
        }
    }
    TimeDetectionResult {
        time: None,
        matched_text: None,
        confidence: Confidence::Low,
    }
}

fn combined_confidence(date: Confidence, time: Confidence) -> Confidence {
    if date == Confidence::High && time == Confidence::High {
        Confidence::High
    } else if date != Confidence::Low || time != Confidence::Low {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}

pub fn detect_date_time_from_text(text: &str) -> DateDetectionResult {
    detect_date_time_from_text_at(text, Local::now().naive_local())
}

/// Date and time together. A time with no date lands on today, even if that
/// moment has already passed.
pub fn detect_date_time_from_text_at(text: &str, now: NaiveDateTime) -> DateDetectionResult {
    let date = detect_date_from_text_at(text, now);
    let time = detect_time_from_text(text);

    let (detected, confidence) = match (date.detected_date, time.time) {
        (Some(day), Some(at)) => (
            day.date().and_time(at.as_naive_time()),
            combined_confidence(date.confidence, time.confidence),
        ),
        (Some(day), None) => (day, date.confidence),
        (None, Some(at)) => (now.date().and_time(at.as_naive_time()), time.confidence),
        (None, None) => return DateDetectionResult::unmatched(text),
    };

    let phrases: Vec<&str> = [&date.matched_text, &time.matched_text]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .collect();
    let cleaned = phrases
        .iter()
        .fold(text.to_string(), |acc, phrase| remove_phrase(&acc, phrase));

    DateDetectionResult {
        detected_date: Some(detected),
        matched_text: Some(phrases.join(" ")),
        confidence,
        original_text: text.to_string(),
        cleaned_text: collapse_whitespace(&cleaned),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    // Wednesday
    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 14)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn date_of(text: &str) -> Option<NaiveDate> {
        detect_date_from_text_at(text, now())
            .detected_date
            .map(|dt| dt.date())
    }

    fn time_of(text: &str) -> Option<(u32, u32)> {
        detect_time_from_text(text)
            .time
            .map(|t| (t.hour(), t.minute()))
    }

    #[test]
    fn test_relative_days() {
        assert_eq!(date_of("call mom today"), Some(day(2026, 10, 14)));
        assert_eq!(date_of("call mom tomorrow"), Some(day(2026, 10, 15)));
        assert_eq!(date_of("call mom the day after tomorrow"), Some(day(2026, 10, 16)));
    }

    #[test]
    fn test_dates_fall_due_at_end_of_day() {
        let result = detect_date_from_text_at("pay rent tomorrow", now());
        let due = result.detected_date.unwrap();
        assert_eq!(due.time(), NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap());
        assert_eq!(result.confidence, Confidence::High);
        assert_eq!(result.cleaned_text, "pay rent");
    }

    #[test]
    fn test_weekdays() {
        assert_eq!(date_of("friday"), Some(day(2026, 10, 16)));
        assert_eq!(date_of("this friday"), Some(day(2026, 10, 16)));
        assert_eq!(date_of("next friday"), Some(day(2026, 10, 23)));
        // same weekday as today rolls a full week
        assert_eq!(date_of("wednesday"), Some(day(2026, 10, 21)));
        assert_eq!(date_of("by monday"), Some(day(2026, 10, 19)));
    }

    #[test]
    fn test_bare_weekday_is_always_in_the_next_seven_days() {
        let names = [
            ("monday", Weekday::Mon),
            ("tuesday", Weekday::Tue),
            ("wednesday", Weekday::Wed),
            ("thursday", Weekday::Thu),
            ("friday", Weekday::Fri),
            ("saturday", Weekday::Sat),
            ("sunday", Weekday::Sun),
        ];
        for offset in 0..7 {
            let reference = now() + Duration::days(offset);
            for (name, weekday) in names {
                let text = format!("water the plants {}", name);
                let due = detect_date_from_text_at(&text, reference)
                    .detected_date
                    .unwrap()
                    .date();
                let ahead = (due - reference.date()).num_days();
                assert_eq!(due.weekday(), weekday, "{} from {}", name, reference);
                assert!((1..=7).contains(&ahead), "{} from {}", name, reference);
            }
        }
    }

    #[test]
    fn test_in_n_days() {
        for n in 1..=40u64 {
            let text = format!("renew passport in {} days", n);
            let result = detect_date_from_text_at(&text, now());
            assert_eq!(
                result.detected_date,
                end_of_day(now().date() + Duration::days(n as i64))
            );
        }
        assert_eq!(date_of("in 1 day"), Some(day(2026, 10, 15)));
    }

    #[test]
    fn test_weeks_and_weekends() {
        assert_eq!(date_of("in a week"), Some(day(2026, 10, 21)));
        assert_eq!(date_of("in 2 weeks"), Some(day(2026, 10, 28)));
        assert_eq!(date_of("next week"), Some(day(2026, 10, 21)));
        assert_eq!(date_of("this weekend"), Some(day(2026, 10, 17)));
        assert_eq!(date_of("by the end of the week"), Some(day(2026, 10, 16)));
    }

    #[test]
    fn test_calendar_dates() {
        assert_eq!(date_of("december 25th"), Some(day(2026, 12, 25)));
        assert_eq!(date_of("on the 5th of november"), Some(day(2026, 11, 5)));
        // already passed this year
        assert_eq!(date_of("march 5"), Some(day(2027, 3, 5)));
        // not a real date, so the rule does not count
        assert_eq!(date_of("february 30"), None);
    }

    #[test]
    fn test_specific_phrases_win_over_generic() {
        let result = detect_date_from_text_at("finish slides next friday", now());
        assert_eq!(result.matched_text.as_deref(), Some("next friday"));
        assert_eq!(result.cleaned_text, "finish slides");
    }

    #[test]
    fn test_calendar_date_beats_vaguer_phrase() {
        let result = detect_date_from_text_at("meeting next week on december 5", now());
        assert_eq!(result.detected_date.map(|dt| dt.date()), Some(day(2026, 12, 5)));
        assert_eq!(result.matched_text.as_deref(), Some("on december 5"));
        assert_eq!(result.confidence, Confidence::High);
        assert_eq!(result.cleaned_text, "meeting next week");
    }

    #[test]
    fn test_no_date() {
        let result = detect_date_time_from_text_at("Buy milk", now());
        assert_eq!(result.detected_date, None);
        assert_eq!(result.confidence, Confidence::Low);
        assert_eq!(result.cleaned_text, "Buy milk");
        assert_eq!(result.original_text, "Buy milk");
    }

    #[test]
    fn test_twelve_hour_times() {
        assert_eq!(time_of("at 5 PM"), Some((17, 0)));
        assert_eq!(time_of("5:30pm"), Some((17, 30)));
        assert_eq!(time_of("7 a.m."), Some((7, 0)));
        assert_eq!(time_of("12 am"), Some((0, 0)));
        assert_eq!(time_of("12 pm"), Some((12, 0)));
    }

    #[test]
    fn test_twenty_four_hour_and_bare_times() {
        assert_eq!(time_of("standup at 17:45"), Some((17, 45)));
        assert_eq!(time_of("at 3"), Some((15, 0)));
        assert_eq!(time_of("at 9"), Some((9, 0)));
        assert_eq!(time_of("4 o'clock"), Some((16, 0)));
    }

    #[test]
    fn test_named_times() {
        assert_eq!(time_of("lunch at noon"), Some((12, 0)));
        assert_eq!(time_of("midnight"), Some((0, 0)));
        assert_eq!(time_of("in the morning"), Some((9, 0)));
        assert_eq!(time_of("this evening"), Some((18, 0)));
        assert_eq!(detect_time_from_text("noon").confidence, Confidence::High);
        assert_eq!(detect_time_from_text("evening").confidence, Confidence::Medium);
    }

    #[test]
    fn test_invalid_times_fall_through() {
        // 13 is not a 12-hour value, so "at 13" is what resolves
        assert_eq!(time_of("meet at 13 pm"), Some((13, 0)));
        let result = detect_time_from_text("call mom at 13 pm");
        assert_eq!(result.matched_text.as_deref(), Some("at 13 pm"));
        assert_eq!(time_of("at 123"), None);
        assert_eq!(time_of("25:99"), None);
        assert_eq!(time_of("nothing here"), None);
    }

    #[test]
    fn test_date_and_time_merge() {
        let result = detect_date_time_from_text_at("Add task call John tomorrow at 5 PM", now());
        assert_eq!(
            result.detected_date,
            Some(day(2026, 10, 15).and_hms_opt(17, 0, 0).unwrap())
        );
        assert_eq!(result.confidence, Confidence::High);
        assert_eq!(result.cleaned_text, "Add task call John");
    }

    #[test]
    fn test_merged_confidence_is_medium_when_one_side_is_medium() {
        let result = detect_date_time_from_text_at("gym tomorrow morning", now());
        assert_eq!(
            result.detected_date,
            Some(day(2026, 10, 15).and_hms_opt(9, 0, 0).unwrap())
        );
        assert_eq!(result.confidence, Confidence::Medium);
    }

    #[test]
    fn test_time_only_means_today_even_when_past() {
        let result = detect_date_time_from_text_at("take pills at 8 am", now());
        assert_eq!(
            result.detected_date,
            Some(day(2026, 10, 14).and_hms_opt(8, 0, 0).unwrap())
        );
        assert_eq!(result.cleaned_text, "take pills");
    }

    #[test]
    fn test_wall_clock_entry_points() {
        let due = detect_date_from_text("buy milk tomorrow").detected_date.unwrap();
        assert_eq!(due.time(), NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap());
        let result = detect_date_time_from_text("buy milk");
        assert_eq!(result.detected_date, None);
        assert_eq!(result.cleaned_text, "buy milk");
    }

    #[test]
    fn test_tonight_counts_once() {
        let result = detect_date_time_from_text_at("call dad tonight", now());
        assert_eq!(
            result.detected_date,
            Some(day(2026, 10, 14).and_hms_opt(20, 0, 0).unwrap())
        );
        assert_eq!(result.cleaned_text, "call dad");
    }
}
