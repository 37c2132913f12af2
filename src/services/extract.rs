//! Pure text extractors shared by the booking conversation and the operator
//! assistant. No state, no I/O.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use crate::models::{Address, TimePreference};

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}").unwrap()
});

static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\+?1[\s.\-]?)?\(?([2-9]\d{2})\)?[\s.\-]?(\d{3})[\s.\-]?(\d{4})\b").unwrap()
});

static UUID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
        .unwrap()
});

static NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:my name is|my name's|i am|i'm|this is)\s+([A-Za-z][A-Za-z .'\-]{0,59})")
        .unwrap()
});

static MONEY_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(-?)\$\s?([0-9][0-9,]*(?:\.[0-9]+)?)").unwrap());

static MONEY_VALID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,3}(?:,\d{3})*|\d+)(?:\.(\d{1,2}))?$").unwrap());

static NOTE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bnotes?:\s*(.+)").unwrap());

static ZIP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{5}(-\d{4})?$").unwrap());

// Embedded "street, [unit,] city, REGION zip" anywhere in a sentence.
static ADDRESS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b\d{1,6}\s+[0-9A-Za-z .'\-]+,\s*(?:[0-9A-Za-z #.'\-]+,\s*){1,2}[A-Za-z]{2,}\.?\s+\d{5}(?:-\d{4})?\b",
    )
    .unwrap()
});

static WEEKDAY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b").unwrap()
});

// First words that mean a self-introduction pattern actually caught a verb
// phrase ("I'm looking for...") rather than a name.
const NAME_STOPWORDS: &[&str] = &[
    "looking", "calling", "trying", "interested", "wondering", "hoping", "here", "just", "not",
    "sorry", "going", "gonna", "a", "an", "the", "so", "afraid", "sure", "good",
];

const SERVICE_KEYWORDS: &[&str] = &[
    "lawn",
    "mowing",
    "gutter",
    "junk",
    "furniture",
    "appliance",
    "cleaning",
    "moving",
    "removal",
    "hauling",
    "pressure washing",
    "landscaping",
    "yard",
    "debris",
];

pub fn extract_email(text: &str) -> Option<String> {
    EMAIL_RE.find(text).map(|m| m.as_str().to_string())
}

/// Finds a North American phone number and normalizes it to `+1NNNNNNNNNN`.
pub fn extract_phone(text: &str) -> Option<String> {
    PHONE_RE
        .captures(text)
        .map(|c| format!("+1{}{}{}", &c[1], &c[2], &c[3]))
}

pub fn extract_uuid(text: &str) -> Option<Uuid> {
    UUID_RE
        .find(text)
        .and_then(|m| Uuid::parse_str(m.as_str()).ok())
}

/// Dollar amount in cents. Accepts `$` with optional thousands separators and
/// up to two decimals; negative amounts and >2 decimal digits are dropped
/// silently rather than producing a malformed value.
pub fn extract_money(text: &str) -> Option<i64> {
    let caps = MONEY_TOKEN_RE.captures(text)?;
    if !caps[1].is_empty() {
        return None;
    }
    let valid = MONEY_VALID_RE.captures(&caps[2])?;
    let whole: i64 = valid[1].replace(',', "").parse().ok()?;
    let cents = match valid.get(2) {
        Some(d) if d.as_str().len() == 1 => d.as_str().parse::<i64>().ok()? * 10,
        Some(d) => d.as_str().parse::<i64>().ok()?,
        None => 0,
    };
    Some(whole * 100 + cents)
}

/// Free-text note threaded through the `note:`/`notes:` prefix convention.
pub fn extract_note(text: &str) -> Option<String> {
    NOTE_RE
        .captures(text)
        .map(|c| c[1].trim().trim_end_matches(['.', '!']).to_string())
        .filter(|n| !n.is_empty())
}

/// Name via self-introduction patterns only. Raw-message acceptance is the
/// state machine's call, gated on `is_plausible_name`.
pub fn extract_name(text: &str) -> Option<String> {
    let caps = NAME_RE.captures(text)?;
    let raw = caps[1]
        .split(['.', ',', '!', '?', '\n'])
        .next()
        .unwrap_or("")
        .trim();
    // Keep at most four words; introductions longer than that are sentences.
    let words: Vec<&str> = raw.split_whitespace().collect();
    if words.is_empty() || words.len() > 4 {
        return None;
    }
    if NAME_STOPWORDS.contains(&words[0].to_lowercase().as_str()) {
        return None;
    }
    let name = words.join(" ");
    is_plausible_name(&name).then_some(name)
}

pub fn is_plausible_name(text: &str) -> bool {
    let t = text.trim();
    let len = t.chars().count();
    len >= 2 && len <= 60 && !t.chars().any(|c| c.is_ascii_digit()) && t.chars().any(char::is_alphabetic)
}

/// Structured address, all-or-nothing. Tries the whole message as a strict
/// comma form first, then falls back to finding one embedded in a sentence.
pub fn extract_address(text: &str) -> Option<Address> {
    if let Some(addr) = parse_address_parts(text.trim()) {
        return Some(addr);
    }
    ADDRESS_RE
        .find(text)
        .and_then(|m| parse_address_parts(m.as_str()))
}

/// Strict comma-delimited parse: `street[, unit], city, REGION zip`. Fewer
/// than three parts, a bad zip, or a non-alphabetic region fail the whole
/// parse; no partial address is ever produced.
pub fn parse_address_parts(raw: &str) -> Option<Address> {
    let parts: Vec<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    let (line1, line2, city, tail) = match parts.len() {
        3 => (parts[0], None, parts[1], parts[2]),
        4 => (parts[0], Some(parts[1]), parts[2], parts[3]),
        _ => return None,
    };

    let mut pieces = tail.rsplitn(2, char::is_whitespace);
    let zip = pieces.next()?.trim();
    let region_raw = pieces.next()?.trim().trim_end_matches('.');
    if !ZIP_RE.is_match(zip) {
        return None;
    }
    if region_raw.len() < 2 || !region_raw.chars().all(char::is_alphabetic) {
        return None;
    }
    let region: String = region_raw.chars().take(2).collect::<String>().to_uppercase();

    if line1.is_empty() || city.is_empty() || !city.chars().any(char::is_alphabetic) {
        return None;
    }

    Some(Address {
        line1: line1.to_string(),
        line2: line2.map(|s| s.to_string()),
        city: city.to_string(),
        region,
        postal_code: zip.to_string(),
    })
}

pub fn extract_services(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut found = Vec::new();
    for kw in SERVICE_KEYWORDS {
        if lower.contains(kw) && !found.iter().any(|f| f == kw) {
            found.push(kw.to_string());
        }
    }
    found
}

/// Outcome of scanning a message for a day/time-window preference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreferenceSignal {
    /// Message says nothing about timing.
    None,
    /// Explicit "no preference" phrase; any stored preference is dropped.
    Clear,
    Set(TimePreference),
}

const CLEAR_PHRASES: &[&str] = &["no preference", "anytime", "any time", "whenever"];

/// Day-of-week or relative day plus a named time-of-day band, resolved
/// against `today` in the business time zone.
pub fn extract_time_preference(text: &str, today: NaiveDate) -> PreferenceSignal {
    let lower = text.to_lowercase();

    if CLEAR_PHRASES.iter().any(|p| lower.contains(p)) {
        return PreferenceSignal::Clear;
    }

    let mut day: Option<NaiveDate> = None;
    let mut label_parts: Vec<String> = Vec::new();

    if let Some(m) = WEEKDAY_RE.find(&lower) {
        let target = match m.as_str() {
            "monday" => Weekday::Mon,
            "tuesday" => Weekday::Tue,
            "wednesday" => Weekday::Wed,
            "thursday" => Weekday::Thu,
            "friday" => Weekday::Fri,
            "saturday" => Weekday::Sat,
            _ => Weekday::Sun,
        };
        let ahead = (target.num_days_from_monday() + 7
            - today.weekday().num_days_from_monday())
            % 7;
        day = Some(today + Duration::days(ahead as i64));
        label_parts.push(m.as_str().to_string());
    } else if lower.contains("tomorrow") {
        day = Some(today + Duration::days(1));
        label_parts.push("tomorrow".to_string());
    } else if lower.contains("today") || lower.contains("tonight") {
        day = Some(today);
        label_parts.push(if lower.contains("tonight") {
            "tonight".to_string()
        } else {
            "today".to_string()
        });
    }

    let band = if lower.contains("morning") {
        Some(("morning", 8u8, 12u8))
    } else if lower.contains("afternoon") {
        Some(("afternoon", 12, 17))
    } else if lower.contains("evening") || lower.contains("tonight") {
        Some(("evening", 17, 20))
    } else {
        None
    };

    let (start_hour, end_hour) = match band {
        Some((name, s, e)) => {
            if name != "evening" || !label_parts.iter().any(|p| p == "tonight") {
                label_parts.push(name.to_string());
            }
            (Some(s), Some(e))
        }
        None => (None, None),
    };

    if day.is_none() && start_hour.is_none() {
        return PreferenceSignal::None;
    }

    PreferenceSignal::Set(TimePreference {
        day,
        start_hour,
        end_hour,
        label: Some(label_parts.join(" ")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_extract_email() {
        assert_eq!(
            extract_email("reach me at jamie@example.com thanks"),
            Some("jamie@example.com".to_string())
        );
        assert_eq!(extract_email("no email here"), None);
    }

    #[test]
    fn test_extract_phone_formats() {
        for input in [
            "call me at 512-555-0134",
            "call me at (512) 555-0134",
            "call me at 5125550134",
            "call me at +1 512 555 0134",
        ] {
            assert_eq!(extract_phone(input), Some("+15125550134".to_string()), "{input}");
        }
    }

    #[test]
    fn test_phone_does_not_match_zip_plus_four() {
        assert_eq!(extract_phone("zip is 78701-1234"), None);
    }

    #[test]
    fn test_extract_uuid() {
        let id = "7f9c24e5-2b31-4f4c-9a5e-3d1b2c4d5e6f";
        assert_eq!(
            extract_uuid(&format!("move appt {id} please")),
            Some(Uuid::parse_str(id).unwrap())
        );
        assert_eq!(extract_uuid("no id"), None);
    }

    #[test]
    fn test_extract_money() {
        assert_eq!(extract_money("quoted $450"), Some(45000));
        assert_eq!(extract_money("total $1,250.50"), Some(125050));
        assert_eq!(extract_money("about $99.9"), Some(9990));
    }

    #[test]
    fn test_extract_money_rejects_nonsense() {
        assert_eq!(extract_money("-$20"), None);
        assert_eq!(extract_money("$12.345"), None);
        assert_eq!(extract_money("$1,23"), None);
        assert_eq!(extract_money("no amount"), None);
    }

    #[test]
    fn test_extract_name_patterns() {
        assert_eq!(
            extract_name("Hi, my name is Jamie Rivera"),
            Some("Jamie Rivera".to_string())
        );
        assert_eq!(extract_name("I'm Dana"), Some("Dana".to_string()));
        assert_eq!(extract_name("this is Sam Okafor."), Some("Sam Okafor".to_string()));
    }

    #[test]
    fn test_extract_name_skips_verb_phrases() {
        assert_eq!(extract_name("I'm looking for a quote"), None);
        assert_eq!(extract_name("I am not sure yet"), None);
    }

    #[test]
    fn test_is_plausible_name() {
        assert!(is_plausible_name("Jamie Rivera"));
        assert!(!is_plausible_name("J"));
        assert!(!is_plausible_name("call me at 512"));
        assert!(!is_plausible_name("???"));
    }

    #[test]
    fn test_extract_note() {
        assert_eq!(
            extract_note("quote for junk removal, note: tight driveway"),
            Some("tight driveway".to_string())
        );
        assert_eq!(
            extract_note("Notes: gate code 4411"),
            Some("gate code 4411".to_string())
        );
        assert_eq!(extract_note("nothing here"), None);
    }

    #[test]
    fn test_extract_address_strict() {
        let addr = extract_address("123 Main St, Austin, TX 78701").unwrap();
        assert_eq!(addr.line1, "123 Main St");
        assert_eq!(addr.line2, None);
        assert_eq!(addr.city, "Austin");
        assert_eq!(addr.region, "TX");
        assert_eq!(addr.postal_code, "78701");
    }

    #[test]
    fn test_extract_address_with_unit() {
        let addr = extract_address("456 Oak Ave, Apt 2B, Portland, Oregon 97201").unwrap();
        assert_eq!(addr.line2, Some("Apt 2B".to_string()));
        assert_eq!(addr.region, "OR");
    }

    #[test]
    fn test_extract_address_embedded() {
        let addr =
            extract_address("sure, it's at 9 Elm Rd, Denver, CO 80204 — side entrance").unwrap();
        assert_eq!(addr.line1, "9 Elm Rd");
        assert_eq!(addr.city, "Denver");
    }

    #[test]
    fn test_address_all_or_nothing() {
        assert!(extract_address("123 Main St, Austin").is_none());
        assert!(extract_address("123 Main St, Austin, TX").is_none());
        assert!(extract_address("Main St, Austin, 12 78701").is_none());
    }

    #[test]
    fn test_address_roundtrip_normalized() {
        let inputs = [
            "123 Main St, Austin, texas 78701",
            "77 Birch Ln, Unit 3, Boise, ID 83702",
        ];
        let expected = [
            "123 Main St, Austin, TE 78701",
            "77 Birch Ln, Boise, ID 83702",
        ];
        for (input, want) in inputs.iter().zip(expected) {
            let addr = extract_address(input).unwrap();
            assert_eq!(addr.normalized(), want);
            assert_eq!(addr.region.len(), 2);
            assert_eq!(addr.region, addr.region.to_uppercase());
        }
    }

    #[test]
    fn test_extract_services() {
        assert_eq!(
            extract_services("quote for furniture removal"),
            vec!["furniture".to_string(), "removal".to_string()]
        );
        assert!(extract_services("hello").is_empty());
    }

    #[test]
    fn test_time_preference_weekday_band() {
        // 2024-06-03 is a Monday.
        let today = date("2024-06-03");
        let sig = extract_time_preference("saturday morning works best", today);
        let PreferenceSignal::Set(pref) = sig else {
            panic!("expected Set");
        };
        assert_eq!(pref.day, Some(date("2024-06-08")));
        assert_eq!(pref.start_hour, Some(8));
        assert_eq!(pref.end_hour, Some(12));
        assert_eq!(pref.label.as_deref(), Some("saturday morning"));
    }

    #[test]
    fn test_time_preference_same_weekday_is_today() {
        let today = date("2024-06-03");
        let PreferenceSignal::Set(pref) = extract_time_preference("monday please", today) else {
            panic!("expected Set");
        };
        assert_eq!(pref.day, Some(today));
    }

    #[test]
    fn test_time_preference_relative_days() {
        let today = date("2024-06-03");
        let PreferenceSignal::Set(pref) = extract_time_preference("tomorrow afternoon", today)
        else {
            panic!("expected Set");
        };
        assert_eq!(pref.day, Some(date("2024-06-04")));
        assert_eq!(pref.start_hour, Some(12));

        let PreferenceSignal::Set(pref) = extract_time_preference("tonight if possible", today)
        else {
            panic!("expected Set");
        };
        assert_eq!(pref.day, Some(today));
        assert_eq!(pref.start_hour, Some(17));
    }

    #[test]
    fn test_time_preference_clear() {
        let today = date("2024-06-03");
        assert_eq!(
            extract_time_preference("no preference, whatever is open", today),
            PreferenceSignal::Clear
        );
        assert_eq!(
            extract_time_preference("anytime works", today),
            PreferenceSignal::Clear
        );
    }

    #[test]
    fn test_time_preference_none() {
        let today = date("2024-06-03");
        assert_eq!(
            extract_time_preference("how much does it cost?", today),
            PreferenceSignal::None
        );
    }
}
