use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

const SECS_PER_MINUTE: u64 = 60;
const SECS_PER_HOUR: u64 = 60 * SECS_PER_MINUTE;

/// Whole-second offset into a media timeline.
///
/// The textual form is `MM:SS` below one hour and `HH:MM:SS` from one hour on,
/// which is also the wire format of chapter timestamps and search deep links.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeCode(u64);

impl TimeCode {
    pub const ZERO: Self = Self(0);

    pub const fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    pub const fn as_secs(self) -> u64 {
        self.0
    }

    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Floors a media element position to whole seconds.
    ///
    /// Negative and non-finite positions map to zero.
    pub fn from_position(seconds: f64) -> Self {
        if seconds.is_finite() && seconds > 0.0 {
            Self(seconds.floor() as u64)
        } else {
            Self::ZERO
        }
    }

    /// Parses `S`, `M:S` or `H:M:S`.
    ///
    /// Parsing never fails: empty, non-numeric or otherwise malformed input
    /// (including values that overflow) yields [`TimeCode::ZERO`].
    ///
    /// # Example
    /// ```
    /// use codex_engine::TimeCode;
    ///
    /// assert_eq!(TimeCode::parse("1:05:30").as_secs(), 3930);
    /// assert_eq!(TimeCode::parse("05:30").as_secs(), 330);
    /// assert_eq!(TimeCode::parse("bad"), TimeCode::ZERO);
    /// ```
    pub fn parse(text: &str) -> Self {
        parse_total_secs(text).map(Self).unwrap_or(Self::ZERO)
    }
}

fn parse_total_secs(text: &str) -> Option<u64> {
    let mut parts = [0_u64; 3];
    let mut count = 0;
    for token in text.trim().split(':') {
        if count == parts.len() {
            return None;
        }
        parts[count] = parse_component(token)?;
        count += 1;
    }

    let (hours, minutes, seconds) = match count {
        1 => (0, 0, parts[0]),
        2 => (0, parts[0], parts[1]),
        3 => (parts[0], parts[1], parts[2]),
        _ => return None,
    };

    hours
        .checked_mul(SECS_PER_HOUR)?
        .checked_add(minutes.checked_mul(SECS_PER_MINUTE)?)?
        .checked_add(seconds)
}

fn parse_component(token: &str) -> Option<u64> {
    if token.is_empty() || !token.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

impl Display for TimeCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let hours = self.0 / SECS_PER_HOUR;
        let minutes = (self.0 % SECS_PER_HOUR) / SECS_PER_MINUTE;
        let seconds = self.0 % SECS_PER_MINUTE;
        if hours > 0 {
            write!(f, "{hours:02}:{minutes:02}:{seconds:02}")
        } else {
            write!(f, "{minutes:02}:{seconds:02}")
        }
    }
}

impl FromStr for TimeCode {
    type Err = Infallible;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(text))
    }
}

impl Serialize for TimeCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(Self::parse(&text))
    }
}

#[cfg(test)]
mod tests {
    use super::TimeCode;

    #[test]
    fn parse_accepts_one_two_and_three_parts() {
        assert_eq!(TimeCode::parse("42").as_secs(), 42);
        assert_eq!(TimeCode::parse("05:30").as_secs(), 330);
        assert_eq!(TimeCode::parse("1:05:30").as_secs(), 3930);
        assert_eq!(TimeCode::parse("01:75").as_secs(), 135);
    }

    #[test]
    fn parse_maps_malformed_input_to_zero() {
        for text in [
            "",
            ":",
            "bad",
            "1:2:3:4",
            "01:",
            ":30",
            "-5",
            "1.5",
            "01:3O",
            "99999999999999999999",
            "99999999999999999:00:00",
        ] {
            assert_eq!(TimeCode::parse(text), TimeCode::ZERO, "input {text:?}");
        }
    }

    #[test]
    fn format_round_trips_through_parse() {
        for secs in (0..=4 * 3600).step_by(7).chain([59, 60, 3599, 3600, 86_399]) {
            let code = TimeCode::from_secs(secs);
            assert_eq!(TimeCode::parse(&code.to_string()), code, "secs {secs}");
        }
    }

    #[test]
    fn format_switches_to_hours_at_one_hour() {
        assert_eq!(TimeCode::from_secs(0).to_string(), "00:00");
        assert_eq!(TimeCode::from_secs(90).to_string(), "01:30");
        assert_eq!(TimeCode::from_secs(3599).to_string(), "59:59");
        assert_eq!(TimeCode::from_secs(3930).to_string(), "01:05:30");
    }

    #[test]
    fn from_position_floors_and_clamps() {
        assert_eq!(TimeCode::from_position(70.9).as_secs(), 70);
        assert_eq!(TimeCode::from_position(-3.0), TimeCode::ZERO);
        assert_eq!(TimeCode::from_position(f64::NAN), TimeCode::ZERO);
    }

    #[test]
    fn serde_uses_the_textual_form() {
        let json = serde_json::to_string(&TimeCode::from_secs(65)).expect("serialize");
        assert_eq!(json, "\"01:05\"");

        let decoded: TimeCode = serde_json::from_str("\"garbage\"").expect("deserialize");
        assert_eq!(decoded, TimeCode::ZERO);
    }
}
