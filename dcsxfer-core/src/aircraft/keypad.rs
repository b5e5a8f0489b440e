//! Digit and text helpers shared by the cockpit compilers.

use dcsconnect::DcsCommand;

use super::{CommandSequence, CompileError};

/// Absolute value in whole degrees, minutes and seconds, rounded to the
/// nearest second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dms {
    pub degrees: u32,
    pub minutes: u32,
    pub seconds: u32,
}

impl Dms {
    pub fn from_degrees(value: f64) -> Self {
        let total = (value.abs() * 3600.0).round() as u32;
        Dms {
            degrees: total / 3600,
            minutes: (total % 3600) / 60,
            seconds: total % 60,
        }
    }

    /// `DDMMSS` or `DDDMMSS`, depending on `degree_width`.
    pub fn digits(&self, degree_width: usize) -> String {
        format!(
            "{:0width$}{:02}{:02}",
            self.degrees,
            self.minutes,
            self.seconds,
            width = degree_width
        )
    }
}

/// Absolute value in whole degrees and decimal minutes with a fixed number of
/// decimals, rounded at the last decimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ddm {
    pub degrees: u32,
    /// Minutes scaled by `10^decimals`.
    pub minutes: u32,
    pub decimals: u32,
}

impl Ddm {
    pub fn from_degrees(value: f64, decimals: u32) -> Self {
        let scale = 10u32.pow(decimals);
        let per_degree = 60 * scale;
        let total = (value.abs() * per_degree as f64).round() as u64;
        Ddm {
            degrees: (total / per_degree as u64) as u32,
            minutes: (total % per_degree as u64) as u32,
            decimals,
        }
    }

    pub fn whole_minutes(&self) -> u32 {
        self.minutes / 10u32.pow(self.decimals)
    }

    pub fn fraction(&self) -> u32 {
        self.minutes % 10u32.pow(self.decimals)
    }

    /// Degrees and whole minutes, `DDMM` or `DDDMM`.
    pub fn head(&self, degree_width: usize) -> String {
        format!(
            "{:0width$}{:02}",
            self.degrees,
            self.whole_minutes(),
            width = degree_width
        )
    }

    /// The decimal part of the minutes, zero padded.
    pub fn tail(&self) -> String {
        format!("{:0width$}", self.fraction(), width = self.decimals as usize)
    }

    /// All digits without separator, `DDMMmmm` or `DDDMMmmm`.
    pub fn digits(&self, degree_width: usize) -> String {
        format!("{}{}", self.head(degree_width), self.tail())
    }
}

pub fn metres_to_feet(metres: f64) -> f64 {
    metres / 0.3048
}

/// Pushes one key per character of `text`, using `key` to look up each control.
pub fn type_text(
    sequence: &mut CommandSequence,
    text: &str,
    key: impl Fn(char) -> Option<DcsCommand>,
) -> Result<(), CompileError> {
    for c in text.chars() {
        let command = key(c).ok_or(CompileError::UnsupportedCharacter(c))?;
        sequence.push(command);
    }
    Ok(())
}

/// Keeps the characters a cockpit keyboard can type, upper-cased, up to `max_len`.
pub fn keyboard_label(label: &str, max_len: usize, allowed: impl Fn(char) -> bool) -> String {
    label
        .chars()
        .map(|c| c.to_ascii_uppercase())
        .filter(|&c| allowed(c))
        .take(max_len)
        .collect()
}

/// Key code for a digit on a pad whose keys 0-9 are numbered consecutively.
pub fn digit_code(base: i32, c: char) -> Option<i32> {
    c.to_digit(10).map(|d| base + d as i32)
}

/// Key code for a letter on a pad whose keys A-Z are numbered consecutively.
pub fn letter_code(base: i32, c: char) -> Option<i32> {
    if c.is_ascii_uppercase() {
        Some(base + (c as u8 - b'A') as i32)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dms_rounding_carries() {
        assert_eq!(
            Dms::from_degrees(12.345),
            Dms {
                degrees: 12,
                minutes: 20,
                seconds: 42
            }
        );
        // 59.9999 seconds rounds into the next minute, and from there the next degree
        let dms = Dms::from_degrees(-(41.0 + 59.0 / 60.0 + 59.9999 / 3600.0));
        assert_eq!(dms.digits(2), "420000");
        assert_eq!(Dms::from_degrees(67.89).digits(3), "0675324");
    }

    #[test]
    fn test_ddm_groups() {
        let ddm = Ddm::from_degrees(41.601_234, 3);
        assert_eq!(ddm.head(2), "4136");
        assert_eq!(ddm.tail(), "074");
        assert_eq!(ddm.digits(2), "4136074");

        let lon = Ddm::from_degrees(-7.5, 4);
        assert_eq!(lon.head(3), "00730");
        assert_eq!(lon.tail(), "0000");
        assert_eq!(lon.digits(3), "007300000");
    }

    #[test]
    fn test_keyboard_label() {
        assert_eq!(
            keyboard_label("fa rp-2 alpha", 4, |c| c.is_ascii_alphanumeric()),
            "FARP"
        );
    }

    #[test]
    fn test_key_codes() {
        assert_eq!(digit_code(3000, '7'), Some(3007));
        assert_eq!(digit_code(3000, 'x'), None);
        assert_eq!(letter_code(100, 'C'), Some(102));
        assert_eq!(letter_code(100, 'c'), None);
    }
}
