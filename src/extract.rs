//! Turns the free-form lines of a `pwr` reply into telemetry fields.
//!
//! A reply looks roughly like
//!
//! ```text
//! Voltage         :  53012    mV
//! Current         :  -2500    mA
//! Temperature     :  24000    mC
//! Coulomb         :  87%      87000 mAH
//! Basic Status    :  Dischg
//! Volt Status     :  Normal
//! Command completed successfully
//! ```
//!
//! but the exact layout differs between firmware versions, so every line is
//! classified on its own with case-insensitive substring tests.

/// Telemetry field a line was classified as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    FirmVersion,
    Barcode,
    Devtype,
    BasicStatus,
    VoltStatus,
    Voltage,
    SocVoltage,
    Current,
    Temperature,
    Coulomb,
}

/// A response line split up for classification.
#[derive(Debug)]
struct Line<'a> {
    /// Whole line, lower case.
    low: String,
    /// Text before the first colon, trimmed and lower case.
    label: String,
    /// Text after the first colon, trimmed, original case.
    value: &'a str,
}

impl<'a> Line<'a> {
    fn new(line: &'a str) -> Self {
        let (label, value) = match line.split_once(':') {
            Some((label, value)) => (label.trim().to_ascii_lowercase(), value.trim()),
            None => (String::new(), ""),
        };
        Self {
            low: line.to_ascii_lowercase(),
            label,
            value,
        }
    }

    fn has(&self, needle: &str) -> bool {
        self.low.contains(needle)
    }
}

type Rule = (fn(&Line) -> bool, Field);

// Order matters: the first matching rule wins.
const RULES: &[Rule] = &[
    (|l| l.has("firm version"), Field::FirmVersion),
    (|l| l.has("barcode"), Field::Barcode),
    (|l| l.has("devtype") || l.has("dev type"), Field::Devtype),
    (|l| l.has("basic") && l.has("status"), Field::BasicStatus),
    (|l| l.has("volt") && l.has("status"), Field::VoltStatus),
    (|l| l.label == "voltage" && !l.has("soc"), Field::Voltage),
    (|l| l.label == "soc voltage" || l.has("soc voltage"), Field::SocVoltage),
    // "chg current"/"dsg current" lines are limits, not the measured current
    (
        |l| l.label == "current" || (l.has("current") && !l.has("chg") && !l.has("dsg")),
        Field::Current,
    ),
    (|l| l.has("temperature"), Field::Temperature),
    (|l| l.has("coulomb") || l.label == "soc", Field::Coulomb),
];

fn classify(line: &Line) -> Option<Field> {
    RULES
        .iter()
        .find(|(matches, _)| matches(line))
        .map(|(_, field)| *field)
}

/// Classifies a single raw line.
pub fn classify_line(line: &str) -> Option<Field> {
    classify(&Line::new(line.trim()))
}

/// Finds the integer directly in front of the first case-insensitive
/// occurrence of `suffix` and divides it by `divisor`.
///
/// Only whitespace may separate number and suffix. Returns `None` if the
/// suffix is missing or not preceded by an integer.
pub fn parse_suffixed(line: &str, suffix: &str, divisor: f32) -> Option<f32> {
    let low = line.to_ascii_lowercase();
    let pos = low.find(&suffix.to_ascii_lowercase())?;
    let bytes = low.as_bytes();

    let mut end = pos;
    while end > 0 && bytes[end - 1].is_ascii_whitespace() {
        end -= 1;
    }
    let mut start = end;
    while start > 0 && (bytes[start - 1].is_ascii_digit() || bytes[start - 1] == b'-') {
        start -= 1;
    }
    if start == end {
        return None;
    }

    let value: i64 = low[start..end].parse().ok()?;
    Some(value as f32 / divisor)
}

pub fn parse_millivolts(line: &str) -> Option<f32> {
    parse_suffixed(line, "mv", 1000.0)
}

pub fn parse_milliamps(line: &str) -> Option<f32> {
    parse_suffixed(line, "ma", 1000.0)
}

/// Milli degree Celsius to °C.
pub fn parse_millicelsius(line: &str) -> Option<f32> {
    parse_suffixed(line, "mc", 1000.0)
}

pub fn parse_percent(line: &str) -> Option<f32> {
    parse_suffixed(line, "%", 1.0)
}

/// Milliamp hours to Ah.
pub fn parse_milliamp_hours(line: &str) -> Option<f32> {
    parse_suffixed(line, "mah", 1000.0)
}

/// Everything found in one reply block. Numeric fields are `None` and text
/// fields empty if the block did not contain them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedFields {
    pub voltage: Option<f32>,
    pub soc_voltage: Option<f32>,
    pub current: Option<f32>,
    pub temperature_c: Option<f32>,
    pub soc_percent: Option<f32>,
    /// Remaining charge in Ah, from the coulomb counter.
    pub charge_ah: Option<f32>,
    pub barcode: String,
    pub devtype: String,
    pub firm_version: String,
    pub basic_status: String,
    pub volt_status: String,
}

impl ExtractedFields {
    fn set_text(slot: &mut String, value: &str) {
        if !value.is_empty() {
            *slot = value.to_string();
        }
    }

    fn set_number(slot: &mut Option<f32>, parsed: impl FnOnce() -> Option<f32>) {
        if slot.is_none() {
            *slot = parsed();
        }
    }

    fn apply(&mut self, field: Field, line: &Line) {
        let low = line.low.as_str();
        match field {
            Field::FirmVersion => Self::set_text(&mut self.firm_version, line.value),
            Field::Barcode => Self::set_text(&mut self.barcode, line.value),
            Field::Devtype => Self::set_text(&mut self.devtype, line.value),
            Field::BasicStatus => Self::set_text(&mut self.basic_status, line.value),
            Field::VoltStatus => Self::set_text(&mut self.volt_status, line.value),
            Field::Voltage => Self::set_number(&mut self.voltage, || parse_millivolts(low)),
            Field::SocVoltage => Self::set_number(&mut self.soc_voltage, || parse_millivolts(low)),
            Field::Current => Self::set_number(&mut self.current, || parse_milliamps(low)),
            Field::Temperature => {
                Self::set_number(&mut self.temperature_c, || parse_millicelsius(low))
            }
            Field::Coulomb => {
                Self::set_number(&mut self.soc_percent, || parse_percent(low));
                Self::set_number(&mut self.charge_ah, || parse_milliamp_hours(low));
            }
        }
    }
}

/// Extracts all known fields from a reply block.
pub fn extract<S: AsRef<str>>(lines: &[S]) -> ExtractedFields {
    let mut fields = ExtractedFields::default();
    for raw in lines {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            continue;
        }
        let line = Line::new(trimmed);
        if let Some(field) = classify(&line) {
            fields.apply(field, &line);
        }
    }
    log::debug!("extracted: {fields:?}");
    fields
}
