//! CSV templates and row validation
//!
//! Each template column declares a `FieldKind`; `FieldKind::check` is the
//! single place format rules live.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate};
use regex::Regex;
use serde::Serialize;

use super::parser::CsvRow;
use crate::domain::ImportType;

/// Declared format of a template column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Email,
    Date,
    Number,
    /// Positive whole number, such as a book count
    Count,
    Boolean,
}

impl FieldKind {
    /// Check a non-blank value, returning the error message on failure
    pub fn check(&self, column: &str, value: &str) -> Option<String> {
        let (ok, what) = match self {
            FieldKind::Text => return None,
            FieldKind::Email => (is_valid_email(value), "email format"),
            FieldKind::Date => (parse_date(value).is_some(), "date"),
            FieldKind::Number => (parse_number(value).is_some(), "number"),
            FieldKind::Count => (parse_count(value).is_some(), "count"),
            FieldKind::Boolean => (parse_bool(value).is_some(), "boolean"),
        };
        (!ok).then(|| format!("Invalid {} for {}: {}", what, column, value))
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Column {
    pub name: &'static str,
    pub kind: FieldKind,
}

const fn text(name: &'static str) -> Column {
    Column {
        name,
        kind: FieldKind::Text,
    }
}

const fn col(name: &'static str, kind: FieldKind) -> Column {
    Column { name, kind }
}

/// Required and optional columns for one import type, plus an example row
#[derive(Debug, Clone, Serialize)]
pub struct CsvTemplate {
    pub import_type: ImportType,
    pub required: &'static [Column],
    pub optional: &'static [Column],
    pub example: &'static [(&'static str, &'static str)],
}

impl CsvTemplate {
    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.required.iter().chain(self.optional.iter())
    }

    /// Header line plus the example row, ready to write to a file
    pub fn to_csv(&self) -> String {
        let mut writer = csv::Writer::from_writer(Vec::new());
        let header: Vec<&str> = self.columns().map(|c| c.name).collect();
        let example: Vec<&str> = self
            .columns()
            .map(|c| {
                self.example
                    .iter()
                    .find(|(name, _)| *name == c.name)
                    .map(|(_, value)| *value)
                    .unwrap_or("")
            })
            .collect();

        // Writing to an in-memory Vec cannot fail
        let _ = writer.write_record(&header);
        let _ = writer.write_record(&example);
        let bytes = writer.into_inner().unwrap_or_default();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

static MEMBERS: CsvTemplate = CsvTemplate {
    import_type: ImportType::Members,
    required: &[text("firstName"), text("lastName"), col("email", FieldKind::Email)],
    optional: &[
        text("phone"),
        text("address"),
        text("city"),
        text("state"),
        text("zipCode"),
        col("dateOfBirth", FieldKind::Date),
        text("membershipType"),
        text("notes"),
    ],
    example: &[
        ("firstName", "John"),
        ("lastName", "Doe"),
        ("email", "john.doe@example.com"),
        ("phone", "555-0100"),
        ("address", "12 Elm Street"),
        ("city", "Springfield"),
        ("state", "IL"),
        ("zipCode", "62701"),
        ("dateOfBirth", "1985-06-15"),
        ("membershipType", "family"),
    ],
};

static CHECKOUTS: CsvTemplate = CsvTemplate {
    import_type: ImportType::Checkouts,
    required: &[
        col("memberEmail", FieldKind::Email),
        text("bookTitle"),
        col("checkoutDate", FieldKind::Date),
    ],
    optional: &[
        text("author"),
        text("isbn"),
        col("dueDate", FieldKind::Date),
        col("returnDate", FieldKind::Date),
        col("numberOfBooks", FieldKind::Count),
        text("notes"),
    ],
    example: &[
        ("memberEmail", "john.doe@example.com"),
        ("bookTitle", "Charlotte's Web"),
        ("checkoutDate", "2024-01-15"),
        ("author", "E. B. White"),
        ("dueDate", "2024-02-15"),
        ("numberOfBooks", "1"),
    ],
};

static DONATIONS: CsvTemplate = CsvTemplate {
    import_type: ImportType::Donations,
    required: &[text("donorName"), col("donatedAt", FieldKind::Date)],
    optional: &[
        col("donorEmail", FieldKind::Email),
        col("numberOfBooks", FieldKind::Count),
        col("weight", FieldKind::Number),
        text("bookCondition"),
        text("notes"),
    ],
    example: &[
        ("donorName", "Jane Smith"),
        ("donatedAt", "2024-01-20"),
        ("donorEmail", "jane.smith@example.com"),
        ("numberOfBooks", "25"),
        ("weight", "12.5"),
        ("bookCondition", "good"),
    ],
};

static PROGRAMS: CsvTemplate = CsvTemplate {
    import_type: ImportType::Programs,
    required: &[text("name"), text("programType")],
    optional: &[
        text("description"),
        text("location"),
        col("startDate", FieldKind::Date),
        col("endDate", FieldKind::Date),
        col("autoSyncAttendees", FieldKind::Boolean),
    ],
    example: &[
        ("name", "Reading Buddies"),
        ("programType", "classroom"),
        ("description", "After-school reading program"),
        ("location", "Main Branch"),
        ("startDate", "2024-09-01"),
        ("endDate", "2025-06-01"),
        ("autoSyncAttendees", "true"),
    ],
};

static ATTENDEES: CsvTemplate = CsvTemplate {
    import_type: ImportType::Attendees,
    required: &[text("programName"), text("firstName"), text("lastName")],
    optional: &[
        col("dateOfBirth", FieldKind::Date),
        text("parentName"),
        col("parentEmail", FieldKind::Email),
        text("parentPhone"),
        text("notes"),
    ],
    example: &[
        ("programName", "Reading Buddies"),
        ("firstName", "Milo"),
        ("lastName", "Reyes"),
        ("dateOfBirth", "2017-04-02"),
        ("parentName", "Ana Reyes"),
        ("parentEmail", "ana.reyes@example.com"),
        ("parentPhone", "555-0142"),
    ],
};

static METRICS: CsvTemplate = CsvTemplate {
    import_type: ImportType::Metrics,
    required: &[
        col("date", FieldKind::Date),
        text("metricName"),
        col("value", FieldKind::Number),
    ],
    optional: &[text("programName"), text("notes")],
    example: &[
        ("date", "2024-03-01"),
        ("metricName", "books_distributed"),
        ("value", "140"),
        ("programName", "Reading Buddies"),
    ],
};

/// Template for an import type
pub fn template(import_type: ImportType) -> &'static CsvTemplate {
    match import_type {
        ImportType::Members => &MEMBERS,
        ImportType::Checkouts => &CHECKOUTS,
        ImportType::Donations => &DONATIONS,
        ImportType::Programs => &PROGRAMS,
        ImportType::Attendees => &ATTENDEES,
        ImportType::Metrics => &METRICS,
    }
}

/// Template for an import type name, `None` when the name is unknown
pub fn template_for(import_type: &str) -> Option<&'static CsvTemplate> {
    import_type.parse::<ImportType>().ok().map(template)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowValidation {
    pub valid: bool,
    pub errors: Vec<String>,
}

/// Validate one row: required columns first, then per-column formats
pub fn validate_row(row: &CsvRow, import_type: &str) -> RowValidation {
    let Some(template) = template_for(import_type) else {
        return RowValidation {
            valid: false,
            errors: vec![format!("Unknown import type: {}", import_type)],
        };
    };
    validate_against(row, template)
}

pub fn validate_against(row: &CsvRow, template: &CsvTemplate) -> RowValidation {
    let mut errors: Vec<String> = template
        .required
        .iter()
        .filter(|c| row.get(c.name).is_none())
        .map(|c| format!("Missing required field: {}", c.name))
        .collect();

    for column in template.columns() {
        if let Some(value) = row.get(column.name) {
            if let Some(err) = column.kind.check(column.name, value) {
                errors.push(err);
            }
        }
    }

    RowValidation {
        valid: errors.is_empty(),
        errors,
    }
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap())
}

pub fn is_valid_email(value: &str) -> bool {
    email_regex().is_match(value.trim())
}

/// Parse the date formats accepted in import files
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let formats = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%m-%d-%Y"];

    for fmt in &formats {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

pub fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Positive whole number that fits an `i32`
pub fn parse_count(s: &str) -> Option<i32> {
    s.trim().parse::<i32>().ok().filter(|n| *n > 0)
}

pub fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Some(true),
        "false" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}
