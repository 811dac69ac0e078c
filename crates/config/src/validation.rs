//! Field checks for config sections
//!
//! A [`Validator`] is scoped to one table (`retry`, `services.openai`, ...)
//! and accumulates every failed check, so a broken file is reported in full.

pub use crate::error::ValidationError;
use std::fmt::Display;

/// A table of the config file that checks its own values
pub trait ConfigSection: Default {
    /// Returns every invalid field, or `Ok` if the section is usable
    fn validate(&self) -> Result<(), Vec<ValidationError>>;

    /// Replaces this section's values with `other`'s
    fn merge(&mut self, other: Self);

    /// Table name used as the field path prefix
    fn section_name(&self) -> &'static str;
}

/// Accumulates failed checks for the fields of one table
#[derive(Debug)]
pub struct Validator<'a> {
    table: &'a str,
    errors: Vec<ValidationError>,
}

impl<'a> Validator<'a> {
    /// Starts checking the table at `table` (e.g. `services.twitter`)
    pub fn new(table: &'a str) -> Self {
        Self {
            table,
            errors: Vec::new(),
        }
    }

    /// Requires `min <= value <= max`; NaN never passes
    pub fn in_range<T>(mut self, field: &str, value: T, min: T, max: T) -> Self
    where
        T: PartialOrd + Display + Copy,
    {
        if value >= min && value <= max {
            return self;
        }
        self.reject(field, format!("must be between {min} and {max}"), value);
        self
    }

    /// Requires `value >= min`
    pub fn at_least<T>(mut self, field: &str, value: T, min: T) -> Self
    where
        T: PartialOrd + Display + Copy,
    {
        if value >= min {
            return self;
        }
        self.reject(field, format!("must be at least {min}"), value);
        self
    }

    /// Requires every entry to contain something other than whitespace
    pub fn not_empty<'s>(mut self, field: &str, entries: impl IntoIterator<Item = &'s str>) -> Self {
        if entries.into_iter().any(|entry| entry.trim().is_empty()) {
            self.errors
                .push(ValidationError::new(self.path(field), "must not contain empty entries"));
        }
        self
    }

    /// Ends validation, returning the failures in check order
    pub fn finish(self) -> Result<(), Vec<ValidationError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }

    fn path(&self, field: &str) -> String {
        format!("{}.{field}", self.table)
    }

    fn reject(&mut self, field: &str, message: String, value: impl Display) {
        let error = ValidationError::with_value(self.path(field), message, value);
        self.errors.push(error);
    }
}
