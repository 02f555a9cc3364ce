//! Locale identifiers and the thread-ambient current locale.
//!
//! # Invariants
//! - A `Locale` is never empty and matches `lang[-_]subtag...`.
//! - The ambient locale is per thread; `with_locale` restores the previous
//!   value even when the closure panics.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::error::Error;
use std::fmt::{Display, Formatter};

static LOCALE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z]{2,3}(?:[-_][A-Za-z0-9]{2,8})*$").expect("valid locale regex")
});

thread_local! {
    static CURRENT_LOCALE: RefCell<Option<Locale>> = const { RefCell::new(None) };
}

/// Opaque locale identifier such as `en`, `fr` or `pt-BR`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Locale(String);

impl Locale {
    /// Parses and validates a locale identifier. Surrounding whitespace is trimmed.
    pub fn parse(value: &str) -> Result<Self, LocaleError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(LocaleError::Empty);
        }
        if !LOCALE_PATTERN.is_match(trimmed) {
            return Err(LocaleError::Malformed(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Locale {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Locale {
    type Error = LocaleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Locale> for String {
    fn from(value: Locale) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocaleError {
    Empty,
    Malformed(String),
    /// No ambient locale was set on the calling thread.
    NotSet,
}

impl Display for LocaleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "locale must not be empty"),
            Self::Malformed(value) => write!(f, "locale is malformed: {value}"),
            Self::NotSet => write!(f, "no current locale is set on this thread"),
        }
    }
}

impl Error for LocaleError {}

/// Returns the ambient locale of the calling thread, if any.
pub fn current() -> Option<Locale> {
    CURRENT_LOCALE.with(|slot| slot.borrow().clone())
}

/// Returns the ambient locale or `LocaleError::NotSet`.
pub fn require_current() -> Result<Locale, LocaleError> {
    current().ok_or(LocaleError::NotSet)
}

/// Sets the ambient locale for the calling thread until changed again.
pub fn set_current(locale: Option<Locale>) {
    CURRENT_LOCALE.with(|slot| *slot.borrow_mut() = locale);
}

/// Runs `f` with `locale` as the ambient locale, then restores the previous one.
pub fn with_locale<T>(locale: &Locale, f: impl FnOnce() -> T) -> T {
    struct Restore(Option<Locale>);

    impl Drop for Restore {
        fn drop(&mut self) {
            set_current(self.0.take());
        }
    }

    let _restore = Restore(CURRENT_LOCALE.with(|slot| slot.replace(Some(locale.clone()))));
    f()
}
