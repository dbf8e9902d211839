//! An append-only diagnostics log accumulated during a parse.

use std::fmt::Display;

use derive_more::Display;

/// An append-only log of diagnostics accumulated while parsing one input.
///
/// Parsers treat the sink as write-only: entries are appended with a tag identifying which track/box/field raised
/// them, and never inspected again. A caller can enumerate every diagnostic for a failed parse even though only the
/// first error is returned as the call's result.
#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
    error_count: u64,
}

/// A single diagnostic entry.
#[derive(Clone, Debug, Display, PartialEq, Eq)]
#[display(fmt = "{severity}: {tag}: {message}")]
pub struct Diagnostic {
    /// The severity of the diagnostic.
    pub severity: Severity,

    /// A tag identifying which track/box/field raised the diagnostic.
    pub tag: String,

    /// The diagnostic message.
    pub message: String,
}

/// The severity of a [`Diagnostic`].
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// An informational note.
    #[display(fmt = "info")]
    Info,

    /// A recoverable oddity in the input.
    #[display(fmt = "warning")]
    Warning,

    /// A hard parse failure.
    #[display(fmt = "error")]
    Error,
}

impl Diagnostics {
    /// Construct a new, empty `Diagnostics`.
    pub fn new() -> Self {
        Default::default()
    }

    /// Append an error-severity diagnostic and increment the error counter.
    pub fn log_error<T: Display, M: Display>(&mut self, tag: T, message: M) {
        self.error_count += 1;
        self.log(Severity::Error, tag, message);
    }

    /// Append a warning-severity diagnostic.
    pub fn log_warning<T: Display, M: Display>(&mut self, tag: T, message: M) {
        self.log(Severity::Warning, tag, message);
    }

    /// Append an info-severity diagnostic.
    pub fn log_info<T: Display, M: Display>(&mut self, tag: T, message: M) {
        self.log(Severity::Info, tag, message);
    }

    /// Return the accumulated diagnostics, in append order.
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Return the number of error-severity diagnostics appended so far.
    pub fn error_count(&self) -> u64 {
        self.error_count
    }

    fn log<T: Display, M: Display>(&mut self, severity: Severity, tag: T, message: M) {
        let entry = Diagnostic { severity, tag: tag.to_string(), message: message.to_string() };
        match severity {
            Severity::Error => log::error!("{entry}"),
            Severity::Warning => log::warn!("{entry}"),
            Severity::Info => log::info!("{entry}"),
        }
        self.entries.push(entry);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn error_count_tracks_errors_only() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.log_info("moov", "box found");
        diagnostics.log_warning("trak[0]", "odd but recoverable");
        diagnostics.log_error("trak[0]/mdhd", "invalid box version");
        diagnostics.log_error("trak[1]/stts", "invalid entry count");

        assert_eq!(diagnostics.error_count(), 2);
        assert_eq!(diagnostics.entries().len(), 4);
        assert_eq!(diagnostics.entries()[2].severity, Severity::Error);
        assert_eq!(diagnostics.entries()[2].tag, "trak[0]/mdhd");
    }
}
