use thiserror::Error;

// Re-export a simple Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Domain-specific error set for the scheduling engine.
#[derive(Error, Debug)]
pub enum Error {
    // ---- Time ---------------------------------------------------------------
    /// The workspace timezone string is not a resolvable IANA identifier.
    /// Fatal to a run; surfaced before any placement begins.
    #[error("Unknown timezone: '{name}'. Expected an IANA identifier such as 'Asia/Bangkok'.")]
    InvalidTimezone { name: String },

    // ---- Input validation ---------------------------------------------------
    /// Malformed availability data, inverted time blocks, zero durations, etc.
    /// Raised before placement; never mid-run.
    #[error("Validation error: {0}")]
    Validation(String),

    // ---- Scheduling / Domain ------------------------------------------------
    /// A single habit occurrence or task found no capacity anywhere in the
    /// window. Recovered per item by the orchestrator; never aborts a run.
    #[error("No available slot for {kind} '{name}' within the scheduling window.")]
    NoAvailableSlot { kind: &'static str, name: String },

    // ---- Live-mode I/O ------------------------------------------------------
    /// A calendar storage call failed. The affected item is logged and
    /// skipped; the run continues for all other items.
    #[error("Storage error: {0}")]
    Storage(String),

    // ---- Plumbing / Wrappers ------------------------------------------------
    /// IO passthrough (log files, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serde JSON passthrough (availability settings decode/encode).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ----------------------- Convenience constructors ----------------------------

impl Error {
    /// Helper to create a validation error from any displayable value.
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Error::Validation(msg.into())
    }

    /// Helper to create a storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        Error::Storage(msg.into())
    }

    /// Helper for an unresolvable timezone identifier.
    pub fn invalid_timezone<S: Into<String>>(name: S) -> Self {
        Error::InvalidTimezone { name: name.into() }
    }

    pub fn no_slot(kind: &'static str, name: impl Into<String>) -> Self {
        Error::NoAvailableSlot {
            kind,
            name: name.into(),
        }
    }
}

// ----------------------- Small result helpers --------------------------------

/// Map an `Option<T>` into `Result<T, Error::Validation>` with a custom message.
pub fn require<T, S: Into<String>>(opt: Option<T>, msg: S) -> Result<T> {
    opt.ok_or_else(|| Error::Validation(msg.into()))
}
