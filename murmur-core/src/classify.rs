//! Engine error classification.
//!
//! | Code | Class | Message |
//! |------|-------|---------|
//! | `no-speech`, `aborted` | soft | none |
//! | `not-allowed`, `service-not-allowed` | fatal | permission guidance |
//! | anything else | fatal | generic retry |
//!
//! Every class ends the session; only fatal ones surface a message.

use crate::engine::EngineErrorCode;

/// Shown when an engine error is not otherwise recognised, and when
/// activation fails synchronously.
pub const GENERIC_ERROR_MESSAGE: &str = "We hit a hiccup with the mic. Please try again.";

/// Shown by `start()` on hosts without a recognition engine.
pub const UNSUPPORTED_MESSAGE: &str = "Voice input isn't supported in this environment.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Session simply stops. No message.
    Soft,
    /// Session stops and a message is surfaced.
    Fatal(FatalKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalKind {
    PermissionDenied,
    Generic,
}

impl FatalKind {
    /// User-facing message. `host_label` names where access is granted
    /// (e.g. "browser", "system").
    pub fn message(self, host_label: &str) -> String {
        match self {
            FatalKind::PermissionDenied => permission_message(host_label),
            FatalKind::Generic => GENERIC_ERROR_MESSAGE.to_string(),
        }
    }
}

pub fn permission_message(host_label: &str) -> String {
    format!("Microphone permission was blocked. Please allow access in your {host_label} settings.")
}

pub fn classify(code: &EngineErrorCode) -> ErrorClass {
    match code {
        EngineErrorCode::NoSpeech | EngineErrorCode::Aborted => ErrorClass::Soft,
        EngineErrorCode::NotAllowed | EngineErrorCode::ServiceNotAllowed => {
            ErrorClass::Fatal(FatalKind::PermissionDenied)
        }
        EngineErrorCode::AudioCapture
        | EngineErrorCode::Network
        | EngineErrorCode::LanguageNotSupported
        | EngineErrorCode::Other(_) => ErrorClass::Fatal(FatalKind::Generic),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_and_abort_are_soft() {
        assert_eq!(classify(&EngineErrorCode::NoSpeech), ErrorClass::Soft);
        assert_eq!(classify(&EngineErrorCode::Aborted), ErrorClass::Soft);
    }

    #[test]
    fn permission_codes_are_fatal_with_guidance() {
        for code in [EngineErrorCode::NotAllowed, EngineErrorCode::ServiceNotAllowed] {
            assert_eq!(classify(&code), ErrorClass::Fatal(FatalKind::PermissionDenied));
        }
        assert_eq!(
            FatalKind::PermissionDenied.message("browser"),
            "Microphone permission was blocked. Please allow access in your browser settings."
        );
    }

    #[test]
    fn unknown_codes_fall_back_to_generic() {
        let code = EngineErrorCode::from("something-new");
        assert_eq!(classify(&code), ErrorClass::Fatal(FatalKind::Generic));
        assert_eq!(FatalKind::Generic.message("system"), GENERIC_ERROR_MESSAGE);
    }
}
