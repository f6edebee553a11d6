//! Message sink boundary.

use crate::rules::DisplaySpec;

/// A composed notification, ready for display.
///
/// Templates have already been resolved; the sink only renders.
#[derive(Clone, Debug, PartialEq)]
pub struct Notice {
    /// Name of the rule that produced this notice.
    pub rule: String,

    /// Resolved title text.
    pub title: String,

    /// Resolved message text. May contain real line breaks.
    pub message: String,

    /// How the host should display the notice.
    pub display: DisplaySpec,
}

/// Output boundary implemented by the host.
///
/// The engine calls `deliver` once per dispatched rule, on the host loop.
/// Implementations must not call back into the engine synchronously; the
/// engine core is borrowed for the duration of the call.
pub trait MessageSink {
    /// Display a composed notice.
    fn deliver(&mut self, notice: Notice);

    /// Open an external link, requested by a rule's `url:` action.
    ///
    /// Hosts without a browser integration can leave the default no-op.
    fn open_url(&mut self, url: &str) {
        tracing::debug!(url, "url action ignored by sink");
    }
}
