/// Display surface fed by a session.
///
/// Implementations keep the newest content in view after every call.
pub trait TranscriptSink {
    /// Replace everything shown with `text`.
    fn replace(&mut self, text: &str);

    /// Show `delta` after what is already shown. Called once per streamed
    /// content fragment, as it arrives.
    fn append(&mut self, delta: &str);
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl TranscriptSink for NullSink {
    fn replace(&mut self, _text: &str) {}

    fn append(&mut self, _delta: &str) {}
}
