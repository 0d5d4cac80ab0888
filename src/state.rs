#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FormStage {
    /// Nothing written yet; the next part opens with a bare boundary line.
    Empty,
    /// At least one part written; the next delimiter starts with CRLF.
    WritingParts,
    Finished,
    /// A write or read failed mid-part; the output is unusable.
    Aborted,
}
