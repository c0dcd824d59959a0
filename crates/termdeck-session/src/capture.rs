//! Bounded text capture from the start or end of a session.
//!
//! Budgets count characters (Unicode scalar values), not bytes.

/// Which end of the content a capture is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureEdge {
    /// Earliest lines of the visible screen; overflow dropped from the end
    Head,
    /// Latest lines of the session; overflow dropped from the start
    Tail,
}

/// Line range `[from, to)` for a capture.
///
/// `total` is the number of logical lines and `viewport_start` the first
/// visible one.
pub fn line_window(
    edge: CaptureEdge,
    total: usize,
    viewport_start: usize,
    line_count: usize,
) -> (usize, usize) {
    match edge {
        CaptureEdge::Tail => (total.saturating_sub(line_count), total),
        CaptureEdge::Head => {
            let from = viewport_start.min(total);
            (from, from.saturating_add(line_count).min(total))
        }
    }
}

/// Apply a character budget, dropping from the side opposite to `edge`.
pub fn apply_budget(text: &str, edge: CaptureEdge, max_chars: usize) -> String {
    let len = text.chars().count();
    if len <= max_chars {
        return text.to_string();
    }

    match edge {
        CaptureEdge::Tail => text.chars().skip(len - max_chars).collect(),
        CaptureEdge::Head => text.chars().take(max_chars).collect(),
    }
}
