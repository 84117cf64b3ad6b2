use crate::error::Result;

use super::events::ScenarioEntry;

/// A source of scenario entries: a trace file reader or a synthetic
/// generator. The simulation consumes plain entries, so sources stay outside
/// the event loop entirely.
pub trait ScenarioSource {
    fn entries(&mut self) -> Result<Vec<ScenarioEntry>>;

    /// Expected number of entries, when the source knows it up front.
    fn size_hint(&self) -> Option<u64> {
        None
    }
}
