//! Card state machine
//!
//! ```text
//! Loading ──ok──▶ Loaded ──cluster change──▶ Loading
//!    │                                          ▲
//!    └──err──▶ Failed ──cluster change / retry──┘
//! ```
//!
//! Every fetch is issued with a [`FetchTicket`]. Only the ticket of the most
//! recent fetch can resolve the state; a response for an abandoned fetch is
//! dropped.

use crate::error::FetchError;
use crate::lag::FilteredResult;

/// What the card is currently showing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Loading,
    Loaded(FilteredResult),
    Failed(FetchError),
}

/// Identifies one fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
    cluster_index: usize,
}

impl FetchTicket {
    pub fn cluster_index(&self) -> usize {
        self.cluster_index
    }
}

/// State owned by one card instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetState {
    phase: Phase,
    selected_cluster: usize,
    cluster_count: usize,
    generation: u64,
}

impl WidgetState {
    /// Initial state: loading the first cluster
    pub fn new(cluster_count: usize) -> Self {
        Self {
            phase: Phase::Loading,
            selected_cluster: 0,
            cluster_count,
            generation: 0,
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn selected_cluster(&self) -> usize {
        self.selected_cluster
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, Phase::Loading)
    }

    pub fn is_error(&self) -> bool {
        matches!(self.phase, Phase::Failed(_))
    }

    pub fn result(&self) -> Option<&FilteredResult> {
        match &self.phase {
            Phase::Loaded(result) => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match &self.phase {
            Phase::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Enter `Loading` for the selected cluster and issue a new ticket
    ///
    /// Any ticket issued before this one becomes stale.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.generation += 1;
        self.phase = Phase::Loading;
        FetchTicket {
            generation: self.generation,
            cluster_index: self.selected_cluster,
        }
    }

    /// Switch to the cluster at `index`
    ///
    /// Returns the ticket for the new fetch, or `None` when `index` is out of
    /// range or already selected.
    pub fn select_cluster(&mut self, index: usize) -> Option<FetchTicket> {
        if index >= self.cluster_count || index == self.selected_cluster {
            return None;
        }
        self.selected_cluster = index;
        Some(self.begin_fetch())
    }

    /// Re-run the fetch for the current cluster
    pub fn retry(&mut self) -> FetchTicket {
        self.begin_fetch()
    }

    /// Apply a fetch outcome
    ///
    /// Returns `false` and leaves the state untouched when `ticket` is stale.
    pub fn resolve(
        &mut self,
        ticket: FetchTicket,
        outcome: Result<FilteredResult, FetchError>,
    ) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.phase = match outcome {
            Ok(result) => Phase::Loaded(result),
            Err(err) => Phase::Failed(err),
        };
        true
    }

    pub fn is_current(&self, ticket: FetchTicket) -> bool {
        ticket.generation == self.generation && ticket.cluster_index == self.selected_cluster
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lag::LagRow;

    fn rows(items: &[(&str, &str)]) -> FilteredResult {
        items
            .iter()
            .map(|(topic, lag)| LagRow {
                group: "team-a".into(),
                topic: topic.to_string(),
                lag: lag.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_initial_state_is_loading() {
        let state = WidgetState::new(2);
        assert!(state.is_loading());
        assert_eq!(state.selected_cluster(), 0);
    }

    #[test]
    fn test_resolve_ok_loads() {
        let mut state = WidgetState::new(1);
        let ticket = state.begin_fetch();
        assert!(state.resolve(ticket, Ok(rows(&[("t1", "5"), ("t2", "12")]))));
        assert!(!state.is_loading());
        assert!(!state.is_error());
        assert_eq!(state.result().unwrap().len(), 2);
    }

    #[test]
    fn test_resolve_empty_ok_is_loaded() {
        let mut state = WidgetState::new(1);
        let ticket = state.begin_fetch();
        state.resolve(ticket, Ok(FilteredResult::default()));
        assert_eq!(state.phase(), &Phase::Loaded(FilteredResult::default()));
    }

    #[test]
    fn test_resolve_err_fails() {
        let mut state = WidgetState::new(1);
        let ticket = state.begin_fetch();
        state.resolve(ticket, Err(FetchError::Network("refused".into())));
        assert!(state.is_error());
        assert!(state.error().unwrap().is_network());
        assert!(state.result().is_none());
    }

    #[test]
    fn test_cluster_change_reenters_loading() {
        let mut state = WidgetState::new(2);
        let first = state.begin_fetch();
        state.resolve(first, Ok(rows(&[("t1", "5")])));

        let second = state.select_cluster(1).unwrap();
        assert!(state.is_loading());
        assert_eq!(second.cluster_index(), 1);
    }

    #[test]
    fn test_stale_response_is_discarded() {
        let mut state = WidgetState::new(2);
        let first = state.begin_fetch();
        let second = state.select_cluster(1).unwrap();

        // First cluster answers after the switch
        assert!(!state.resolve(first, Ok(rows(&[("stale", "1")]))));
        assert!(state.is_loading());

        assert!(state.resolve(second, Ok(rows(&[("fresh", "2")]))));
        assert_eq!(state.result().unwrap().rows()[0].topic, "fresh");
    }

    #[test]
    fn test_stale_response_after_switch_back_is_discarded() {
        let mut state = WidgetState::new(2);
        let first = state.begin_fetch();
        state.select_cluster(1).unwrap();
        let third = state.select_cluster(0).unwrap();

        // Same cluster index as the current selection, older generation
        assert!(!state.resolve(first, Err(FetchError::Network("late".into()))));
        assert!(state.resolve(third, Ok(rows(&[("t", "1")]))));
    }

    #[test]
    fn test_select_out_of_range_or_same_is_ignored() {
        let mut state = WidgetState::new(2);
        let ticket = state.begin_fetch();
        assert!(state.select_cluster(5).is_none());
        assert!(state.select_cluster(0).is_none());
        assert!(state.is_current(ticket));
    }

    #[test]
    fn test_retry_from_error() {
        let mut state = WidgetState::new(1);
        let ticket = state.begin_fetch();
        state.resolve(ticket, Err(FetchError::Parse("bad".into())));

        let retry = state.retry();
        assert!(state.is_loading());
        assert!(!state.is_current(ticket));
        assert!(state.resolve(retry, Ok(rows(&[("t", "1")]))));
    }
}
