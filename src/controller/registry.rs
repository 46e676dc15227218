//! In-flight search registry - tracks dispatched searches by correlation ID
//!
//! Each correlation ID moves through an explicit lifecycle:
//!
//! ```text
//! Idle ──register──▶ Dispatched ──settle──▶ Resolved | Cancelled | Failed
//! ```
//!
//! Removal from the in-flight map is the single decision point: whichever
//! caller removes the entry owns the outcome, every later caller gets `None`.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::acai::SearchParameters;
use crate::protocol::CorrelationId;

/// How many settled ids are remembered for duplicate detection
const SETTLED_HISTORY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    Idle,
    Dispatched,
    Resolved,
    Cancelled,
    Failed,
}

impl SearchPhase {
    pub fn can_transition_to(self, next: SearchPhase) -> bool {
        matches!(
            (self, next),
            (SearchPhase::Idle, SearchPhase::Dispatched)
                | (SearchPhase::Dispatched, SearchPhase::Resolved)
                | (SearchPhase::Dispatched, SearchPhase::Cancelled)
                | (SearchPhase::Dispatched, SearchPhase::Failed)
        )
    }
}

/// Active search
#[derive(Debug)]
pub struct InFlightSearch {
    pub correlation_id: CorrelationId,
    pub params: SearchParameters,
    pub cancel_token: CancellationToken,
    pub dispatched_at: Instant,
}

#[derive(Default)]
pub struct SearchRegistry {
    in_flight: DashMap<CorrelationId, InFlightSearch>,
    settled: Mutex<VecDeque<(CorrelationId, SearchPhase)>>,
}

impl SearchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current lifecycle phase. Ids settled long ago fall back to `Idle`.
    pub fn phase(&self, correlation_id: &CorrelationId) -> SearchPhase {
        if self.in_flight.contains_key(correlation_id) {
            return SearchPhase::Dispatched;
        }
        self.settled
            .lock()
            .ok()
            .and_then(|settled| {
                settled
                    .iter()
                    .rev()
                    .find(|(id, _)| id == correlation_id)
                    .map(|(_, phase)| *phase)
            })
            .unwrap_or(SearchPhase::Idle)
    }

    /// Idle → Dispatched. On refusal returns the phase the id is already in.
    pub fn register(
        &self,
        correlation_id: CorrelationId,
        params: SearchParameters,
    ) -> Result<CancellationToken, SearchPhase> {
        let current = self.phase(&correlation_id);
        if !current.can_transition_to(SearchPhase::Dispatched) {
            return Err(current);
        }

        match self.in_flight.entry(correlation_id.clone()) {
            Entry::Occupied(_) => Err(SearchPhase::Dispatched),
            Entry::Vacant(slot) => {
                let cancel_token = CancellationToken::new();
                slot.insert(InFlightSearch {
                    correlation_id,
                    params,
                    cancel_token: cancel_token.clone(),
                    dispatched_at: Instant::now(),
                });
                Ok(cancel_token)
            }
        }
    }

    /// Dispatched → `outcome`. Only the first caller for an id gets the entry back.
    pub fn settle(
        &self,
        correlation_id: &CorrelationId,
        outcome: SearchPhase,
    ) -> Option<InFlightSearch> {
        if !SearchPhase::Dispatched.can_transition_to(outcome) {
            log::warn!("Refusing to settle {} as {:?}", correlation_id, outcome);
            return None;
        }

        let (_, entry) = self.in_flight.remove(correlation_id)?;
        self.remember(correlation_id.clone(), outcome);
        Some(entry)
    }

    /// Settle as cancelled and trigger the token. False if the search already settled.
    pub fn cancel(&self, correlation_id: &CorrelationId) -> bool {
        match self.settle(correlation_id, SearchPhase::Cancelled) {
            Some(entry) => {
                entry.cancel_token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel everything in flight (shutdown)
    pub fn cancel_all(&self) -> Vec<CorrelationId> {
        let ids: Vec<CorrelationId> = self
            .in_flight
            .iter()
            .map(|entry| entry.key().clone())
            .collect();

        ids.into_iter().filter(|id| self.cancel(id)).collect()
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_in_flight(&self, correlation_id: &CorrelationId) -> bool {
        self.in_flight.contains_key(correlation_id)
    }

    fn remember(&self, correlation_id: CorrelationId, phase: SearchPhase) {
        if let Ok(mut settled) = self.settled.lock() {
            if settled.len() == SETTLED_HISTORY {
                settled.pop_front();
            }
            settled.push_back((correlation_id, phase));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> CorrelationId {
        CorrelationId::from(raw)
    }

    #[test]
    fn test_lifecycle_resolved() {
        let registry = SearchRegistry::new();
        assert_eq!(registry.phase(&id("1")), SearchPhase::Idle);

        registry.register(id("1"), SearchParameters::default()).unwrap();
        assert_eq!(registry.phase(&id("1")), SearchPhase::Dispatched);

        assert!(registry.settle(&id("1"), SearchPhase::Resolved).is_some());
        assert_eq!(registry.phase(&id("1")), SearchPhase::Resolved);
        assert_eq!(registry.in_flight_count(), 0);
    }

    #[test]
    fn test_first_settle_wins() {
        let registry = SearchRegistry::new();
        let token = registry.register(id("1"), SearchParameters::default()).unwrap();

        assert!(registry.cancel(&id("1")));
        assert!(token.is_cancelled());

        // A late success for the same id is discarded
        assert!(registry.settle(&id("1"), SearchPhase::Resolved).is_none());
        assert!(!registry.cancel(&id("1")));
        assert_eq!(registry.phase(&id("1")), SearchPhase::Cancelled);
    }

    #[test]
    fn test_duplicate_registration_refused() {
        let registry = SearchRegistry::new();
        registry.register(id("1"), SearchParameters::default()).unwrap();
        assert_eq!(
            registry.register(id("1"), SearchParameters::default()).unwrap_err(),
            SearchPhase::Dispatched
        );

        registry.settle(&id("1"), SearchPhase::Failed);
        assert_eq!(
            registry.register(id("1"), SearchParameters::default()).unwrap_err(),
            SearchPhase::Failed
        );
    }

    #[test]
    fn test_settle_rejects_non_terminal_outcome() {
        let registry = SearchRegistry::new();
        registry.register(id("1"), SearchParameters::default()).unwrap();
        assert!(registry.settle(&id("1"), SearchPhase::Dispatched).is_none());
        assert!(registry.is_in_flight(&id("1")));
    }

    #[test]
    fn test_cancel_all() {
        let registry = SearchRegistry::new();
        let a = registry.register(id("a"), SearchParameters::default()).unwrap();
        let b = registry.register(id("b"), SearchParameters::default()).unwrap();
        let mut cancelled = registry.cancel_all();
        cancelled.sort();
        assert_eq!(cancelled, vec![id("a"), id("b")]);
        assert!(a.is_cancelled() && b.is_cancelled());
        assert_eq!(registry.in_flight_count(), 0);
    }

    #[test]
    fn test_transition_table() {
        assert!(SearchPhase::Idle.can_transition_to(SearchPhase::Dispatched));
        assert!(!SearchPhase::Idle.can_transition_to(SearchPhase::Resolved));
        assert!(!SearchPhase::Resolved.can_transition_to(SearchPhase::Cancelled));
        assert!(!SearchPhase::Failed.can_transition_to(SearchPhase::Dispatched));
        assert!(SearchPhase::Dispatched.can_transition_to(SearchPhase::Failed));
    }
}
