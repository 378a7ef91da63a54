//! The turn orchestrator: an event-driven phase state machine with a
//! single `advance-if-idle` entry point.
//!
//! An external fixed-rate driver calls [`TurnOrchestrator::tick`] once per
//! frame. Each tick either does nothing (paused, or the current phase is
//! still running), or reaps the finished phase and starts the next one in
//! registration order. The sequence loops forever; there is no terminal
//! state. Completion is tracked by the retained task handle -- never by
//! polling the game clock entity -- which avoids the re-entrancy races of
//! chained event listeners.
//!
//! Failure semantics: an error or panic inside a phase action is caught at
//! the tick boundary, logged, and the phase is marked complete anyway. The
//! loop must never deadlock on a single failing phase.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};
use weald_types::TurnPhase;

use crate::pause::PauseSignal;

/// Error raised by a phase action.
///
/// Phase actions aggregate many per-agent steps; by the time an error
/// reaches the orchestrator it is only good for logging, so this is a
/// message-carrying wrapper rather than a taxonomy.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct PhaseError {
    /// Description of what failed.
    message: String,
}

impl PhaseError {
    /// Wrap a failure description.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<crate::store::StoreError> for PhaseError {
    fn from(e: crate::store::StoreError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<crate::ops::QueueError> for PhaseError {
    fn from(e: crate::ops::QueueError) -> Self {
        Self::new(e.to_string())
    }
}

/// One phase's worth of work.
///
/// Actions must be safe to invoke repeatedly (the cycle loops forever) and
/// are guaranteed single-execution-at-a-time by the orchestrator. Long
/// actions should check the pause signal at their top: a pause that lands
/// mid-phase lets the in-flight action finish, then skips subsequent ticks.
#[async_trait]
pub trait PhaseAction: Send + Sync {
    /// Execute the phase once.
    async fn run(&self) -> Result<(), PhaseError>;
}

/// What a single [`tick`](TurnOrchestrator::tick) call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The world is paused; nothing ran and nothing advanced.
    Paused,
    /// The current phase action is still running; nothing advanced.
    Busy,
    /// A phase action was started.
    Started(TurnPhase),
    /// No phases are registered.
    Idle,
}

/// A currently running phase action.
struct InFlight {
    /// Which phase is running.
    phase: TurnPhase,
    /// The spawned action task.
    handle: JoinHandle<Result<(), PhaseError>>,
}

/// The looping, phase-based turn state machine.
///
/// Phases are traversed in registration order, forever. At most one phase
/// action runs at a time per orchestrator (and thus per world).
pub struct TurnOrchestrator {
    /// Registered phases, in traversal order.
    phases: Vec<(TurnPhase, Arc<dyn PhaseAction>)>,
    /// Index of the phase to start next.
    next_index: usize,
    /// The running phase action, if any.
    in_flight: Option<InFlight>,
    /// The global pause flag, checked at the top of every tick.
    pause: Arc<PauseSignal>,
}

impl TurnOrchestrator {
    /// Create an orchestrator with no phases registered.
    pub fn new(pause: Arc<PauseSignal>) -> Self {
        Self {
            phases: Vec::new(),
            next_index: 0,
            in_flight: None,
            pause,
        }
    }

    /// Register a phase action. Phases run in registration order.
    pub fn register_phase(&mut self, phase: TurnPhase, action: Arc<dyn PhaseAction>) {
        debug!(phase = phase.as_str(), "phase registered");
        self.phases.push((phase, action));
    }

    /// The phase currently in flight, if any.
    pub fn current_phase(&self) -> Option<TurnPhase> {
        self.in_flight.as_ref().map(|f| f.phase)
    }

    /// Advance the state machine if it is idle.
    ///
    /// Called once per external frame. Skips entirely while paused; does
    /// nothing while the current phase action is still running; otherwise
    /// reaps the finished action and starts the next phase.
    pub async fn tick(&mut self) -> TickOutcome {
        if self.pause.is_paused() {
            trace!("tick skipped: world is paused");
            return TickOutcome::Paused;
        }

        if let Some(in_flight) = &self.in_flight {
            if !in_flight.handle.is_finished() {
                trace!(phase = in_flight.phase.as_str(), "tick no-op: phase still running");
                return TickOutcome::Busy;
            }
        }

        if let Some(finished) = self.in_flight.take() {
            let phase = finished.phase;
            match finished.handle.await {
                Ok(Ok(())) => debug!(phase = phase.as_str(), "phase completed"),
                Ok(Err(e)) => warn!(
                    phase = phase.as_str(),
                    error = %e,
                    "phase action failed; marking phase complete"
                ),
                Err(e) => warn!(
                    phase = phase.as_str(),
                    error = %e,
                    "phase action panicked or was cancelled; marking phase complete"
                ),
            }
            let len = self.phases.len().max(1);
            self.next_index = self
                .next_index
                .saturating_add(1)
                .checked_rem(len)
                .unwrap_or(0);
        }

        let Some((phase, action)) = self.phases.get(self.next_index) else {
            return TickOutcome::Idle;
        };
        let phase = *phase;
        let action = Arc::clone(action);
        let handle = tokio::spawn(async move { action.run().await });
        self.in_flight = Some(InFlight { phase, handle });
        debug!(phase = phase.as_str(), "phase started");
        TickOutcome::Started(phase)
    }
}

impl core::fmt::Debug for TurnOrchestrator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TurnOrchestrator")
            .field("phase_count", &self.phases.len())
            .field("next_index", &self.next_index)
            .field("in_flight", &self.current_phase())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use tokio::sync::Notify;

    use super::*;

    /// Records each run into a shared log; optionally fails or blocks.
    struct RecordingAction {
        name: TurnPhase,
        log: Arc<Mutex<Vec<TurnPhase>>>,
        fail: bool,
        gate: Option<Arc<Notify>>,
    }

    #[async_trait]
    impl PhaseAction for RecordingAction {
        async fn run(&self) -> Result<(), PhaseError> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.log.lock().unwrap().push(self.name);
            if self.fail {
                return Err(PhaseError::new("intentional test failure"));
            }
            Ok(())
        }
    }

    fn recording_orchestrator(
        pause: Arc<PauseSignal>,
        failing: Option<TurnPhase>,
    ) -> (TurnOrchestrator, Arc<Mutex<Vec<TurnPhase>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut orchestrator = TurnOrchestrator::new(pause);
        for phase in [
            TurnPhase::Act,
            TurnPhase::Execute,
            TurnPhase::Resolve,
            TurnPhase::TurnEnd,
        ] {
            orchestrator.register_phase(
                phase,
                Arc::new(RecordingAction {
                    name: phase,
                    log: Arc::clone(&log),
                    fail: failing == Some(phase),
                    gate: None,
                }),
            );
        }
        (orchestrator, log)
    }

    /// Tick until `count` phase actions have recorded themselves.
    async fn drive_until(
        orchestrator: &mut TurnOrchestrator,
        log: &Arc<Mutex<Vec<TurnPhase>>>,
        count: usize,
    ) {
        for _ in 0..1_000 {
            let _ = orchestrator.tick().await;
            tokio::time::sleep(Duration::from_millis(1)).await;
            if log.lock().unwrap().len() >= count {
                return;
            }
        }
        assert!(
            log.lock().unwrap().len() >= count,
            "phases did not complete in time"
        );
    }

    #[tokio::test]
    async fn phases_run_in_registration_order_and_loop() {
        let pause = Arc::new(PauseSignal::default());
        let (mut orchestrator, log) = recording_orchestrator(pause, None);

        drive_until(&mut orchestrator, &log, 6).await;

        let recorded = log.lock().unwrap().clone();
        let expected = [
            TurnPhase::Act,
            TurnPhase::Execute,
            TurnPhase::Resolve,
            TurnPhase::TurnEnd,
            TurnPhase::Act,
            TurnPhase::Execute,
        ];
        assert_eq!(&recorded[..6], &expected);
    }

    #[tokio::test]
    async fn tick_is_noop_while_phase_running() {
        let pause = Arc::new(PauseSignal::default());
        let log = Arc::new(Mutex::new(Vec::new()));
        let gate = Arc::new(Notify::new());

        let mut orchestrator = TurnOrchestrator::new(pause);
        orchestrator.register_phase(
            TurnPhase::Act,
            Arc::new(RecordingAction {
                name: TurnPhase::Act,
                log: Arc::clone(&log),
                fail: false,
                gate: Some(Arc::clone(&gate)),
            }),
        );

        assert_eq!(
            orchestrator.tick().await,
            TickOutcome::Started(TurnPhase::Act)
        );
        // The action is blocked on the gate; further ticks are no-ops.
        assert_eq!(orchestrator.tick().await, TickOutcome::Busy);
        assert_eq!(orchestrator.tick().await, TickOutcome::Busy);
        assert!(log.lock().unwrap().is_empty());

        gate.notify_one();
        drive_until(&mut orchestrator, &log, 1).await;
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn paused_ticks_do_nothing() {
        let pause = Arc::new(PauseSignal::new(true));
        let (mut orchestrator, log) = recording_orchestrator(Arc::clone(&pause), None);

        for _ in 0..5 {
            assert_eq!(orchestrator.tick().await, TickOutcome::Paused);
        }
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(orchestrator.current_phase(), None);

        // Resuming lets the cycle start from the first phase.
        pause.resume();
        drive_until(&mut orchestrator, &log, 1).await;
        assert_eq!(log.lock().unwrap().first(), Some(&TurnPhase::Act));
    }

    #[tokio::test]
    async fn failing_phase_still_advances() {
        let pause = Arc::new(PauseSignal::default());
        let (mut orchestrator, log) =
            recording_orchestrator(pause, Some(TurnPhase::Execute));

        drive_until(&mut orchestrator, &log, 5).await;

        let recorded = log.lock().unwrap().clone();
        // EXECUTE failed but the cycle continued through RESOLVE, TURN_END
        // and wrapped back to ACT.
        let expected = [
            TurnPhase::Act,
            TurnPhase::Execute,
            TurnPhase::Resolve,
            TurnPhase::TurnEnd,
            TurnPhase::Act,
        ];
        assert_eq!(&recorded[..5], &expected);
    }

    #[tokio::test]
    async fn no_phases_means_idle() {
        let pause = Arc::new(PauseSignal::default());
        let mut orchestrator = TurnOrchestrator::new(pause);
        assert_eq!(orchestrator.tick().await, TickOutcome::Idle);
    }
}
