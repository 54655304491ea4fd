use tracing::{debug, info, warn};

use crate::content::{Section, SutraInfo};
use crate::engine::recovery::{Recovery, Window};
use crate::store::{DrillProgress, ProgressStore, WritingProgress};

/// Number of preceding sections shown as context above the current one.
pub const CONTEXT_SECTIONS: usize = 4;

/// The section being drilled and whether its answer is showing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SectionRun {
    pub section_id: usize,
    pub revealed: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrillState {
    Idle,
    Presenting,
    Revealed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RewindKind {
    /// A miss sent the run back to the start of a window.
    Fail,
    /// A clean pass finished but more passes are required.
    Success,
}

/// Signals the view to play a rewind animation. `generation` increases on
/// every rewind so two cues of the same kind are still distinguishable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RewindCue {
    pub kind: RewindKind,
    pub generation: u64,
}

/// What an `assess` call did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// No active revealed run; nothing changed.
    Ignored,
    Advanced { to: usize },
    /// The last section was passed; the engine is idle again.
    Completed,
    RecoveryStarted { target: usize },
    WindowStep { to: usize },
    Retargeted { target: usize },
    PassCompleted { passes_left: u32 },
    PassRestarted,
    RecoveryCleared { to: usize },
}

pub struct DrillEngine {
    sutra: SutraInfo,
    store: ProgressStore,
    progress: DrillProgress,
    writing: WritingProgress,
    run: Option<SectionRun>,
    recovery: Option<Recovery>,
    window_cursor: usize,
    rewind: Option<RewindCue>,
    rewind_generation: u64,
}

impl DrillEngine {
    pub fn new(sutra: SutraInfo, store: ProgressStore) -> Self {
        let progress = store
            .load_drill(&sutra.id)
            .clamped(sutra.total_sections());
        let writing = store.load_writing(&sutra.id);
        debug!(
            sutra = %sutra.id,
            frontier = progress.frontier,
            written = writing.len(),
            "drill engine ready"
        );
        Self {
            sutra,
            store,
            progress,
            writing,
            run: None,
            recovery: None,
            window_cursor: 0,
            rewind: None,
            rewind_generation: 0,
        }
    }

    pub fn sutra(&self) -> &SutraInfo {
        &self.sutra
    }

    pub fn store(&self) -> &ProgressStore {
        &self.store
    }

    /// Switch to another sutra over the same store. Any run is discarded.
    pub fn load_sutra(&mut self, sutra: SutraInfo) {
        self.progress = self
            .store
            .load_drill(&sutra.id)
            .clamped(sutra.total_sections());
        self.writing = self.store.load_writing(&sutra.id);
        info!(sutra = %sutra.id, frontier = self.progress.frontier, "switched sutra");
        self.sutra = sutra;
        self.go_home();
    }

    pub fn progress(&self) -> DrillProgress {
        self.progress
    }

    pub fn total_sections(&self) -> usize {
        self.sutra.total_sections()
    }

    pub fn run(&self) -> Option<SectionRun> {
        self.run
    }

    pub fn recovery(&self) -> Option<Recovery> {
        self.recovery
    }

    pub fn rewind_cue(&self) -> Option<RewindCue> {
        self.rewind
    }

    pub fn window(&self) -> Option<Window> {
        self.recovery.map(|r| r.window())
    }

    pub fn window_cursor(&self) -> usize {
        self.window_cursor
    }

    pub fn writing_progress(&self) -> &WritingProgress {
        &self.writing
    }

    pub fn state(&self) -> DrillState {
        match self.run {
            None => DrillState::Idle,
            Some(SectionRun {
                revealed: false, ..
            }) => DrillState::Presenting,
            Some(SectionRun { revealed: true, .. }) => DrillState::Revealed,
        }
    }

    /// The run's section, or the frontier section when idle.
    pub fn current_section(&self) -> Option<&Section> {
        let index = self
            .run
            .map_or(self.progress.frontier, |run| run.section_id);
        self.sutra.sections.get(index)
    }

    /// Up to [`CONTEXT_SECTIONS`] sections immediately before the run.
    pub fn previous_sections(&self) -> &[Section] {
        match self.run {
            Some(run) => {
                let start = run.section_id.saturating_sub(CONTEXT_SECTIONS);
                &self.sutra.sections[start..run.section_id]
            }
            None => &[],
        }
    }

    /// Fraction of the sutra behind the frontier, for progress bars.
    pub fn frontier_ratio(&self) -> f64 {
        let last = self.total_sections().saturating_sub(1);
        if last == 0 {
            return 0.0;
        }
        self.progress.frontier as f64 / last as f64
    }

    /// Begin a run. Without an index the run starts at section 0; starting
    /// from the frontier is the caller's choice. Indices past the end are
    /// clamped to the last section.
    pub fn start_drill(&mut self, start_index: Option<usize>) {
        let total = self.total_sections();
        if total == 0 {
            warn!(sutra = %self.sutra.id, "cannot start a drill over empty content");
            return;
        }
        let requested = start_index.unwrap_or(0);
        let section_id = requested.min(total - 1);
        if section_id != requested {
            warn!(requested, clamped = section_id, "start index out of range");
        }

        self.recovery = None;
        self.window_cursor = 0;
        self.rewind = None;
        self.run = Some(SectionRun {
            section_id,
            revealed: false,
        });
        info!(sutra = %self.sutra.id, section = section_id, "drill started");
    }

    /// Show the answer. Returns false when there was nothing to reveal.
    pub fn reveal(&mut self) -> bool {
        match self.run.as_mut() {
            Some(run) if !run.revealed => {
                run.revealed = true;
                debug!(section = run.section_id, "revealed");
                true
            }
            Some(run) => {
                debug!(section = run.section_id, "reveal ignored, already revealed");
                false
            }
            None => {
                debug!("reveal ignored, no active run");
                false
            }
        }
    }

    pub fn assess(&mut self, got_it: bool) -> Transition {
        let Some(run) = self.run else {
            warn!(got_it, "assess ignored, no active run");
            return Transition::Ignored;
        };
        if !run.revealed {
            warn!(section = run.section_id, got_it, "assess ignored, answer not revealed");
            return Transition::Ignored;
        }

        let transition = match self.recovery {
            None if got_it => self.advance_past(run.section_id),
            None => {
                self.enter_recovery(run.section_id);
                Transition::RecoveryStarted {
                    target: run.section_id,
                }
            }
            Some(recovery) => self.assess_in_recovery(recovery, got_it),
        };
        debug!(section = run.section_id, got_it, ?transition, "assessed");
        transition
    }

    /// Discard the run and any recovery. The frontier is kept.
    pub fn go_home(&mut self) {
        self.run = None;
        self.recovery = None;
        self.window_cursor = 0;
        self.rewind = None;
    }

    /// Forget all progress for this sutra and return to idle.
    pub fn reset_progress(&mut self) {
        self.progress = DrillProgress::default();
        if let Err(e) = self.store.save_drill(&self.sutra.id, &self.progress) {
            warn!(error = %e, "could not persist progress reset");
        }
        self.writing = WritingProgress::default();
        if let Err(e) = self.store.save_writing(&self.sutra.id, &self.writing) {
            warn!(error = %e, "could not persist writing progress reset");
        }
        self.go_home();
        info!(sutra = %self.sutra.id, "progress reset");
    }

    /// Record a section as passed in the handwriting test.
    pub fn mark_written(&mut self, section_id: usize) -> bool {
        if section_id >= self.total_sections() || !self.writing.mark(section_id) {
            return false;
        }
        if let Err(e) = self.store.save_writing(&self.sutra.id, &self.writing) {
            warn!(error = %e, section = section_id, "could not persist writing progress");
        }
        true
    }

    fn assess_in_recovery(&mut self, recovery: Recovery, got_it: bool) -> Transition {
        let window = recovery.window();
        let cursor = self.window_cursor.min(window.len() - 1);

        if !window.is_last(cursor) {
            if got_it {
                self.window_cursor = cursor + 1;
                let to = window.start() + self.window_cursor;
                self.present(to);
                return Transition::WindowStep { to };
            }
            // A miss before the target moves remediation to the weaker section.
            let target = window.start() + cursor;
            info!(from = recovery.target, to = target, "recovery retargeted");
            self.enter_recovery(target);
            return Transition::Retargeted { target };
        }

        if !got_it {
            self.recovery = Some(Recovery {
                passes_left: recovery.passes_total,
                ..recovery
            });
            self.restart_window(window, RewindKind::Fail);
            return Transition::PassRestarted;
        }

        let passes_left = recovery.passes_left.saturating_sub(1);
        if passes_left > 0 {
            self.recovery = Some(Recovery {
                passes_left,
                ..recovery
            });
            self.restart_window(window, RewindKind::Success);
            return Transition::PassCompleted { passes_left };
        }

        info!(target = recovery.target, "recovery cleared");
        self.recovery = None;
        self.window_cursor = 0;
        match self.advance_past(recovery.target) {
            Transition::Advanced { to } => Transition::RecoveryCleared { to },
            other => other,
        }
    }

    fn advance_past(&mut self, section_id: usize) -> Transition {
        let next = section_id + 1;
        if next >= self.total_sections() {
            info!(sutra = %self.sutra.id, "drill complete");
            self.go_home();
            return Transition::Completed;
        }
        self.present(next);
        if next > self.progress.frontier {
            self.persist_frontier(next);
        }
        Transition::Advanced { to: next }
    }

    fn enter_recovery(&mut self, target: usize) {
        let recovery = Recovery::new(target);
        info!(target, passes = recovery.passes_total, "recovery started");
        self.recovery = Some(recovery);
        self.restart_window(recovery.window(), RewindKind::Fail);
    }

    fn restart_window(&mut self, window: Window, kind: RewindKind) {
        self.window_cursor = 0;
        self.present(window.start());
        self.rewind_generation += 1;
        self.rewind = Some(RewindCue {
            kind,
            generation: self.rewind_generation,
        });
    }

    fn present(&mut self, section_id: usize) {
        self.run = Some(SectionRun {
            section_id,
            revealed: false,
        });
    }

    fn persist_frontier(&mut self, frontier: usize) {
        self.progress.frontier = frontier;
        if let Err(e) = self.store.save_drill(&self.sutra.id, &self.progress) {
            warn!(error = %e, frontier, "could not persist frontier");
        } else {
            info!(sutra = %self.sutra.id, frontier, "frontier advanced");
        }
    }
}
