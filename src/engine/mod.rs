pub mod drill;
pub mod recovery;
pub mod writing;

pub use drill::{DrillEngine, DrillState, RewindCue, RewindKind, SectionRun, Transition};
pub use recovery::{RECOVERY_PASSES, Recovery, Window};
pub use writing::{CharStatus, CheckOutcome, ReadingCue, WritingSession};
