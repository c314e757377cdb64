pub mod clock;
pub mod controller;
pub mod events;
pub mod input;
pub mod sequencer;
pub mod view;

pub use clock::{Entropy, SeededEntropy, Timers};
pub use controller::{ControllerSnapshot, DEFAULT_SEED, EnvironmentController};
pub use events::SimEvent;
pub use input::InputEvent;
pub use sequencer::{
    Advance, FailurePolicy, RunOutcome, RunStatus, SequenceStep, Sequencer, SimulationSettings,
};
pub use view::{MAX_SCALE, MIN_SCALE, ViewTransform, ViewTransport};
