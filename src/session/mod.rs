// src/session/mod.rs — Walk session engine

pub mod clock;
pub mod engine;
pub mod persist;
pub mod trail;
pub mod types;

pub use engine::{spawn_engine, EngineDeps, EngineHandle, EngineSettings, EngineSnapshot};
pub use trail::MIN_FIX_DISTANCE_M;
pub use types::{LiveStats, Phase, SaveReport, SaveState, SessionId, SessionStatus, WalkMoment, WalkSession};
