pub mod env;

pub use env::{EnvConfig, StepOutcome, SynthEnv, SynthEnvAction, TaskSource};
