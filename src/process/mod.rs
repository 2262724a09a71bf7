//! Process lifecycle management
//! Groups every spawned process so the whole tree dies with the launcher,
//! and watches the service for unexpected exits

pub mod group;
pub mod outcome;
pub mod supervisor;

pub use group::ProcessGroup;
pub use outcome::{LaunchOutcome, ProcessRole};
pub use supervisor::{SupervisedProcess, Supervisor};
