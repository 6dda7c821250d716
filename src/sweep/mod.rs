//! Sweep engine
//!
//! The registry of resource types, the scan parameter/gate machinery, the
//! resource lifecycle traits and the orchestrator that drives them.

pub mod error;
pub mod params;
pub mod registry;
pub mod report;
pub mod resource;
pub mod settings;
pub mod sweeper;

pub use error::{ConfigError, SkipReason, SweepError, Veto};
pub use params::{Location, ScanParams, ScanScope};
pub use registry::{OwnerScope, Registration, Registry, RegistryBuilder};
pub use report::{Outcome, ResourceEntry, SweepReport};
pub use resource::{Capabilities, Lister, Resource};
pub use settings::{SettingValue, Settings};
pub use sweeper::{locations_from, SweepOptions, Sweeper};
