//! Test harness utilities shared by the unit and behavioural suites.

mod config_loader;
mod credentials;
mod providers;
mod reporter;
mod world;

pub use config_loader::{ArgsConfigLoader, FailingConfigLoader, TestConfigLoader};
pub use credentials::{SelfSignedPem, TextLoader, fingerprint, handshake, install, wait_until};
pub use providers::{COUNTING_DATABASE, CountingDatabase, registry_with_database};
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use world::{TestWorld, world};
