pub mod buffer;
pub mod config;
pub mod controller;
pub mod error;
pub mod export;
pub mod factory;
pub mod source;

pub use buffer::{SampleBuffer, Snapshot};
pub use config::{ConfigOption, ConfigSchema, OptionKind, SourceConfig};
pub use controller::{AcquisitionController, ControllerState, SourceRunner};
pub use error::ScopeError;
pub use export::save_csv;
pub use factory::SourceRegistration;
pub use source::{DataSource, RampSource, SampleBlock};
