pub mod bridge;
pub mod channel;
pub mod config;
pub mod ui;

pub use bridge::{ChromeProcess, ContentProcess, InProcessBridge};
pub use channel::{ChildPipe, InProcessBroker, ParentPipe};
pub use config::{ConfigError, PaymentsConfig};
pub use ui::{DeterministicUi, ManualUi, UiCall};
