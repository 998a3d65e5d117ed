pub mod bridge;
pub mod save;

pub use bridge::{Bridge, BridgeError, BridgeState, Outcome, PluginMessage};
pub use save::{HttpSceneSink, SaveConfig, SaveResponse, SceneSink};
