//! macOS LaunchAgent management
//!
//! Renders the snap_tool property list from its template, writes it into the
//! user's LaunchAgents directory and registers it with launchd.
//!
//! - [`LaunchAgentConfig`]: label, paths and template selection
//! - [`LaunchAgent`]: render / install / uninstall / status
//! - [`ServiceManager`]: the launchd seam, with [`Launchctl`] for the real
//!   system and [`MockServiceManager`] for tests

mod agent;
mod config;
pub mod mock;
mod ops;

pub use agent::{BUNDLED_TEMPLATE, LaunchAgent, agent_status, extract_label, uninstall_agent};
pub use config::{LaunchAgentConfig, TemplateSource};
pub use mock::{MockServiceManager, ServiceCall};
pub use ops::{Launchctl, ServiceManager, parse_list_output};
