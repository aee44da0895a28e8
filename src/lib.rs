//! snap-autostart: login-item installer for the snap_tool screenshot utility
//!
//! This library registers snap_tool to start at user login:
//! - macOS: a per-user LaunchAgent rendered from a property-list template
//!   and loaded through launchd
//! - Windows: a `.lnk` shortcut in the user's Startup folder

pub mod config;
pub mod error;
pub mod interpreter;
pub mod launchd;
pub mod model;
pub mod shortcut;
pub mod template;
pub mod util;
