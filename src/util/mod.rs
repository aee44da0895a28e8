// Utility modules

pub mod detect;
pub mod fs;
