// Applying configs
pub mod apply;

// Read-only commands: print, parse, packages
pub mod inspect;
