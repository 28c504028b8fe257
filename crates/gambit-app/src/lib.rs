// Application layer: remote catalog fetching, catalog caching, and the
// command-line front end over a core session.

pub mod commands;
pub mod lichess;
pub mod loader;
