// One module per CLI subcommand. main.rs parses arguments and dispatches here.

pub mod cache;
pub mod fetch;
pub mod optimize;
pub mod route;
