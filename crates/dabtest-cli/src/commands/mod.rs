pub mod check_cmd;
pub mod config_cmd;
pub mod list_cmd;
pub mod parsers;
pub mod run_cmd;
