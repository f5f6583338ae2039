//! Command handlers for the `cx` CLI.

pub mod completion;
pub mod config_cmd;
pub mod context_cmd;
pub mod dead_cmd;
pub mod impact_cmd;
pub mod import;
pub mod init;
pub mod rank_cmd;
pub mod recover_cmd;
pub mod sql_cmd;
pub mod vc;
