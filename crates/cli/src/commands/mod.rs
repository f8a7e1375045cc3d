pub mod config_cmd;
pub mod roles;
pub mod transfer;
