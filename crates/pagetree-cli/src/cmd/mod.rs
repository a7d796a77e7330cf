pub mod access;
pub mod completions;
pub mod copy;
pub mod create;
pub mod delete;
pub mod doctor;
pub mod expand;
pub mod export;
pub mod history;
pub mod import;
pub mod init;
pub mod ls;
pub mod move_cmd;
pub mod rename;
pub mod status;
pub mod tree;
