#![allow(clippy::needless_pass_by_value)]

pub mod init;
pub mod migrate;
pub mod watch;
