pub mod changelog;
pub mod dispatch;
pub mod history;
pub mod init_index;
pub mod search;
pub mod snapshot;
pub mod sync;
