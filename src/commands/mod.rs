pub mod init;
pub mod insert;
pub mod remove;
pub mod show;
pub mod transfer;

pub use init::init;
pub use insert::insert;
pub use remove::remove;
pub use show::{show, show_async};
pub use transfer::{copy_entry, move_entry, Transfer, TransferMode};
