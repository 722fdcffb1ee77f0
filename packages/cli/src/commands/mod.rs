pub mod buffer;
pub mod init;
pub mod replay;

pub use buffer::{buffer, BufferArgs};
pub use init::{init, InitArgs};
pub use replay::{replay, ReplayArgs};
