//! meshkv-protocol - The wire frame shared by the raft port and the
//! repl port (§6): a 4-byte length prefix around a JSON `Msg`.

pub mod codec;
pub mod msg;

pub use codec::{read_msg, read_msg_untimed, write_msg, DEFAULT_DIAL_TIMEOUT, DEFAULT_READ_TIMEOUT};
pub use msg::{Head, Msg};

