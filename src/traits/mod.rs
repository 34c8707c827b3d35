pub mod channel;

pub use channel::RpcChannel;
