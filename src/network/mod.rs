pub mod codec;
pub mod history;
pub mod transport;

pub use history::{HistorySource, HttpHistory};
pub use transport::{ReconnectPolicy, TransportFactory, TransportHandle, WsConnector};
