pub mod engine_io;
pub mod socket_server;
pub mod socket_session;
pub mod stream_server;
pub mod websocket_sink;
