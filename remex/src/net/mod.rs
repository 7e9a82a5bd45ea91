//! Asynchronous networking built on reactor readiness.

pub mod tcp;

pub use tcp::{TcpListener, TcpStream};
