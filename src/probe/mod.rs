// src/probe/mod.rs

//! Checks that tests poll until the system under test settles.

pub mod alertmanager;
pub mod http;
pub mod prometheus;

use std::net::{Ipv4Addr, TcpListener};

use crate::errors::Result;

pub use alertmanager::{Alert, Alertmanager};
pub use http::{HttpResult, get, get_200};
pub use prometheus::{Prometheus, QueryData, QueryResponse};

/// A TCP port on localhost that was free a moment ago.
///
/// The listener is dropped before returning, so another process may grab
/// the port in between.
pub fn find_free_port() -> Result<u16> {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))?;
    Ok(listener.local_addr()?.port())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_port_can_be_bound() {
        let port = find_free_port().unwrap();
        assert_ne!(port, 0);
        TcpListener::bind((Ipv4Addr::LOCALHOST, port)).unwrap();
    }
}
