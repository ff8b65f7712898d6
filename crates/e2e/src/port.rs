//! Ephemeral port allocation

use std::net::TcpListener;

use crate::error::{E2eError, E2eResult};

/// Ask the OS for a port that is unbound right now.
///
/// The listener is released before returning, so this is a hint rather than a
/// reservation: another process may take the port before the server binds it.
/// A lost race shows up later as a readiness timeout.
pub fn find_free_port() -> E2eResult<u16> {
    let listener = TcpListener::bind("127.0.0.1:0").map_err(E2eError::PortUnavailable)?;
    let port = listener.local_addr().map_err(E2eError::PortUnavailable)?.port();
    Ok(port)
}
