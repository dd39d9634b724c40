//! [`HostProber`] that opens a TCP connection to the remote shell port.

use std::io::ErrorKind;

use async_trait::async_trait;
use tokio::net::TcpStream;

use super::{HostProber, ProbeError};
use crate::execution::RemoteTarget;

/// Reports a host reachable when its shell port accepts a connection.
///
/// The connection is closed straight away; no protocol handshake is made.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpProber;

#[async_trait]
impl HostProber for TcpProber {
    async fn probe(&self, target: &RemoteTarget) -> Result<bool, ProbeError> {
        match TcpStream::connect((target.address.as_str(), target.port)).await {
            Ok(_stream) => Ok(true),
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::ConnectionRefused
                        | ErrorKind::ConnectionReset
                        | ErrorKind::ConnectionAborted
                        | ErrorKind::TimedOut
                ) =>
            {
                Ok(false)
            }
            Err(e) if e.kind() == ErrorKind::Other || e.kind() == ErrorKind::InvalidInput => {
                Err(ProbeError::Resolve {
                    address: target.address.clone(),
                    source: e,
                })
            }
            Err(e) => Err(ProbeError::Io(e)),
        }
    }
}
