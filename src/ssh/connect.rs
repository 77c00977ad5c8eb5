// TCP 连接建立
// 只接受数字 IPv4 地址; DNS 解析与 IPv6 不在范围内

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info};

use super::error::ConnectError;

/// 建立到目标主机的 TCP 连接
/// 失败即致命，不做重试
pub async fn establish(
    host: &str,
    port: u16,
    connect_timeout_secs: u64,
) -> Result<TcpStream, ConnectError> {
    let ip: Ipv4Addr = host
        .parse()
        .map_err(|_| ConnectError::InvalidAddress(host.to_string()))?;
    let addr = SocketAddr::new(IpAddr::V4(ip), port);

    info!("[SSH] Connecting to {}...", addr);

    let connect_timeout = Duration::from_secs(connect_timeout_secs);
    let stream = timeout(connect_timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| ConnectError::Timeout(connect_timeout_secs))?
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::ConnectionRefused => ConnectError::Refused(addr.to_string()),
            _ => ConnectError::Io(e),
        })?;

    debug!("[SSH] TCP connection established");
    Ok(stream)
}
