//! Host and service resolution.
//!
//! Ports are kept as strings end to end, so either side accepts a number
//! (`"8080"`) or a service name (`"http-alt"`), resolved together with the
//! host through the system resolver.

use std::io;
use std::net::SocketAddr;

use dns_lookup::{AddrInfoHints, SockType};

/// Resolves `host` and `service` to stream socket addresses.
///
/// The returned list is never empty.
pub async fn resolve(host: &str, service: &str) -> io::Result<Vec<SocketAddr>> {
    let host = host.to_string();
    let service = service.to_string();
    tokio::task::spawn_blocking(move || lookup(&host, &service))
        .await
        .map_err(io::Error::other)?
}

fn lookup(host: &str, service: &str) -> io::Result<Vec<SocketAddr>> {
    let hints = AddrInfoHints {
        socktype: SockType::Stream.into(),
        ..AddrInfoHints::default()
    };
    let addrs = dns_lookup::getaddrinfo(Some(host), Some(service), Some(hints))
        .map_err(io::Error::from)?
        .map(|info| info.map(|info| info.sockaddr))
        .collect::<io::Result<Vec<_>>>()?;

    if addrs.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{host}:{service} resolved to no addresses"),
        ));
    }
    tracing::debug!(host, service, count = addrs.len(), "resolved");
    Ok(addrs)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Service names come from the system services database.
    fn has_service(name: &str) -> bool {
        std::fs::read_to_string("/etc/services").is_ok_and(|db| {
            db.lines()
                .any(|line| line.split_whitespace().next() == Some(name))
        })
    }

    #[tokio::test]
    async fn numeric_port() {
        let addrs = resolve("127.0.0.1", "8080").await.unwrap();
        assert_eq!(addrs, vec!["127.0.0.1:8080".parse::<SocketAddr>().unwrap()]);
    }

    #[tokio::test]
    async fn service_name_port() {
        if !has_service("http") {
            eprintln!("SKIP: no http entry in /etc/services");
            return;
        }
        let addrs = resolve("127.0.0.1", "http").await.unwrap();
        assert!(addrs.iter().all(|addr| addr.port() == 80));
    }

    #[tokio::test]
    async fn localhost_resolves_to_loopback() {
        let addrs = resolve("localhost", "0").await.unwrap();
        assert!(addrs.iter().all(|addr| addr.ip().is_loopback()));
    }

    #[tokio::test]
    async fn unknown_service_is_an_error() {
        assert!(resolve("127.0.0.1", "no-such-facewire-service").await.is_err());
    }

    #[tokio::test]
    async fn out_of_range_port_is_an_error() {
        assert!(resolve("127.0.0.1", "99999").await.is_err());
    }
}
