//! TLS configuration for the ferry client and server.
//!
//! Certificate and key material is always loaded from operator-provided PEM
//! files. Both configs pin the protocol floor to TLS 1.2; nothing older is
//! negotiable.

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io::BufReader;
use std::net::IpAddr;
use std::path::Path;

use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName};

const TLS_VERSIONS: &[&rustls::SupportedProtocolVersion] =
    &[&rustls::version::TLS13, &rustls::version::TLS12];

fn read_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let mut rd = BufReader::new(
        fs::File::open(path).with_context(|| format!("open cert {}", path.display()))?,
    );
    let mut out = Vec::new();
    for c in rustls_pemfile::certs(&mut rd) {
        out.push(c.context("read cert")?);
    }
    if out.is_empty() {
        return Err(anyhow!("no certificates found in {}", path.display()));
    }
    Ok(out)
}

/// Build the server-side TLS config from PEM certificate and key files.
pub fn load_server_config(cert_path: &Path, key_path: &Path) -> Result<rustls::ServerConfig> {
    let certs = read_certs(cert_path)?;
    let key = {
        let mut rd = BufReader::new(
            fs::File::open(key_path).with_context(|| format!("open key {}", key_path.display()))?,
        );
        let pkcs8: Vec<_> = rustls_pemfile::pkcs8_private_keys(&mut rd).collect();
        if let Some(k) = pkcs8.into_iter().next() {
            PrivateKeyDer::from(k.context("pkcs8 key")?)
        } else {
            let mut rd2 = BufReader::new(
                fs::File::open(key_path).context("reopen key")?,
            );
            let rsa: Vec<_> = rustls_pemfile::rsa_private_keys(&mut rd2).collect();
            let k = rsa.into_iter().next().context("rsa key not found")??;
            PrivateKeyDer::from(k)
        }
    };

    let cfg = rustls::ServerConfig::builder_with_protocol_versions(TLS_VERSIONS)
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .context("build server tls config")?;
    Ok(cfg)
}

/// Build the client-side TLS config from a trust-anchor PEM file.
///
/// The server's certificate must chain to one of the anchors, and its names
/// are checked against the host passed to [`server_name_for`].
pub fn load_client_config(trust_anchor_path: &Path) -> Result<rustls::ClientConfig> {
    let mut roots = rustls::RootCertStore::empty();
    for cert in read_certs(trust_anchor_path)? {
        roots
            .add(cert)
            .with_context(|| format!("add trust anchor from {}", trust_anchor_path.display()))?;
    }

    let cfg = rustls::ClientConfig::builder_with_protocol_versions(TLS_VERSIONS)
        .with_root_certificates(roots)
        .with_no_client_auth();
    Ok(cfg)
}

/// SNI/verification name for a target host, IP or DNS.
pub fn server_name_for(host: &str) -> Result<ServerName<'static>> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ServerName::IpAddress(ip.into()));
    }
    ServerName::try_from(host.to_string()).map_err(|_| anyhow!("invalid server name: {host:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_name_for_dns_and_ip() {
        assert!(matches!(
            server_name_for("localhost").unwrap(),
            ServerName::DnsName(_)
        ));
        assert!(matches!(
            server_name_for("127.0.0.1").unwrap(),
            ServerName::IpAddress(_)
        ));
        assert!(server_name_for("not a hostname").is_err());
    }

    #[test]
    fn test_missing_files_are_errors() {
        let missing = Path::new("/nonexistent/cert.pem");
        assert!(load_server_config(missing, missing).is_err());
        assert!(load_client_config(missing).is_err());
    }
}
