//! The contract between the transport and an external DTLS engine, plus the
//! remote DTLS parameters it is configured with.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use shared::error::{Error, Result};
use shared::util::match_dtls;

use crate::crypto::SrtpKeyingMaterial;

/// A DTLS handshake engine driven by the transport.
///
/// The transport feeds every handshake record it receives, sends whatever
/// [`drain`](DtlsEngine::drain) yields back to the active candidate and
/// installs the keys from [`poll_keys`](DtlsEngine::poll_keys) once the
/// handshake completes.
pub trait DtlsEngine: Send {
    fn is_handshake_record(&self, buf: &[u8]) -> bool {
        match_dtls(buf)
    }

    fn feed(&mut self, buf: &[u8]) -> Result<()>;

    /// Next record to send, if any.
    fn drain(&mut self) -> Option<Bytes>;

    /// Keying material of a completed handshake, yielded once.
    fn poll_keys(&mut self) -> Option<SrtpKeyingMaterial>;

    /// Configures the engine with the remote setup and certificate
    /// fingerprint and starts it in the matching role.
    fn set_remote_parameters(&mut self, setup: Setup, fingerprint: &Fingerprint) -> Result<()>;
}

/// Engine for transports keyed through SDES only.
#[derive(Debug, Default)]
pub struct NoDtls;

impl DtlsEngine for NoDtls {
    fn feed(&mut self, _buf: &[u8]) -> Result<()> {
        Err(Error::Dtls("no dtls engine configured".to_owned()))
    }

    fn drain(&mut self) -> Option<Bytes> {
        None
    }

    fn poll_keys(&mut self) -> Option<SrtpKeyingMaterial> {
        None
    }

    fn set_remote_parameters(&mut self, _setup: Setup, _fingerprint: &Fingerprint) -> Result<()> {
        Err(Error::Dtls("no dtls engine configured".to_owned()))
    }
}

/// RFC 4145 setup attribute of the remote side.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Setup {
    Active,
    Passive,
    Actpass,
    Holdconn,
}

impl FromStr for Setup {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "active" => Ok(Setup::Active),
            "passive" => Ok(Setup::Passive),
            "actpass" => Ok(Setup::Actpass),
            "holdconn" => Ok(Setup::Holdconn),
            _ => Err(Error::UnknownSetupRole(s.to_owned())),
        }
    }
}

impl fmt::Display for Setup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Setup::Active => write!(f, "active"),
            Setup::Passive => write!(f, "passive"),
            Setup::Actpass => write!(f, "actpass"),
            Setup::Holdconn => write!(f, "holdconn"),
        }
    }
}

impl Setup {
    /// Our role given the remote setup: an active peer connects to us, a
    /// passive one waits for us, and an actpass offer is answered as server.
    pub fn local_role(&self) -> Result<DtlsRole> {
        match self {
            Setup::Active | Setup::Actpass => Ok(DtlsRole::Server),
            Setup::Passive => Ok(DtlsRole::Client),
            Setup::Holdconn => Err(Error::HoldConnSetup),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DtlsRole {
    #[serde(rename = "client")]
    Client,
    #[serde(rename = "server")]
    Server,
}

impl fmt::Display for DtlsRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DtlsRole::Client => write!(f, "client"),
            DtlsRole::Server => write!(f, "server"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashFunction {
    #[serde(rename = "sha-1")]
    Sha1,
    #[serde(rename = "sha-224")]
    Sha224,
    #[serde(rename = "sha-256")]
    Sha256,
    #[serde(rename = "sha-384")]
    Sha384,
    #[serde(rename = "sha-512")]
    Sha512,
}

impl HashFunction {
    pub fn digest_len(&self) -> usize {
        match self {
            HashFunction::Sha1 => 20,
            HashFunction::Sha224 => 28,
            HashFunction::Sha256 => 32,
            HashFunction::Sha384 => 48,
            HashFunction::Sha512 => 64,
        }
    }
}

impl FromStr for HashFunction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "SHA-1" => Ok(HashFunction::Sha1),
            "SHA-224" => Ok(HashFunction::Sha224),
            "SHA-256" => Ok(HashFunction::Sha256),
            "SHA-384" => Ok(HashFunction::Sha384),
            "SHA-512" => Ok(HashFunction::Sha512),
            _ => Err(Error::UnknownHashFunction(s.to_owned())),
        }
    }
}

impl fmt::Display for HashFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HashFunction::Sha1 => "sha-1",
            HashFunction::Sha224 => "sha-224",
            HashFunction::Sha256 => "sha-256",
            HashFunction::Sha384 => "sha-384",
            HashFunction::Sha512 => "sha-512",
        };
        f.write_str(name)
    }
}

/// Certificate fingerprint as carried by `a=fingerprint`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub hash: HashFunction,
    pub digest: Vec<u8>,
}

impl Fingerprint {
    /// Parses colon separated hex such as `AB:CD:...`, whose length must match
    /// the digest size of `hash`.
    pub fn parse(hash: HashFunction, value: &str) -> Result<Self> {
        let hex_digits: String = value.split(':').collect();
        let digest =
            hex::decode(&hex_digits).map_err(|_| Error::InvalidFingerprint(value.to_owned()))?;
        if digest.len() != hash.digest_len() || value.split(':').any(|b| b.len() != 2) {
            return Err(Error::InvalidFingerprint(value.to_owned()));
        }
        Ok(Fingerprint { hash, digest })
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self
            .digest
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect::<Vec<_>>()
            .join(":");
        write!(f, "{} {}", self.hash, value)
    }
}
