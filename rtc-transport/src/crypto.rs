//! The send and receive SRTP contexts of a transport.

use log::info;
use shared::error::{Error, Result};
use srtp::{Context, ProtectionProfile, option};

/// Replay window of inbound contexts, in packets.
pub const REPLAY_WINDOW: usize = 64;

/// Keys exported by a completed DTLS-SRTP handshake. Each key is the master
/// key followed by the master salt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrtpKeyingMaterial {
    pub profile: ProtectionProfile,
    pub local_key: Vec<u8>,
    pub remote_key: Vec<u8>,
}

#[derive(Default)]
pub struct SrtpSession {
    local: Option<Context>,
    remote: Option<Context>,
}

impl SrtpSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the send context. On failure the previous one stays.
    pub fn set_local(&mut self, profile: ProtectionProfile, key: &[u8]) -> Result<()> {
        let context = Context::from_keying_material(
            key,
            profile,
            Some(option::srtp_no_replay_protection()),
            Some(option::srtcp_no_replay_protection()),
        )?;
        info!("local srtp context set with {profile}");
        self.local = Some(context);
        Ok(())
    }

    /// Installs the receive context. On failure the previous one stays.
    pub fn set_remote(&mut self, profile: ProtectionProfile, key: &[u8]) -> Result<()> {
        let context = Context::from_keying_material(
            key,
            profile,
            Some(option::srtp_replay_protection(REPLAY_WINDOW)),
            Some(option::srtcp_replay_protection(REPLAY_WINDOW)),
        )?;
        info!("remote srtp context set with {profile}");
        self.remote = Some(context);
        Ok(())
    }

    /// Installs the send context from an SDES suite name.
    pub fn set_local_sdes(&mut self, suite: &str, key: &[u8]) -> Result<()> {
        self.set_local(suite.parse()?, key)
    }

    pub fn set_remote_sdes(&mut self, suite: &str, key: &[u8]) -> Result<()> {
        self.set_remote(suite.parse()?, key)
    }

    /// Installs both contexts; neither changes unless both keys are valid.
    pub fn install(&mut self, material: &SrtpKeyingMaterial) -> Result<()> {
        let expected = material.profile.keying_material_len();
        if material.remote_key.len() != expected {
            return Err(Error::SrtpKeyLength(
                expected,
                material.remote_key.len(),
            ));
        }
        self.set_local(material.profile, &material.local_key)?;
        self.set_remote(material.profile, &material.remote_key)
    }

    pub fn local(&mut self) -> Option<&mut Context> {
        self.local.as_mut()
    }

    pub fn remote(&mut self) -> Option<&mut Context> {
        self.remote.as_mut()
    }

    pub fn is_secured(&self) -> bool {
        self.local.is_some() && self.remote.is_some()
    }

    pub fn clear(&mut self) {
        self.local = None;
        self.remote = None;
    }
}
