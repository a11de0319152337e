use aes::Aes128;
use ctr::cipher::{KeyIvInit, StreamCipher};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use shared::error::{Error, Result};
use subtle::ConstantTimeEq;

use crate::key_derivation::*;
use crate::protection_profile::ProtectionProfile;

type Aes128Ctr = ctr::Ctr128BE<Aes128>;
type HmacSha1 = Hmac<Sha1>;

/// Session keys of one direction, derived once from the master key.
pub(crate) struct Cipher {
    profile: ProtectionProfile,
    srtp_session_key: Vec<u8>,
    srtp_session_salt: Vec<u8>,
    srtp_session_auth: HmacSha1,
    srtcp_session_key: Vec<u8>,
    srtcp_session_salt: Vec<u8>,
    srtcp_session_auth: HmacSha1,
}

impl Cipher {
    pub(crate) fn new(
        profile: ProtectionProfile,
        master_key: &[u8],
        master_salt: &[u8],
    ) -> Result<Self> {
        let key_len = profile.key_len();
        let salt_len = profile.salt_len();
        let auth_len = profile.auth_key_len();

        let derive = |label| aes_cm_key_derivation(label, master_key, master_salt, 0, key_len);
        let derive_salt =
            |label| aes_cm_key_derivation(label, master_key, master_salt, 0, salt_len);
        let derive_auth =
            |label| aes_cm_key_derivation(label, master_key, master_salt, 0, auth_len);

        let srtp_auth_key = derive_auth(LABEL_SRTP_AUTHENTICATION_TAG)?;
        let srtcp_auth_key = derive_auth(LABEL_SRTCP_AUTHENTICATION_TAG)?;

        Ok(Cipher {
            profile,
            srtp_session_key: derive(LABEL_SRTP_ENCRYPTION)?,
            srtp_session_salt: derive_salt(LABEL_SRTP_SALT)?,
            srtp_session_auth: new_hmac(&srtp_auth_key)?,
            srtcp_session_key: derive(LABEL_SRTCP_ENCRYPTION)?,
            srtcp_session_salt: derive_salt(LABEL_SRTCP_SALT)?,
            srtcp_session_auth: new_hmac(&srtcp_auth_key)?,
        })
    }

    pub(crate) fn rtp_auth_tag_len(&self) -> usize {
        self.profile.rtp_auth_tag_len()
    }

    pub(crate) fn rtcp_auth_tag_len(&self) -> usize {
        self.profile.rtcp_auth_tag_len()
    }

    pub(crate) fn encrypts(&self) -> bool {
        self.profile.encrypts()
    }

    /// XORs the keystream of packet `index` into `payload`. Applying it twice
    /// restores the input.
    pub(crate) fn apply_rtp_keystream(
        &self,
        payload: &mut [u8],
        ssrc: u32,
        index: u64,
    ) -> Result<()> {
        if !self.profile.encrypts() {
            return Ok(());
        }
        let counter = generate_counter(index, ssrc, &self.srtp_session_salt);
        apply_keystream(&self.srtp_session_key, &counter, payload)
    }

    pub(crate) fn apply_rtcp_keystream(
        &self,
        payload: &mut [u8],
        ssrc: u32,
        index: u32,
    ) -> Result<()> {
        if !self.profile.encrypts() {
            return Ok(());
        }
        let counter = generate_counter(index as u64, ssrc, &self.srtcp_session_salt);
        apply_keystream(&self.srtcp_session_key, &counter, payload)
    }

    /// Tag over the authenticated portion followed by the rollover counter.
    pub(crate) fn rtp_auth_tag(&self, authenticated: &[u8], roc: u32) -> Vec<u8> {
        let tag_len = self.rtp_auth_tag_len();
        if tag_len == 0 {
            return vec![];
        }
        let mut mac = self.srtp_session_auth.clone();
        mac.update(authenticated);
        mac.update(&roc.to_be_bytes());
        let mut tag = mac.finalize().into_bytes().to_vec();
        tag.truncate(tag_len);
        tag
    }

    pub(crate) fn rtcp_auth_tag(&self, authenticated: &[u8]) -> Vec<u8> {
        let tag_len = self.rtcp_auth_tag_len();
        if tag_len == 0 {
            return vec![];
        }
        let mut mac = self.srtcp_session_auth.clone();
        mac.update(authenticated);
        let mut tag = mac.finalize().into_bytes().to_vec();
        tag.truncate(tag_len);
        tag
    }
}

pub(crate) fn verify_tag(actual: &[u8], expected: &[u8]) -> bool {
    actual.len() == expected.len() && bool::from(actual.ct_eq(expected))
}

fn new_hmac(key: &[u8]) -> Result<HmacSha1> {
    HmacSha1::new_from_slice(key).map_err(|e| Error::Other(e.to_string()))
}

fn apply_keystream(key: &[u8], counter: &[u8], payload: &mut [u8]) -> Result<()> {
    let mut stream =
        Aes128Ctr::new_from_slices(key, counter).map_err(|e| Error::Other(e.to_string()))?;
    stream.apply_keystream(payload);
    Ok(())
}
