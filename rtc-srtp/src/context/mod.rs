use std::collections::HashMap;

use shared::error::{Error, Result};
use shared::replay_detector::SlidingWindowDetector;

use crate::cipher::Cipher;
use crate::option::ContextOption;
use crate::protection_profile::ProtectionProfile;

mod srtcp;
mod srtp;

pub(crate) const SRTCP_HEADER_LEN: usize = 8;
pub(crate) const SRTCP_INDEX_SIZE: usize = 4;
pub(crate) const MAX_ROC_DISORDER: u16 = 0x8000;

/// Encryption state of a single RTP source.
pub(crate) struct SrtpSsrcState {
    ssrc: u32,
    index: u64,
    rollover_has_processed: bool,
    replay_detector: Option<SlidingWindowDetector>,
}

/// Encryption state of a single RTCP source.
pub(crate) struct SrtcpSsrcState {
    srtcp_index: u32,
    ssrc: u32,
    replay_detector: Option<SlidingWindowDetector>,
}

impl SrtpSsrcState {
    fn new(ssrc: u32, new_detector: &ContextOption) -> Self {
        SrtpSsrcState {
            ssrc,
            index: 0,
            rollover_has_processed: false,
            replay_detector: new_detector(),
        }
    }

    /// Guesses the rollover counter of `seq` relative to the highest index
    /// seen so far (RFC 3711 appendix A).
    pub(crate) fn next_rollover_count(&self, seq: u16) -> u32 {
        let roc = (self.index >> 16) as u32;
        if !self.rollover_has_processed {
            return roc;
        }

        let s_l = (self.index & 0xFFFF) as u16;
        if s_l < MAX_ROC_DISORDER {
            if seq > s_l && seq - s_l > MAX_ROC_DISORDER {
                roc.saturating_sub(1)
            } else {
                roc
            }
        } else if s_l - MAX_ROC_DISORDER > seq {
            roc.wrapping_add(1)
        } else {
            roc
        }
    }

    pub(crate) fn update_rollover_count(&mut self, seq: u16, roc: u32) {
        let index = ((roc as u64) << 16) | seq as u64;
        if !self.rollover_has_processed || index > self.index {
            self.index = index;
        }
        self.rollover_has_processed = true;
    }
}

impl SrtcpSsrcState {
    fn new(ssrc: u32, new_detector: &ContextOption) -> Self {
        SrtcpSsrcState {
            srtcp_index: 0,
            ssrc,
            replay_detector: new_detector(),
        }
    }
}

/// Context represents a SRTP cryptographic context for one direction.
/// It can only be used for one-way operations: either encrypt or decrypt,
/// never both.
pub struct Context {
    cipher: Cipher,

    srtp_ssrc_states: HashMap<u32, SrtpSsrcState>,
    srtcp_ssrc_states: HashMap<u32, SrtcpSsrcState>,

    new_srtp_replay_detector: ContextOption,
    new_srtcp_replay_detector: ContextOption,
}

impl Context {
    /// Creates a context from a master key and salt. Missing options leave
    /// replay protection off.
    pub fn new(
        master_key: &[u8],
        master_salt: &[u8],
        profile: ProtectionProfile,
        srtp_ctx_opt: Option<ContextOption>,
        srtcp_ctx_opt: Option<ContextOption>,
    ) -> Result<Context> {
        if master_key.len() != profile.key_len() {
            return Err(Error::SrtpKeyLength(profile.key_len(), master_key.len()));
        }
        if master_salt.len() != profile.salt_len() {
            return Err(Error::SrtpKeyLength(profile.salt_len(), master_salt.len()));
        }

        let cipher = Cipher::new(profile, master_key, master_salt)?;

        Ok(Context {
            cipher,
            srtp_ssrc_states: HashMap::new(),
            srtcp_ssrc_states: HashMap::new(),
            new_srtp_replay_detector: srtp_ctx_opt
                .unwrap_or_else(crate::option::srtp_no_replay_protection),
            new_srtcp_replay_detector: srtcp_ctx_opt
                .unwrap_or_else(crate::option::srtcp_no_replay_protection),
        })
    }

    /// Creates a context from concatenated master key and master salt, the
    /// layout carried by SDES `inline:` keys.
    pub fn from_keying_material(
        keying_material: &[u8],
        profile: ProtectionProfile,
        srtp_ctx_opt: Option<ContextOption>,
        srtcp_ctx_opt: Option<ContextOption>,
    ) -> Result<Context> {
        let expected = profile.keying_material_len();
        if keying_material.len() != expected {
            return Err(Error::SrtpKeyLength(expected, keying_material.len()));
        }
        let (master_key, master_salt) = keying_material.split_at(profile.key_len());
        Context::new(master_key, master_salt, profile, srtp_ctx_opt, srtcp_ctx_opt)
    }

    fn get_srtp_ssrc_state(&mut self, ssrc: u32) -> &mut SrtpSsrcState {
        let new_detector = &self.new_srtp_replay_detector;
        self.srtp_ssrc_states
            .entry(ssrc)
            .or_insert_with(|| SrtpSsrcState::new(ssrc, new_detector))
    }

    fn get_srtcp_ssrc_state(&mut self, ssrc: u32) -> &mut SrtcpSsrcState {
        let new_detector = &self.new_srtcp_replay_detector;
        self.srtcp_ssrc_states
            .entry(ssrc)
            .or_insert_with(|| SrtcpSsrcState::new(ssrc, new_detector))
    }

    /// Returns the rollover counter of `ssrc`, if the source was seen.
    pub fn get_roc(&self, ssrc: u32) -> Option<u32> {
        self.srtp_ssrc_states
            .get(&ssrc)
            .map(|s| (s.index >> 16) as u32)
    }

    /// Sets the rollover counter of `ssrc`, for sources joining mid-stream.
    pub fn set_roc(&mut self, ssrc: u32, roc: u32) {
        let state = self.get_srtp_ssrc_state(ssrc);
        state.index = ((roc as u64) << 16) | (state.index & 0xFFFF);
    }

    /// Returns the next SRTCP index to be sent for `ssrc`.
    pub fn get_index(&self, ssrc: u32) -> Option<u32> {
        self.srtcp_ssrc_states.get(&ssrc).map(|s| s.srtcp_index)
    }

    pub fn set_index(&mut self, ssrc: u32, index: u32) {
        self.get_srtcp_ssrc_state(ssrc).srtcp_index = index & crate::option::MAX_SRTCP_INDEX as u32;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn state(index: u64) -> SrtpSsrcState {
        SrtpSsrcState {
            ssrc: 1,
            index,
            rollover_has_processed: true,
            replay_detector: None,
        }
    }

    #[test]
    fn test_next_rollover_count() {
        // in order, no wrap
        assert_eq!(state(100).next_rollover_count(101), 0);
        // forward across the wrap
        assert_eq!(state(65530).next_rollover_count(3), 1);
        // late packet from before the wrap
        assert_eq!(state((1 << 16) | 2).next_rollover_count(65534), 0);
        // late packet at roc 0 can't go negative
        assert_eq!(state(2).next_rollover_count(65534), 0);
        // fresh state takes the configured roc
        let fresh = SrtpSsrcState {
            ssrc: 1,
            index: 5 << 16,
            rollover_has_processed: false,
            replay_detector: None,
        };
        assert_eq!(fresh.next_rollover_count(40000), 5);
    }

    #[test]
    fn test_update_rollover_count_keeps_highest() {
        let mut s = state(0);
        s.rollover_has_processed = false;
        s.update_rollover_count(65535, 0);
        s.update_rollover_count(1, 1);
        s.update_rollover_count(65534, 0);
        assert_eq!(s.index, (1 << 16) | 1);
    }

    #[test]
    fn test_context_key_length() {
        let profile = ProtectionProfile::Aes128CmHmacSha1_80;
        assert!(matches!(
            Context::new(&[0; 15], &[0; 14], profile, None, None),
            Err(Error::SrtpKeyLength(16, 15))
        ));
        assert!(matches!(
            Context::new(&[0; 16], &[0; 12], profile, None, None),
            Err(Error::SrtpKeyLength(14, 12))
        ));
        assert!(matches!(
            Context::from_keying_material(&[0; 29], profile, None, None),
            Err(Error::SrtpKeyLength(30, 29))
        ));
    }
}
