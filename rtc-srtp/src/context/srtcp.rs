use bytes::{BufMut, BytesMut};
use shared::error::{Error, Result};

use super::{Context, SRTCP_HEADER_LEN, SRTCP_INDEX_SIZE, SrtcpSsrcState};
use crate::cipher::verify_tag;
use crate::option::MAX_SRTCP_INDEX;

const E_FLAG: u32 = 0x8000_0000;

fn sender_ssrc(buf: &[u8]) -> u32 {
    u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]])
}

impl Context {
    /// DecryptRTCP decrypts a buffer that contains a RTCP packet
    pub fn decrypt_rtcp(&mut self, encrypted: &[u8]) -> Result<BytesMut> {
        let tag_len = self.cipher.rtcp_auth_tag_len();
        let min_len = SRTCP_HEADER_LEN + SRTCP_INDEX_SIZE + tag_len;
        if encrypted.len() < min_len {
            return Err(Error::SrtcpTooSmall(encrypted.len(), min_len));
        }

        let tail_offset = encrypted.len() - tag_len - SRTCP_INDEX_SIZE;
        let word = u32::from_be_bytes([
            encrypted[tail_offset],
            encrypted[tail_offset + 1],
            encrypted[tail_offset + 2],
            encrypted[tail_offset + 3],
        ]);
        let is_encrypted = word & E_FLAG != 0;
        let index = word & !E_FLAG;
        let ssrc = sender_ssrc(encrypted);

        let mut unseen = None;
        let state = match self.srtcp_ssrc_states.get_mut(&ssrc) {
            Some(state) => state,
            None => unseen.insert(SrtcpSsrcState::new(ssrc, &self.new_srtcp_replay_detector)),
        };
        if let Some(replay_detector) = &mut state.replay_detector {
            if !replay_detector.check(index as u64) {
                return Err(Error::SrtcpSsrcDuplicated(ssrc, index));
            }
        }

        let (authenticated, tag) = encrypted.split_at(encrypted.len() - tag_len);
        if tag_len > 0 {
            let expected = self.cipher.rtcp_auth_tag(authenticated);
            if !verify_tag(tag, &expected) {
                return Err(Error::RtcpFailedToVerifyAuthTag);
            }
        }

        if let Some(replay_detector) = &mut state.replay_detector {
            replay_detector.accept();
        }
        if let Some(state) = unseen {
            self.srtcp_ssrc_states.insert(ssrc, state);
        }

        let mut decrypted = BytesMut::from(&encrypted[..tail_offset]);
        if is_encrypted {
            self.cipher
                .apply_rtcp_keystream(&mut decrypted[SRTCP_HEADER_LEN..], ssrc, index)?;
        }

        Ok(decrypted)
    }

    /// EncryptRTCP encrypts a marshaled compound RTCP packet, then appends
    /// the E flag, the SRTCP index and the auth tag.
    pub fn encrypt_rtcp(&mut self, decrypted: &[u8]) -> Result<BytesMut> {
        if decrypted.len() < SRTCP_HEADER_LEN {
            return Err(Error::SrtcpTooSmall(decrypted.len(), SRTCP_HEADER_LEN));
        }

        let ssrc = sender_ssrc(decrypted);
        let index = {
            let state = self.get_srtcp_ssrc_state(ssrc);
            let index = state.srtcp_index;
            state.srtcp_index = (index + 1) & MAX_SRTCP_INDEX as u32;
            index
        };

        let tag_len = self.cipher.rtcp_auth_tag_len();
        let mut encrypted =
            BytesMut::with_capacity(decrypted.len() + SRTCP_INDEX_SIZE + tag_len);
        encrypted.extend_from_slice(decrypted);
        self.cipher
            .apply_rtcp_keystream(&mut encrypted[SRTCP_HEADER_LEN..], ssrc, index)?;

        let e_flag = if self.cipher.encrypts() { E_FLAG } else { 0 };
        encrypted.put_u32(e_flag | index);

        let tag = self.cipher.rtcp_auth_tag(&encrypted);
        encrypted.extend_from_slice(&tag);

        Ok(encrypted)
    }
}
