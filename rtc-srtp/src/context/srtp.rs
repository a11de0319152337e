use bytes::BytesMut;
use rtp::header::Header;
use shared::error::{Error, Result};
use shared::marshal::Unmarshal;

use super::{Context, SrtpSsrcState};
use crate::cipher::verify_tag;

/// Parses the RTP header of `buf`, returning it with its encoded length.
fn parse_header(buf: &[u8]) -> Result<(Header, usize)> {
    let mut reader = buf;
    let header = Header::unmarshal(&mut reader)?;
    Ok((header, buf.len() - reader.len()))
}

impl Context {
    /// DecryptRTP verifies and decrypts a RTP packet with an encrypted payload.
    pub fn decrypt_rtp(&mut self, encrypted: &[u8]) -> Result<BytesMut> {
        let (header, header_len) = parse_header(encrypted)?;
        let tag_len = self.cipher.rtp_auth_tag_len();
        if encrypted.len() < header_len + tag_len {
            return Err(Error::SrtpTooSmall(encrypted.len(), header_len + tag_len));
        }

        let ssrc = header.ssrc;
        let seq = header.sequence_number;

        // Sources are only remembered once a packet of theirs authenticates.
        let mut unseen = None;
        let state = match self.srtp_ssrc_states.get_mut(&ssrc) {
            Some(state) => state,
            None => unseen.insert(SrtpSsrcState::new(ssrc, &self.new_srtp_replay_detector)),
        };

        let roc = state.next_rollover_count(seq);
        let index = ((roc as u64) << 16) | seq as u64;
        if let Some(replay_detector) = &mut state.replay_detector {
            if !replay_detector.check(index) {
                return Err(Error::SrtpSsrcDuplicated(ssrc, index));
            }
        }

        let (authenticated, tag) = encrypted.split_at(encrypted.len() - tag_len);
        if tag_len > 0 {
            let expected = self.cipher.rtp_auth_tag(authenticated, roc);
            if !verify_tag(tag, &expected) {
                return Err(Error::RtpFailedToVerifyAuthTag);
            }
        }

        if let Some(replay_detector) = &mut state.replay_detector {
            replay_detector.accept();
        }
        state.update_rollover_count(seq, roc);
        if let Some(state) = unseen {
            self.srtp_ssrc_states.insert(ssrc, state);
        }

        let mut decrypted = BytesMut::from(authenticated);
        self.cipher
            .apply_rtp_keystream(&mut decrypted[header_len..], ssrc, index)?;

        Ok(decrypted)
    }

    /// EncryptRTP encrypts a marshaled RTP packet and appends its auth tag.
    pub fn encrypt_rtp(&mut self, plaintext: &[u8]) -> Result<BytesMut> {
        let (header, header_len) = parse_header(plaintext)?;
        self.encrypt_rtp_with_header(plaintext, &header, header_len)
    }

    /// Encrypts `plaintext` whose header was already parsed.
    pub fn encrypt_rtp_with_header(
        &mut self,
        plaintext: &[u8],
        header: &Header,
        header_len: usize,
    ) -> Result<BytesMut> {
        let ssrc = header.ssrc;
        let seq = header.sequence_number;

        let roc = {
            let state = self.get_srtp_ssrc_state(ssrc);
            let roc = state.next_rollover_count(seq);
            state.update_rollover_count(seq, roc);
            roc
        };
        let index = ((roc as u64) << 16) | seq as u64;

        let tag_len = self.cipher.rtp_auth_tag_len();
        let mut encrypted = BytesMut::with_capacity(plaintext.len() + tag_len);
        encrypted.extend_from_slice(plaintext);
        self.cipher
            .apply_rtp_keystream(&mut encrypted[header_len..], ssrc, index)?;

        let tag = self.cipher.rtp_auth_tag(&encrypted, roc);
        encrypted.extend_from_slice(&tag);

        Ok(encrypted)
    }
}
