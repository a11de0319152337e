//! Session key derivation with the AES-CM PRF of RFC 3711 section 4.3.

use aes::Aes128;
use aes::cipher::{BlockEncrypt, KeyInit, generic_array::GenericArray};
use shared::error::{Error, Result};

pub const LABEL_SRTP_ENCRYPTION: u8 = 0x00;
pub const LABEL_SRTP_AUTHENTICATION_TAG: u8 = 0x01;
pub const LABEL_SRTP_SALT: u8 = 0x02;
pub const LABEL_SRTCP_ENCRYPTION: u8 = 0x03;
pub const LABEL_SRTCP_AUTHENTICATION_TAG: u8 = 0x04;
pub const LABEL_SRTCP_SALT: u8 = 0x05;

const BLOCK_LEN: usize = 16;

/// Derives `out_len` bytes of session material for `label`.
///
/// Only a key derivation rate of zero is supported, so `index_over_kdr`
/// must be zero.
pub fn aes_cm_key_derivation(
    label: u8,
    master_key: &[u8],
    master_salt: &[u8],
    index_over_kdr: usize,
    out_len: usize,
) -> Result<Vec<u8>> {
    if index_over_kdr != 0 {
        return Err(Error::UnsupportedIndexOverKdr);
    }
    if master_salt.len() > BLOCK_LEN - 2 {
        return Err(Error::SrtpKeyLength(BLOCK_LEN - 2, master_salt.len()));
    }

    let block_cipher = Aes128::new_from_slice(master_key)
        .map_err(|_| Error::SrtpKeyLength(BLOCK_LEN, master_key.len()))?;

    // x = key_id XOR master_salt, where key_id = label || r and r = 0
    let mut prf_in = [0u8; BLOCK_LEN];
    prf_in[..master_salt.len()].copy_from_slice(master_salt);
    prf_in[7] ^= label;

    let n_blocks = out_len.div_ceil(BLOCK_LEN);
    let mut out = Vec::with_capacity(n_blocks * BLOCK_LEN);
    for i in 0..n_blocks {
        let mut block = prf_in;
        block[BLOCK_LEN - 2..].copy_from_slice(&(i as u16).to_be_bytes());
        block_cipher.encrypt_block(GenericArray::from_mut_slice(&mut block));
        out.extend_from_slice(&block);
    }
    out.truncate(out_len);

    Ok(out)
}

/// Builds the AES-CM counter block for a 48 bit packet `index`.
///
/// IV = (salt * 2^16) XOR (ssrc * 2^64) XOR (index * 2^16)
pub fn generate_counter(index: u64, ssrc: u32, session_salt: &[u8]) -> [u8; BLOCK_LEN] {
    let mut counter = [0u8; BLOCK_LEN];
    counter[4..8].copy_from_slice(&ssrc.to_be_bytes());
    counter[8..14].copy_from_slice(&index.to_be_bytes()[2..]);

    for (c, s) in counter.iter_mut().zip(session_salt.iter()) {
        *c ^= *s;
    }

    counter
}

#[cfg(test)]
mod test {
    use super::*;

    // RFC 3711 appendix B.3
    const MASTER_KEY: [u8; 16] = [
        0xE1, 0xF9, 0x7A, 0x0D, 0x3E, 0x01, 0x8B, 0xE0, 0xD6, 0x4F, 0xA3, 0x2C, 0x06, 0xDE, 0x41,
        0x39,
    ];
    const MASTER_SALT: [u8; 14] = [
        0x0E, 0xC6, 0x75, 0xAD, 0x49, 0x8A, 0xFE, 0xEB, 0xB6, 0x96, 0x0B, 0x3A, 0xAB, 0xE6,
    ];

    #[test]
    fn test_valid_session_keys() -> Result<()> {
        let key = aes_cm_key_derivation(LABEL_SRTP_ENCRYPTION, &MASTER_KEY, &MASTER_SALT, 0, 16)?;
        assert_eq!(
            key,
            vec![
                0xC6, 0x1E, 0x7A, 0x93, 0x74, 0x4F, 0x39, 0xEE, 0x10, 0x73, 0x4A, 0xFE, 0x3F, 0xF7,
                0xA0, 0x87
            ]
        );

        let salt = aes_cm_key_derivation(LABEL_SRTP_SALT, &MASTER_KEY, &MASTER_SALT, 0, 14)?;
        assert_eq!(
            salt,
            vec![
                0x30, 0xCB, 0xBC, 0x08, 0x86, 0x3D, 0x8C, 0x85, 0xD4, 0x9D, 0xB3, 0x4A, 0x9A, 0xE1
            ]
        );

        let auth = aes_cm_key_derivation(
            LABEL_SRTP_AUTHENTICATION_TAG,
            &MASTER_KEY,
            &MASTER_SALT,
            0,
            20,
        )?;
        assert_eq!(
            auth,
            vec![
                0xCE, 0xBE, 0x32, 0x1F, 0x6F, 0xF7, 0x71, 0x6B, 0x6F, 0xD4, 0xAB, 0x49, 0xAF, 0x25,
                0x6A, 0x15, 0x6D, 0x38, 0xBA, 0xA4
            ]
        );
        Ok(())
    }

    #[test]
    fn test_index_over_kdr() {
        assert_eq!(
            aes_cm_key_derivation(LABEL_SRTP_ENCRYPTION, &MASTER_KEY, &MASTER_SALT, 1, 16),
            Err(Error::UnsupportedIndexOverKdr)
        );
    }

    #[test]
    fn test_generate_counter() {
        let salt = [0u8; 14];
        let counter = generate_counter(0x0001_0002, 0xCAFEBABE, &salt);
        assert_eq!(
            counter,
            [0, 0, 0, 0, 0xCA, 0xFE, 0xBA, 0xBE, 0, 0, 0, 0x01, 0, 0x02, 0, 0]
        );
    }
}
