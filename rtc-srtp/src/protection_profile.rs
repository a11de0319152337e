use std::fmt;
use std::str::FromStr;

use shared::error::Error;

/// ProtectionProfile specifies Cipher and AuthTag details, similar to TLS cipher suite
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtectionProfile {
    #[default]
    Aes128CmHmacSha1_80,
    Aes128CmHmacSha1_32,
    /// AES counter mode encryption without authentication.
    Aes128CmNullAuth,
    /// Authentication only, payloads stay in the clear.
    NullCipherHmacSha1_80,
}

impl ProtectionProfile {
    pub const ALL: [ProtectionProfile; 4] = [
        ProtectionProfile::Aes128CmHmacSha1_80,
        ProtectionProfile::Aes128CmHmacSha1_32,
        ProtectionProfile::Aes128CmNullAuth,
        ProtectionProfile::NullCipherHmacSha1_80,
    ];

    /// Crypto suite name as used in SDES `a=crypto` lines.
    pub fn name(&self) -> &'static str {
        match self {
            ProtectionProfile::Aes128CmHmacSha1_80 => "AES_CM_128_HMAC_SHA1_80",
            ProtectionProfile::Aes128CmHmacSha1_32 => "AES_CM_128_HMAC_SHA1_32",
            ProtectionProfile::Aes128CmNullAuth => "AES_CM_128_NULL_AUTH",
            ProtectionProfile::NullCipherHmacSha1_80 => "NULL_CIPHER_HMAC_SHA1_80",
        }
    }

    /// Maps a DTLS-SRTP profile name (RFC 5764) to the matching profile.
    pub fn from_dtls_name(name: &str) -> Result<Self, Error> {
        match name {
            "SRTP_AES128_CM_HMAC_SHA1_80" | "AES_CM_128_HMAC_SHA1_80" => {
                Ok(ProtectionProfile::Aes128CmHmacSha1_80)
            }
            "SRTP_AES128_CM_HMAC_SHA1_32" | "AES_CM_128_HMAC_SHA1_32" => {
                Ok(ProtectionProfile::Aes128CmHmacSha1_32)
            }
            "SRTP_NULL_HMAC_SHA1_80" | "NULL_HMAC_SHA1_80" => {
                Ok(ProtectionProfile::NullCipherHmacSha1_80)
            }
            _ => Err(Error::ErrNoSuchSrtpProfile(name.to_owned())),
        }
    }

    pub fn key_len(&self) -> usize {
        16
    }

    pub fn salt_len(&self) -> usize {
        14
    }

    /// Length of the concatenated master key and master salt.
    pub fn keying_material_len(&self) -> usize {
        self.key_len() + self.salt_len()
    }

    pub fn auth_key_len(&self) -> usize {
        20
    }

    pub fn rtp_auth_tag_len(&self) -> usize {
        match self {
            ProtectionProfile::Aes128CmHmacSha1_80 | ProtectionProfile::NullCipherHmacSha1_80 => {
                10
            }
            ProtectionProfile::Aes128CmHmacSha1_32 => 4,
            ProtectionProfile::Aes128CmNullAuth => 0,
        }
    }

    /// SRTCP always carries the 80 bit tag when authentication is enabled.
    pub fn rtcp_auth_tag_len(&self) -> usize {
        match self {
            ProtectionProfile::Aes128CmNullAuth => 0,
            _ => 10,
        }
    }

    pub fn encrypts(&self) -> bool {
        *self != ProtectionProfile::NullCipherHmacSha1_80
    }

    pub fn authenticates(&self) -> bool {
        *self != ProtectionProfile::Aes128CmNullAuth
    }
}

impl FromStr for ProtectionProfile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| Error::ErrNoSuchSrtpProfile(s.to_owned()))
    }
}

impl fmt::Display for ProtectionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_names() {
        for p in ProtectionProfile::ALL {
            assert_eq!(p.name().parse::<ProtectionProfile>(), Ok(p));
            assert_eq!(p.keying_material_len(), 30);
        }
        assert_eq!(
            "AES_CM_256_HMAC_SHA1_80".parse::<ProtectionProfile>(),
            Err(Error::ErrNoSuchSrtpProfile("AES_CM_256_HMAC_SHA1_80".to_owned()))
        );
    }

    #[test]
    fn test_profile_from_dtls_name() {
        assert_eq!(
            ProtectionProfile::from_dtls_name("SRTP_AES128_CM_HMAC_SHA1_32"),
            Ok(ProtectionProfile::Aes128CmHmacSha1_32)
        );
        assert_eq!(
            ProtectionProfile::from_dtls_name("NULL_HMAC_SHA1_80"),
            Ok(ProtectionProfile::NullCipherHmacSha1_80)
        );
        assert!(ProtectionProfile::from_dtls_name("SRTP_AEAD_AES_128_GCM").is_err());
    }

    #[test]
    fn test_profile_tags() {
        assert_eq!(ProtectionProfile::Aes128CmHmacSha1_32.rtp_auth_tag_len(), 4);
        assert_eq!(ProtectionProfile::Aes128CmHmacSha1_32.rtcp_auth_tag_len(), 10);
        assert_eq!(ProtectionProfile::Aes128CmNullAuth.rtcp_auth_tag_len(), 0);
        assert!(!ProtectionProfile::NullCipherHmacSha1_80.encrypts());
    }
}
