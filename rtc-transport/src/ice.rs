use shared::util::math_rand_alpha_number;

pub const UFRAG_LEN: usize = 16;
pub const PWD_LEN: usize = 32;

/// ICE short-term credentials (username fragment and password).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IceCredentials {
    pub ufrag: String,
    pub pwd: String,
}

impl IceCredentials {
    pub fn new(ufrag: impl Into<String>, pwd: impl Into<String>) -> Self {
        IceCredentials {
            ufrag: ufrag.into(),
            pwd: pwd.into(),
        }
    }

    /// Random credentials with a 16 character ufrag and 32 character password.
    pub fn generate() -> Self {
        IceCredentials {
            ufrag: math_rand_alpha_number(UFRAG_LEN),
            pwd: math_rand_alpha_number(PWD_LEN),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ufrag.is_empty() && self.pwd.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate() {
        let a = IceCredentials::generate();
        let b = IceCredentials::generate();
        assert_eq!(a.ufrag.len(), UFRAG_LEN);
        assert_eq!(a.pwd.len(), PWD_LEN);
        assert!(a.pwd.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
        assert!(IceCredentials::default().is_empty());
    }
}
