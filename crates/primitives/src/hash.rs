use sha2::{Digest, Sha256};

pub type Hash256 = [u8; 32];
pub type Hash160 = [u8; 20];

pub fn sha256(data: &[u8]) -> Hash256 {
    Sha256::digest(data).into()
}

/// Double SHA-256, used for txids, block hashes and address checksums.
pub fn sha256d(data: &[u8]) -> Hash256 {
    sha256(&sha256(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256d_of_empty_input() {
        let digest = sha256d(b"");
        assert_eq!(&digest[..4], &[0x5d, 0xf6, 0xe0, 0xe2]);
    }
}
