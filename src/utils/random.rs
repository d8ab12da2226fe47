//! Random sources for nonces, cookies and initial sequence numbers.

/// Fill a fixed-size array from the operating system CSPRNG.
pub fn bytes<const N: usize>() -> Result<[u8; N], getrandom::Error> {
    let mut buf = [0u8; N];
    getrandom::fill(&mut buf)?;
    Ok(buf)
}

/// Uniform starting sequence in `0..=65535`.
pub fn sequence() -> u16 {
    rand::random::<u16>()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_are_not_constant() {
        let a = bytes::<32>().unwrap();
        let b = bytes::<32>().unwrap();
        assert_ne!(a, b);
    }
}
