use rand::RngCore;

/// Patient-facing booking token: 8 hex characters from 4 random
/// bytes. Opaque and non-sequential so tokens cannot be guessed from
/// one another.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 4];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
