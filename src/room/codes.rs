use rand::Rng;

/// Characters a generated room code is drawn from
pub const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
pub const ROOM_CODE_LENGTH: usize = 6;

/// Trait for generating room codes
pub trait RoomCodeGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Uniformly random six-character codes over `A-Z0-9`
pub struct RandomRoomCodeGenerator;

impl RandomRoomCodeGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RandomRoomCodeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomCodeGenerator for RandomRoomCodeGenerator {
    fn generate(&self) -> String {
        let mut rng = rand::rng();
        (0..ROOM_CODE_LENGTH)
            .map(|_| ROOM_CODE_ALPHABET[rng.random_range(0..ROOM_CODE_ALPHABET.len())] as char)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_codes_use_alphabet_and_length() {
        let generator = RandomRoomCodeGenerator::new();

        for _ in 0..50 {
            let code = generator.generate();
            assert_eq!(code.len(), ROOM_CODE_LENGTH);
            assert!(code.bytes().all(|b| ROOM_CODE_ALPHABET.contains(&b)));
        }
    }
}
