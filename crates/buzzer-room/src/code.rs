//! Room code generation.

use buzzer_protocol::{ROOM_CODE_ALPHABET, ROOM_CODE_LEN, RoomCode};
use rand::Rng;

/// Draws a random code. Says nothing about uniqueness.
pub fn random_room_code<R: Rng>(rng: &mut R) -> RoomCode {
    let indices: [usize; ROOM_CODE_LEN] =
        std::array::from_fn(|_| rng.random_range(0..ROOM_CODE_ALPHABET.len()));
    RoomCode::from_indices(indices)
}

/// Draws codes until one is not taken.
///
/// Unbounded, but with 32^4 (about a million) codes and a handful of live
/// rooms a retry is already rare.
pub fn unique_room_code<R, F>(rng: &mut R, mut taken: F) -> RoomCode
where
    R: Rng,
    F: FnMut(&RoomCode) -> bool,
{
    loop {
        let code = random_room_code(rng);
        if !taken(&code) {
            return code;
        }
        tracing::debug!(%code, "room code collision, retrying");
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn test_random_room_code_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let code = random_room_code(&mut rng);
            assert_eq!(code.as_str().len(), ROOM_CODE_LEN);
            assert!(code.as_str().bytes().all(|b| ROOM_CODE_ALPHABET.contains(&b)));
            assert!(!code.as_str().contains(['0', 'O', '1', 'I']));
        }
    }

    #[test]
    fn test_unique_room_code_skips_taken_codes() {
        // Same seed twice: the first draw of the second rng is exactly the
        // code we mark as taken, so it has to retry.
        let first = random_room_code(&mut StdRng::seed_from_u64(42));
        let mut rng = StdRng::seed_from_u64(42);

        let code = unique_room_code(&mut rng, |c| *c == first);
        assert_ne!(code, first);
    }

    #[test]
    fn test_unique_room_code_many_distinct() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut live = HashSet::new();
        for _ in 0..2000 {
            let code = unique_room_code(&mut rng, |c| live.contains(c));
            assert!(live.insert(code));
        }
    }
}
