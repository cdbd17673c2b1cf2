//! PRNG utilities for the crypto primitives.
//!
//! See the [crypto module] documentation since this is a private module anyways.
//!
//! [crypto module]: crate::crypto

use num::{bigint::BigUint, traits::identities::Zero};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sodiumoxide::randombytes::randombytes_into;

use crate::crypto::hash::Sha256;

/// Domain separation tag for keying mask streams.
const MASK_STREAM_DOMAIN: &[u8] = b"secagg-mask-stream-v1";

/// Generates a secure pseudo-random integer.
///
/// Draws from a uniform distribution over the integers between zero (included) and
/// `max_int` (excluded). Employs the `ChaCha20` stream cipher as a PRNG and rejection sampling on
/// the bit length of `max_int`, hence the output is a pure function of the state of `prng`.
pub fn generate_integer(prng: &mut ChaCha20Rng, max_int: &BigUint) -> BigUint {
    if max_int.is_zero() {
        return BigUint::zero();
    }
    let mut bytes = max_int.to_bytes_le();
    let excess_bits = bytes.len() * 8 - max_int.bits() as usize;
    let top_mask = 0xff_u8 >> excess_bits;
    loop {
        prng.fill_bytes(&mut bytes);
        if let Some(top) = bytes.last_mut() {
            *top &= top_mask;
        }
        let rand_int = BigUint::from_bytes_le(&bytes);
        if &rand_int < max_int {
            return rand_int;
        }
    }
}

/// Draws a uniformly random integer between zero (included) and `max_int` (excluded) from system
/// entropy.
///
/// `sodiumoxide::init()` must have been called before.
pub fn random_integer(max_int: &BigUint) -> BigUint {
    let mut seed = [0_u8; 32];
    randombytes_into(&mut seed);
    generate_integer(&mut ChaCha20Rng::from_seed(seed), max_int)
}

/// Creates the PRNG whose stream defines the mask of the given `seed`.
///
/// The key is a `SHA256` digest over a domain tag and the big-endian bytes of the seed, so the
/// stream is identical on every platform.
pub(crate) fn mask_stream(seed: &BigUint) -> ChaCha20Rng {
    let key = Sha256::hash_parts(&[MASK_STREAM_DOMAIN, &seed.to_bytes_be()]);
    ChaCha20Rng::from_seed(key.as_array())
}

#[cfg(test)]
mod tests {
    use std::iter;

    use num::traits::{pow::Pow, One};

    use super::*;

    #[test]
    fn test_generate_integer_range() {
        let mut prng = ChaCha20Rng::from_seed([0_u8; 32]);
        for max_int in [1_u32, 2, 255, 256, 257, 100_103].iter() {
            let max_int = BigUint::from(*max_int);
            assert!(iter::repeat_with(|| generate_integer(&mut prng, &max_int))
                .take(100)
                .all(|int| int < max_int));
        }
        let max_int = BigUint::from(u128::max_value()).pow(2_usize);
        assert!(generate_integer(&mut prng, &max_int) < max_int);
    }

    #[test]
    fn test_generate_integer_zero_and_one() {
        let mut prng = ChaCha20Rng::from_seed([0_u8; 32]);
        assert_eq!(generate_integer(&mut prng, &BigUint::zero()), BigUint::zero());
        assert_eq!(generate_integer(&mut prng, &BigUint::one()), BigUint::zero());
    }

    #[test]
    fn test_generate_integer_deterministic() {
        let max_int = BigUint::from(100_103_u32);
        let mut prng_1 = ChaCha20Rng::from_seed([7_u8; 32]);
        let mut prng_2 = ChaCha20Rng::from_seed([7_u8; 32]);
        let ints_1 = iter::repeat_with(|| generate_integer(&mut prng_1, &max_int))
            .take(50)
            .collect::<Vec<_>>();
        let ints_2 = iter::repeat_with(|| generate_integer(&mut prng_2, &max_int))
            .take(50)
            .collect::<Vec<_>>();
        assert_eq!(ints_1, ints_2);
    }

    #[test]
    fn test_random_integer() {
        sodiumoxide::init().unwrap();
        let max_int = BigUint::from(100_103_u32);
        assert!(iter::repeat_with(|| random_integer(&max_int))
            .take(100)
            .all(|int| int < max_int));
    }

    #[test]
    fn test_mask_stream() {
        let seed = BigUint::from(4242_u32);
        let mut stream_1 = mask_stream(&seed);
        let mut stream_2 = mask_stream(&seed);
        let mut stream_3 = mask_stream(&BigUint::from(4243_u32));
        let (first, second, third) = (stream_1.next_u64(), stream_2.next_u64(), stream_3.next_u64());
        assert_eq!(first, second);
        assert_ne!(first, third);
    }
}
