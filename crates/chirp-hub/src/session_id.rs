//! Session id generation.

use chirp_core::user::{SESSION_ID_SPACE as SPACE, SessionId};
use rand_core::{OsRng, RngCore};

/// Largest multiple of [`SPACE`] that fits in a `u64`; draws at or above it
/// are rejected so every id is equally likely.
const ZONE: u64 = u64::MAX - u64::MAX % SPACE;

/// A fresh session id drawn from the operating system's CSPRNG.
pub fn generate() -> SessionId { generate_with(&mut OsRng) }

pub fn generate_with<R: RngCore + ?Sized>(rng: &mut R) -> SessionId {
  loop {
    let draw = rng.next_u64();
    if draw < ZONE
      && let Some(id) = SessionId::from_number(draw % SPACE)
    {
      return id;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  /// Replays a fixed sequence of `u64`s.
  struct Scripted(Vec<u64>);

  impl RngCore for Scripted {
    fn next_u32(&mut self) -> u32 { self.next_u64() as u32 }

    fn next_u64(&mut self) -> u64 { self.0.remove(0) }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
      for chunk in dest.chunks_mut(8) {
        let bytes = self.next_u64().to_le_bytes();
        chunk.copy_from_slice(&bytes[..chunk.len()]);
      }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
      self.fill_bytes(dest);
      Ok(())
    }
  }

  #[test]
  fn ids_are_sixteen_digits() {
    for _ in 0..64 {
      let id = generate();
      assert_eq!(id.as_str().len(), 16);
      assert!(id.as_str().bytes().all(|b| b.is_ascii_digit()));
    }
  }

  #[test]
  fn small_draws_keep_leading_zeros() {
    let id = generate_with(&mut Scripted(vec![7]));
    assert_eq!(id.as_str(), "0000000000000007");
  }

  #[test]
  fn draws_in_the_biased_tail_are_rejected() {
    let id = generate_with(&mut Scripted(vec![u64::MAX, ZONE, SPACE + 5]));
    assert_eq!(id.as_str(), "0000000000000005");
  }
}
