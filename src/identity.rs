//! Random identities for test isolation
//!
//! Every round-trip owns a freshly generated sender, recipients,
//! subject and body, so concurrent runs against a shared mailbox
//! never see each other's messages.

use rand::Rng;
use rand::seq::SliceRandom;

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Length of both the local part and the domain label.
const TOKEN_LEN: usize = 8;

/// Generate a random `local@domain.com` address.
#[must_use]
pub fn random_address() -> String {
    format!("{}@{}.com", letters(TOKEN_LEN), letters(TOKEN_LEN))
}

/// Generate `length` random ASCII letters, then overwrite up to
/// `splits` interior positions with spaces.
///
/// Positions are drawn independently, so two splits may land on the
/// same character. The first and last characters are never spaces.
#[must_use]
pub fn random_text(length: usize, splits: usize) -> String {
    let mut text: Vec<char> = letters(length).chars().collect();

    if length >= 3 {
        let mut rng = rand::thread_rng();
        for _ in 0..splits {
            let i = rng.gen_range(1..length - 1);
            text[i] = ' ';
        }
    }

    text.into_iter().collect()
}

fn letters(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .filter_map(|_| LETTERS.choose(&mut rng).map(|&b| char::from(b)))
        .collect()
}
