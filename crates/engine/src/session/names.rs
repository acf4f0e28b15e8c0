//! Placeholder display names for new sessions.

use gamehub_domain::PlayerName;
use rand::seq::SliceRandom;

const ADJECTIVES: &[&str] = &[
    "Admiring", "Bold", "Brave", "Clever", "Dazzling", "Eager", "Elegant", "Festive", "Gallant",
    "Happy", "Jolly", "Keen", "Lucid", "Merry", "Nifty", "Patient", "Quirky", "Relaxed",
    "Serene", "Sleepy", "Stoic", "Trusting", "Vibrant", "Wizardly", "Zealous",
];

const SURNAMES: &[&str] = &[
    "Babbage", "Bohr", "Curie", "Darwin", "Euler", "Fermat", "Galileo", "Hopper", "Hypatia",
    "Kepler", "Lamarr", "Lovelace", "Meitner", "Newton", "Noether", "Pascal", "Ramanujan",
    "Shannon", "Tesla", "Turing", "Volta", "Wright",
];

/// A random "Adjective Surname" name.
pub fn placeholder_name() -> PlayerName {
    let mut rng = rand::thread_rng();
    match (ADJECTIVES.choose(&mut rng), SURNAMES.choose(&mut rng)) {
        (Some(adjective), Some(surname)) => {
            PlayerName::new(format!("{adjective} {surname}")).unwrap_or_else(|_| PlayerName::anonymous())
        }
        _ => PlayerName::anonymous(),
    }
}
