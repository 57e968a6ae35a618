//! Cube scramble generation

use rand::Rng;

const FACES: [char; 6] = ['R', 'L', 'U', 'D', 'F', 'B'];
const MODIFIERS: [&str; 3] = ["", "'", "2"];

/// Generate a random scramble of `length` moves, space separated.
///
/// Consecutive moves never turn the same face.
pub fn generate_scramble(length: usize) -> String {
    let mut rng = rand::thread_rng();
    let mut moves: Vec<String> = Vec::with_capacity(length);
    let mut last_face: Option<char> = None;

    for _ in 0..length {
        let face = loop {
            let candidate = FACES[rng.gen_range(0..FACES.len())];
            if last_face != Some(candidate) {
                break candidate;
            }
        };
        let modifier = MODIFIERS[rng.gen_range(0..MODIFIERS.len())];

        moves.push(format!("{}{}", face, modifier));
        last_face = Some(face);
    }

    moves.join(" ")
}
