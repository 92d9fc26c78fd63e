//! Deterministic display names from curated name lists.
//!
//! Names are cosmetic: nothing in the model reads them. They are drawn
//! from their own stream (`StreamSlot::Names`) so that adding, removing or
//! reordering names never changes a single covariate value.

use crate::rng::SimRng;

/// Deterministic "First Last" name generator.
pub struct NameGenerator;

impl NameGenerator {
    /// Generate a full name (first + last) deterministically.
    pub fn full_name(rng: &mut SimRng) -> String {
        let first = Self::pick(rng, FIRST_NAMES);
        let last = Self::pick(rng, LAST_NAMES);
        format!("{first} {last}")
    }

    /// `n` names in draw order.
    pub fn names(rng: &mut SimRng, n: usize) -> Vec<String> {
        (0..n).map(|_| Self::full_name(rng)).collect()
    }

    fn pick(rng: &mut SimRng, list: &'static [&'static str]) -> &'static str {
        list[rng.next_u64_below(list.len() as u64) as usize]
    }
}

const FIRST_NAMES: &[&str] = &[
    "Aaliyah", "Aaron", "Abigail", "Adrian", "Aiden", "Alana", "Alejandro", "Alice",
    "Amara", "Andre", "Angela", "Anika", "Arjun", "Audrey", "Beatriz", "Benjamin",
    "Bianca", "Brandon", "Caleb", "Camila", "Carlos", "Chloe", "Connor", "Dalia",
    "Daniel", "Darius", "Delia", "Diego", "Elena", "Eli", "Emeka", "Emily",
    "Esther", "Ethan", "Farah", "Felix", "Fiona", "Gabriel", "Grace", "Hana",
    "Hector", "Imani", "Isaac", "Ivy", "Jamal", "Jasmine", "Javier", "Jin",
    "Julia", "Kai", "Keisha", "Kenji", "Layla", "Leo", "Lucia", "Malik",
    "Maya", "Mei", "Miguel", "Nadia", "Naomi", "Nikhil", "Noah", "Olivia",
    "Omar", "Paige", "Priya", "Quentin", "Rafael", "Rosa", "Ryan", "Samira",
    "Sean", "Sofia", "Tariq", "Tessa", "Theo", "Uma", "Victor", "Wen",
    "Xavier", "Yara", "Yusuf", "Zara", "Zoe",
];

const LAST_NAMES: &[&str] = &[
    "Abbott", "Adeyemi", "Alvarez", "Baker", "Banerjee", "Brooks", "Castillo", "Chen",
    "Clarke", "Cohen", "Delgado", "Diaz", "Edwards", "Evans", "Fischer", "Flores",
    "Garcia", "Gomez", "Gupta", "Hall", "Harris", "Hoang", "Ibrahim", "Jackson",
    "Jensen", "Johnson", "Kapoor", "Kim", "Kowalski", "Lee", "Lopez", "Martin",
    "Mendoza", "Miller", "Moreau", "Nakamura", "Nguyen", "Novak", "Okafor", "Olsen",
    "Ortiz", "Park", "Patel", "Perez", "Quinn", "Ramirez", "Reyes", "Robinson",
    "Rossi", "Sanchez", "Schmidt", "Shah", "Silva", "Singh", "Smith", "Sullivan",
    "Tanaka", "Taylor", "Thompson", "Torres", "Tran", "Usman", "Vargas", "Walker",
    "Wang", "Williams", "Wilson", "Wright", "Xu", "Yamamoto", "Young", "Zhang",
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{RngBank, StreamSlot};

    #[test]
    fn generates_two_part_names() {
        let mut rng = RngBank::new(12345).stream(StreamSlot::Names);

        for _ in 0..100 {
            let name = NameGenerator::full_name(&mut rng);
            let parts: Vec<&str> = name.split_whitespace().collect();
            assert_eq!(parts.len(), 2, "Name should have exactly 2 parts: {name}");
        }
    }

    #[test]
    fn same_seed_same_names() {
        let bank = RngBank::new(777);
        let a = NameGenerator::names(&mut bank.stream(StreamSlot::Names), 20);
        let b = NameGenerator::names(&mut bank.stream(StreamSlot::Names), 20);
        assert_eq!(a, b);
    }
}
