//! Deterministic surrogate name generation.
//!
//! Names are drawn from fixed word lists in allocation order, so every
//! allocation within a run yields a distinct human-readable name without
//! randomness. Distinctness is by construction: the generator walks all
//! first/last combinations before appending a numeric suffix.

const FIRST_NAMES: &[&str] = &[
    "Alma", "Basil", "Clara", "Dexter", "Edith", "Felix", "Greta", "Hugo", "Iris", "Jasper",
    "Klara", "Lionel", "Mabel", "Nestor", "Opal", "Percy", "Quinn", "Rosa", "Silas", "Thea",
    "Ulric", "Vera", "Wilbur", "Xenia", "Yara", "Zeno",
];

const LAST_NAMES: &[&str] = &[
    "Ashford", "Barlow", "Cardew", "Draper", "Ellery", "Fenwick", "Garrick", "Hale", "Ingram",
    "Jardine", "Kestrel", "Lockwood", "Merton", "Norwood", "Ockham", "Pemberton", "Quill",
    "Rutland", "Severn", "Thorpe", "Underhill", "Vance", "Wexford", "Yates",
];

/// Allocation-ordered surrogate name generator.
#[derive(Debug, Default)]
pub struct SurrogateNames {
    next: usize,
}

impl SurrogateNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce the next surrogate full name, e.g. `"Alma Ashford"`.
    ///
    /// After all first/last combinations are exhausted, a numeric suffix
    /// keeps names distinct (`"Alma Ashford 2"`).
    pub fn next_name(&mut self) -> String {
        let idx = self.next;
        self.next += 1;

        let first = FIRST_NAMES[idx % FIRST_NAMES.len()];
        let last = LAST_NAMES[(idx / FIRST_NAMES.len()) % LAST_NAMES.len()];
        let cycle = idx / (FIRST_NAMES.len() * LAST_NAMES.len());

        if cycle == 0 {
            format!("{first} {last}")
        } else {
            format!("{first} {last} {}", cycle + 1)
        }
    }

    /// Derive a mailbox local part from a surrogate name
    /// (`"Alma Ashford"` → `"alma.ashford"`).
    pub fn local_part(name: &str) -> String {
        name.to_lowercase().replace(' ', ".")
    }
}
