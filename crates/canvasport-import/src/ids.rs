//! Identifier sources for import planning.

use uuid::Uuid;

/// Hands out fresh, never-reused identifiers.
pub trait IdGenerator {
    fn next_id(&mut self) -> String;
}

impl<F: FnMut() -> String> IdGenerator for F {
    fn next_id(&mut self) -> String {
        self()
    }
}

/// Random v4 UUIDs. The production default.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn next_id(&mut self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// `<prefix>-1`, `<prefix>-2`, … for reproducible plans.
#[derive(Debug, Clone)]
pub struct SequentialIds {
    prefix: String,
    next: u64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 1,
        }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self) -> String {
        let id = format!("{}-{}", self.prefix, self.next);
        self.next += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_ids_count_up() {
        let mut ids = SequentialIds::new("new");
        assert_eq!(ids.next_id(), "new-1");
        assert_eq!(ids.next_id(), "new-2");
    }

    #[test]
    fn uuid_ids_are_distinct() {
        let mut ids = UuidIds;
        let first = ids.next_id();
        assert_eq!(first.len(), 36);
        assert_ne!(first, ids.next_id());
    }

    #[test]
    fn closures_are_generators() {
        let mut n = 0;
        let mut ids = || {
            n += 1;
            format!("id{n}")
        };
        assert_eq!(IdGenerator::next_id(&mut ids), "id1");
    }
}
