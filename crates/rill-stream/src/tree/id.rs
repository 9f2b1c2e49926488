//! Deterministic node ids.

/// Monotonic id source scoped to one builder.
///
/// Ids take the form `<tag>-<n>` with `n` starting at 1. The counter is not
/// derived from content, so replaying the same events through a fresh
/// generator reproduces the same ids.
#[derive(Debug, Default, Clone)]
pub struct IdGenerator {
    counter: u64,
}

impl IdGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self, tag: &str) -> String {
        self.counter += 1;
        format!("{tag}-{}", self.counter)
    }

    pub fn reset(&mut self) {
        self.counter = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence() {
        let mut ids = IdGenerator::new();
        assert_eq!(ids.next("root"), "root-1");
        assert_eq!(ids.next("paragraph"), "paragraph-2");
        assert_eq!(ids.next("text"), "text-3");
    }

    #[test]
    fn test_reset_restarts_counter() {
        let mut ids = IdGenerator::new();
        ids.next("root");
        ids.next("hr");
        ids.reset();
        assert_eq!(ids.next("root"), "root-1");
    }

    #[test]
    fn test_independent_generators_agree() {
        let mut a = IdGenerator::new();
        let mut b = IdGenerator::new();
        for tag in ["root", "heading", "text", "list", "list-item"] {
            assert_eq!(a.next(tag), b.next(tag));
        }
    }
}
