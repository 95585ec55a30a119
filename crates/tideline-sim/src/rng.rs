use serde::{Deserialize, Serialize};

/// Seeded LCG so a failing campaign seed reproduces on any platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self {
            state: seed ^ 0x9E37_79B9_7F4A_7C15,
        }
    }

    pub const fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        // Low bits of an LCG cycle quickly; hand out the high half.
        self.state >> 16
    }

    /// Next value in `[0, upper_exclusive)`; zero when the range is empty.
    pub const fn below(&mut self, upper_exclusive: u64) -> u64 {
        if upper_exclusive == 0 {
            return 0;
        }
        self.next_u64() % upper_exclusive
    }

    /// Next millisecond offset in `[0, span)`.
    pub fn millis_below(&mut self, span: i64) -> i64 {
        let bounded = self.below(u64::try_from(span.max(0)).unwrap_or(0));
        i64::try_from(bounded).unwrap_or(0)
    }

    /// Uniform pick from a non-empty slice.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        let len = u64::try_from(items.len()).ok()?;
        let index = usize::try_from(self.below(len)).ok()?;
        items.get(index)
    }

    /// Bernoulli trial with integer percent.
    pub fn chance(&mut self, percent: u8) -> bool {
        match percent {
            0 => false,
            100.. => true,
            p => self.below(100) < u64::from(p),
        }
    }
}
