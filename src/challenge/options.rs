use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Challenge option bitmask.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ChallengeOptions(u8);

impl ChallengeOptions {
    pub const NONE: Self = Self(0);
    /// Collect failure records into a fresh recorder for this call.
    pub const RECORD: Self = Self(1);
    /// Keep walking after a failure; every failure in the tree is reached.
    pub const CONTINUE: Self = Self(1 << 1);

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & (Self::RECORD.0 | Self::CONTINUE.0))
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for ChallengeOptions {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for ChallengeOptions {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for ChallengeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.contains(Self::RECORD) {
            names.push("RECORD");
        }
        if self.contains(Self::CONTINUE) {
            names.push("CONTINUE");
        }
        if names.is_empty() {
            f.write_str("NONE")
        } else {
            f.write_str(&names.join(" | "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_combine() {
        let mut opts = ChallengeOptions::RECORD;
        assert!(!opts.contains(ChallengeOptions::CONTINUE));
        opts |= ChallengeOptions::CONTINUE;
        assert!(opts.contains(ChallengeOptions::RECORD | ChallengeOptions::CONTINUE));
        assert_eq!(format!("{opts:?}"), "RECORD | CONTINUE");
        assert_eq!(ChallengeOptions::from_bits_truncate(0xff), opts);
        assert!(ChallengeOptions::NONE.contains(ChallengeOptions::NONE));
    }
}
