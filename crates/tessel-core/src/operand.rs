use std::fmt;

use crate::error::Error;

/// Selects which operand of a binary kernel a backward pass targets.
///
/// Integer selectors coming from an orchestration layer convert through
/// `TryFrom<usize>`: 0 is the left operand (or the sole input), 1 is the
/// right operand (or the target of a loss).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    Left,
    Right,
}

impl Operand {
    /// The other operand of a binary op.
    pub fn other(self) -> Self {
        match self {
            Operand::Left => Operand::Right,
            Operand::Right => Operand::Left,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Operand::Left => 0,
            Operand::Right => 1,
        }
    }
}

impl TryFrom<usize> for Operand {
    type Error = Error;

    fn try_from(idx: usize) -> Result<Self, Error> {
        match idx {
            0 => Ok(Operand::Left),
            1 => Ok(Operand::Right),
            other => Err(Error::InvalidOperand(other)),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Left => write!(f, "left"),
            Operand::Right => write!(f, "right"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_from_index() {
        assert_eq!(Operand::try_from(0).unwrap(), Operand::Left);
        assert_eq!(Operand::try_from(1).unwrap(), Operand::Right);
        assert!(matches!(Operand::try_from(2), Err(Error::InvalidOperand(2))));
    }

    #[test]
    fn test_other() {
        assert_eq!(Operand::Left.other(), Operand::Right);
        assert_eq!(Operand::Right.other().index(), 0);
    }
}
