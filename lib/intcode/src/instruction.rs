use std::fmt;

use crate::error::{Error, Result};

/// How an instruction parameter is interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    /// The parameter is an address.
    Position = 0,
    /// The parameter is the value itself. Never valid for a destination.
    Immediate = 1,
    /// The parameter is an address offset from the relative base.
    Relative = 2,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Position, Mode::Immediate, Mode::Relative];

    fn from_digit(word: i64, digit: i64) -> Result<Self> {
        match digit {
            0 => Ok(Mode::Position),
            1 => Ok(Mode::Immediate),
            2 => Ok(Mode::Relative),
            _ => Err(Error::InvalidMode { word, mode: digit }),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Mode::Position => write!(f, "P"),
            Mode::Immediate => write!(f, "I"),
            Mode::Relative => write!(f, "R"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Opcode {
    Add = 1,
    Mul = 2,
    In = 3,
    Out = 4,
    Jnz = 5,
    Jz = 6,
    Lt = 7,
    Eq = 8,
    Rbo = 9,
    Halt = 99,
}

impl Opcode {
    pub const ALL: [Opcode; 10] = [
        Opcode::Add,
        Opcode::Mul,
        Opcode::In,
        Opcode::Out,
        Opcode::Jnz,
        Opcode::Jz,
        Opcode::Lt,
        Opcode::Eq,
        Opcode::Rbo,
        Opcode::Halt,
    ];

    /// Number of parameters following the opcode word.
    pub fn arity(self) -> usize {
        match self {
            Opcode::Add | Opcode::Mul | Opcode::Lt | Opcode::Eq => 3,
            Opcode::Jnz | Opcode::Jz => 2,
            Opcode::In | Opcode::Out | Opcode::Rbo => 1,
            Opcode::Halt => 0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Opcode::Add => "add",
            Opcode::Mul => "mul",
            Opcode::In => "in",
            Opcode::Out => "out",
            Opcode::Jnz => "jnz",
            Opcode::Jz => "jz",
            Opcode::Lt => "lt",
            Opcode::Eq => "eq",
            Opcode::Rbo => "rbo",
            Opcode::Halt => "halt",
        }
    }
}

impl TryFrom<i64> for Opcode {
    type Error = i64;

    fn try_from(n: i64) -> std::result::Result<Self, i64> {
        match n {
            1 => Ok(Opcode::Add),
            2 => Ok(Opcode::Mul),
            3 => Ok(Opcode::In),
            4 => Ok(Opcode::Out),
            5 => Ok(Opcode::Jnz),
            6 => Ok(Opcode::Jz),
            7 => Ok(Opcode::Lt),
            8 => Ok(Opcode::Eq),
            9 => Ok(Opcode::Rbo),
            99 => Ok(Opcode::Halt),
            _ => Err(n),
        }
    }
}

/// A decoded instruction word.
///
/// Given a word with decimal digits `ABCDE`, `DE` is the opcode and `C`, `B`,
/// `A` are the modes of the first, second and third parameter. Digits above
/// `A`, and invalid mode digits for parameters the opcode does not take, are
/// ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Instruction {
    pub opcode: Opcode,
    pub modes: [Mode; 3],
}

impl Instruction {
    pub fn new(opcode: Opcode, modes: [Mode; 3]) -> Self {
        Instruction { opcode, modes }
    }

    /// Decodes `word`. The caller supplies `ip` only so that an unknown opcode
    /// can be reported with its location.
    pub fn decode(word: i64, ip: usize) -> Result<Self> {
        let opcode = Opcode::try_from(word % 100).map_err(|_| Error::UnknownOpcode { word, ip })?;
        let mut modes = [Mode::Position; 3];
        let mut rest = word / 100;
        for (k, mode) in modes.iter_mut().enumerate() {
            match Mode::from_digit(word, rest % 10) {
                Ok(m) => *mode = m,
                // Digits in slots the opcode has no parameter for are ignored.
                Err(e) if k < opcode.arity() => return Err(e),
                Err(_) => (),
            }
            rest /= 10;
        }
        Ok(Instruction { opcode, modes })
    }

    pub fn encode(&self) -> i64 {
        let [c, b, a] = self.modes;
        (a as i64) * 10000 + (b as i64) * 1000 + (c as i64) * 100 + self.opcode as i64
    }

    /// Total length in words, opcode included.
    pub fn width(&self) -> usize {
        self.opcode.arity() + 1
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.opcode.name())?;
        let arity = self.opcode.arity();
        if arity > 0 {
            write!(f, " ")?;
            for mode in &self.modes[..arity] {
                write!(f, "{}", mode)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::{Instruction, Mode, Opcode};
    use crate::error::Error;

    #[test]
    fn test_decode() {
        let inst = Instruction::decode(1002, 0).unwrap();
        assert_eq!(inst.opcode, Opcode::Mul);
        assert_eq!(inst.modes, [Mode::Position, Mode::Immediate, Mode::Position]);

        let inst = Instruction::decode(21101, 0).unwrap();
        assert_eq!(inst.opcode, Opcode::Add);
        assert_eq!(inst.modes, [Mode::Immediate, Mode::Immediate, Mode::Relative]);

        let inst = Instruction::decode(99, 0).unwrap();
        assert_eq!(inst.opcode, Opcode::Halt);
        assert_eq!(inst.width(), 1);
    }

    #[test]
    fn test_decode_error() {
        assert_eq!(
            Instruction::decode(42, 7),
            Err(Error::UnknownOpcode { word: 42, ip: 7 })
        );
        assert_eq!(
            Instruction::decode(0, 0),
            Err(Error::UnknownOpcode { word: 0, ip: 0 })
        );
        assert_eq!(
            Instruction::decode(-1, 3),
            Err(Error::UnknownOpcode { word: -1, ip: 3 })
        );
        assert_eq!(
            Instruction::decode(301, 0),
            Err(Error::InvalidMode { word: 301, mode: 3 })
        );
        assert_eq!(
            Instruction::decode(90101, 0),
            Err(Error::InvalidMode { word: 90101, mode: 9 })
        );
    }

    #[test]
    fn test_decode_unused_modes() {
        let inst = Instruction::decode(399, 0).unwrap();
        assert_eq!(inst.opcode, Opcode::Halt);
        assert_eq!(inst.modes, [Mode::Position; 3]);

        let inst = Instruction::decode(30104, 0).unwrap();
        assert_eq!(inst.opcode, Opcode::Out);
        assert_eq!(inst.modes, [Mode::Immediate, Mode::Position, Mode::Position]);

        let inst = Instruction::decode(30003, 0).unwrap();
        assert_eq!(inst.opcode, Opcode::In);
        assert_eq!(inst.modes, [Mode::Position; 3]);

        let inst = Instruction::decode(21299, 0).unwrap();
        assert_eq!(inst.modes, [Mode::Relative, Mode::Immediate, Mode::Relative]);
    }

    #[test]
    fn test_roundtrip() {
        for opcode in Opcode::ALL {
            for a in Mode::ALL {
                for b in Mode::ALL {
                    for c in Mode::ALL {
                        let inst = Instruction::new(opcode, [c, b, a]);
                        assert_eq!(Instruction::decode(inst.encode(), 0), Ok(inst));
                    }
                }
            }
        }
    }

    #[test]
    fn test_display() {
        let inst = Instruction::decode(1201, 0).unwrap();
        assert_eq!(inst.to_string(), "add RIP");
        assert_eq!(Instruction::decode(99, 0).unwrap().to_string(), "halt");
        assert_eq!(Instruction::decode(204, 0).unwrap().to_string(), "out R");
    }
}
