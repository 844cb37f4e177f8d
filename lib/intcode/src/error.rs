use std::num::ParseIntError;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("malformed program: invalid value {token:?}")]
    MalformedProgram {
        token: String,
        #[source]
        source: ParseIntError,
    },

    #[error("invalid memory address {0}")]
    InvalidAddress(i64),

    #[error("cannot grow memory to address {0}")]
    OutOfMemory(i64),

    #[error("unknown opcode in word {word} at addr {ip}")]
    UnknownOpcode { word: i64, ip: usize },

    #[error("invalid parameter mode {mode} in word {word}")]
    InvalidMode { word: i64, mode: i64 },

    #[error("immediate write not supported at addr {ip}")]
    ImmediateWrite { ip: usize },

    #[error("cannot halt an already halted machine (addr {ip})")]
    DoubleHalt { ip: usize },

    #[error("program requested more input than was supplied")]
    InputExhausted,

    #[error("input conduit closed")]
    InputClosed,

    #[error("output conduit closed")]
    OutputClosed,

    #[error("no output produced")]
    NoOutput,

    #[error("machine stopped before halting")]
    NotHalted,
}
