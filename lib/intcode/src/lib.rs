//! An Intcode virtual machine.
//!
//! A [`Machine`] is built from comma-separated program text and talks to the
//! outside world only through a [`Port`]. Ports decide how input and output
//! are exchanged: buffered in a [`Queue`], through [`Callbacks`], or over
//! blocking [`Channels`] when machines run on separate threads.
//!
//! ```
//! use intcode::Machine;
//!
//! let mut vm: Machine = "3,9,8,9,10,9,4,9,99,-1,8".parse().unwrap();
//! assert_eq!(vm.run_with_inputs(&[8]).unwrap(), vec![1]);
//! ```

mod error;
pub mod instruction;
mod machine;
pub mod memory;
pub mod network;
pub mod port;

pub use error::{Error, Result};
pub use instruction::{Instruction, Mode, Opcode};
pub use machine::{Exit, Machine, StopHandle};
pub use memory::Memory;
pub use port::{Callbacks, Channels, Port, Queue, Sink, conduit};

/// Parses comma-separated program text. Whitespace around the whole text is
/// ignored, but every token must be a valid integer.
pub fn parse_program(input: &str) -> Result<Vec<i64>> {
    input
        .trim()
        .split(',')
        .map(|s| {
            s.parse().map_err(|source| Error::MalformedProgram {
                token: s.to_string(),
                source,
            })
        })
        .collect()
}
