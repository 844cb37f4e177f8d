use std::{
    fmt,
    str::FromStr,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::Receiver,
    },
    task::{Poll, ready},
    thread::{self, JoinHandle},
};

use log::{debug, trace};

use crate::{
    error::{Error, Result},
    instruction::{Instruction, Mode, Opcode},
    memory::Memory,
    parse_program,
    port::{Callbacks, Channels, Port, Queue, Sink},
};

const OUTPUT_ADDR: i64 = 0;
const NOUN_ADDR: i64 = 1;
const VERB_ADDR: i64 = 2;

/// Why [`Machine::run`] returned without an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Exit {
    Halted,
    /// A stop was requested through a [`StopHandle`].
    Stopped,
}

/// Requests a running machine to stop after its current instruction.
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

pub struct Machine {
    mem: Memory,
    ip: usize,
    relative_base: i64,
    halted: bool,
    stop: StopHandle,
}

// A clone gets its own stop flag.
impl Clone for Machine {
    fn clone(&self) -> Self {
        Machine {
            mem: self.mem.clone(),
            ip: self.ip,
            relative_base: self.relative_base,
            halted: self.halted,
            stop: StopHandle::default(),
        }
    }
}

impl PartialEq for Machine {
    fn eq(&self, other: &Self) -> bool {
        self.ip == other.ip
            && self.relative_base == other.relative_base
            && self.halted == other.halted
            && self.mem == other.mem
    }
}

impl fmt::Debug for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("ip", &self.ip)
            .field("relative_base", &self.relative_base)
            .field("halted", &self.halted)
            .field("mem", &self.mem)
            .finish()
    }
}

impl FromStr for Machine {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Machine::new(s)
    }
}

impl Machine {
    /// Parses comma-separated program text into a fresh machine.
    pub fn new(program: &str) -> Result<Self> {
        Ok(Self::from_code(parse_program(program)?))
    }

    pub fn from_code(code: Vec<i64>) -> Self {
        Machine {
            mem: Memory::new(code),
            ip: 0,
            relative_base: 0,
            halted: false,
            stop: StopHandle::default(),
        }
    }

    pub fn ip(&self) -> usize {
        self.ip
    }

    pub fn relative_base(&self) -> i64 {
        self.relative_base
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn memory(&self) -> &Memory {
        &self.mem
    }

    pub fn fetch(&self, addr: i64) -> Result<i64> {
        self.mem.fetch(addr)
    }

    pub fn store(&mut self, addr: i64, val: i64) -> Result<()> {
        self.mem.store(addr, val)
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    fn word(&self, offset: usize) -> Result<i64> {
        self.mem.fetch(self.ip as i64 + offset as i64)
    }

    /// Address referred to by the `n`th parameter. Not defined for immediate
    /// mode.
    fn param_addr(&self, mode: Mode, n: usize) -> Result<i64> {
        let ptr = self.word(n)?;
        match mode {
            Mode::Position => Ok(ptr),
            Mode::Relative => Ok(self.relative_base.wrapping_add(ptr)),
            Mode::Immediate => Err(Error::ImmediateWrite { ip: self.ip }),
        }
    }

    fn read(&self, inst: &Instruction, n: usize) -> Result<i64> {
        let mode = inst.modes[n - 1];
        if let Mode::Immediate = mode {
            let val = self.word(n)?;
            trace!("Imm {}", val);
            Ok(val)
        } else {
            let ptr = self.param_addr(mode, n)?;
            let val = self.mem.fetch(ptr)?;
            trace!("Read[{}]: {}", ptr, val);
            Ok(val)
        }
    }

    fn write(&mut self, inst: &Instruction, n: usize, val: i64) -> Result<()> {
        let ptr = self.param_addr(inst.modes[n - 1], n)?;
        self.mem.store(ptr, val)
    }

    fn jump(&mut self, target: i64) -> Result<()> {
        debug!("Jump to {}", target);
        self.ip = usize::try_from(target).map_err(|_| Error::InvalidAddress(target))?;
        Ok(())
    }

    fn execute<P: Port + ?Sized>(&mut self, port: &mut P) -> Result<Poll<()>> {
        let word = self.word(0)?;
        let inst = Instruction::decode(word, self.ip)?;
        debug!("{:>6}: {:05} {}", self.ip, word, inst);

        match inst.opcode {
            Opcode::Add | Opcode::Mul | Opcode::Lt | Opcode::Eq => {
                let x = self.read(&inst, 1)?;
                let y = self.read(&inst, 2)?;
                let v = match inst.opcode {
                    Opcode::Add => x.wrapping_add(y),
                    Opcode::Mul => x.wrapping_mul(y),
                    Opcode::Lt => i64::from(x < y),
                    Opcode::Eq => i64::from(x == y),
                    _ => unreachable!(),
                };
                self.write(&inst, 3, v)?;
            }
            Opcode::In => {
                let v = match port.input() {
                    Poll::Ready(v) => v?,
                    Poll::Pending => {
                        debug!("Waiting for input at {}", self.ip);
                        return Ok(Poll::Pending);
                    }
                };
                debug!("Read input: {}", v);
                self.write(&inst, 1, v)?;
            }
            Opcode::Out => {
                let v = self.read(&inst, 1)?;
                match port.output(v) {
                    Poll::Ready(res) => res?,
                    Poll::Pending => {
                        debug!("Output not accepted at {}", self.ip);
                        return Ok(Poll::Pending);
                    }
                }
                debug!("Write output: {}", v);
            }
            Opcode::Jnz | Opcode::Jz => {
                let x = self.read(&inst, 1)?;
                let addr = self.read(&inst, 2)?;
                let jump = match inst.opcode {
                    Opcode::Jnz => x != 0,
                    Opcode::Jz => x == 0,
                    _ => unreachable!(),
                };
                if jump {
                    self.jump(addr)?;
                    return Ok(Poll::Ready(()));
                }
            }
            Opcode::Rbo => {
                let offset = self.read(&inst, 1)?;
                self.relative_base = self.relative_base.wrapping_add(offset);
                trace!("Relative base {}", self.relative_base);
            }
            Opcode::Halt => {
                if self.halted {
                    return Err(Error::DoubleHalt { ip: self.ip });
                }
                debug!("Halt at {}", self.ip);
                self.halted = true;
                return Ok(Poll::Ready(()));
            }
        }
        self.ip += inst.width();
        Ok(Poll::Ready(()))
    }

    /// Executes a single instruction.
    ///
    /// `Pending` means the port was not ready; the machine is left exactly as
    /// it was and the same instruction runs again on the next call.
    pub fn step<P: Port + ?Sized>(&mut self, port: &mut P) -> Poll<Result<()>> {
        match self.execute(port) {
            Ok(Poll::Ready(())) => Poll::Ready(Ok(())),
            Ok(Poll::Pending) => Poll::Pending,
            Err(e) => Poll::Ready(Err(e)),
        }
    }

    /// Runs until the machine halts, is stopped, fails, or suspends on `port`.
    pub fn run<P: Port + ?Sized>(&mut self, port: &mut P) -> Poll<Result<Exit>> {
        loop {
            if self.halted {
                return Poll::Ready(Ok(Exit::Halted));
            }
            if let Err(e) = ready!(self.step(port)) {
                debug!("Error at {}: {}", self.ip, e);
                return Poll::Ready(Err(e));
            }
            if !self.halted && self.stop.take() {
                debug!("Stopped at {}", self.ip);
                return Poll::Ready(Ok(Exit::Stopped));
            }
        }
    }

    /// Runs with all input supplied upfront and returns every output produced.
    pub fn run_with_inputs(&mut self, inputs: &[i64]) -> Result<Vec<i64>> {
        let mut port = Queue::new();
        port.write_port(inputs);
        match self.run(&mut port) {
            Poll::Ready(exit) => exit.map(|_| port.read_all()),
            Poll::Pending => Err(Error::InputExhausted),
        }
    }

    pub fn run_with_callbacks<I, O>(&mut self, provide: I, consume: O) -> Result<Exit>
    where
        I: FnMut() -> i64,
        O: FnMut(i64),
    {
        let mut port = Callbacks::new(provide, consume);
        match self.run(&mut port) {
            Poll::Ready(exit) => exit,
            Poll::Pending => Err(Error::InputExhausted),
        }
    }

    /// Runs on blocking conduits. `output` is dropped on return, which closes
    /// the conduit for whoever reads the other end.
    pub fn run_with_channels(
        &mut self,
        input: Receiver<i64>,
        output: impl Into<Sink>,
    ) -> Result<Exit> {
        let mut port = Channels::new(input, output);
        match self.run(&mut port) {
            Poll::Ready(exit) => exit,
            Poll::Pending => Err(Error::InputExhausted),
        }
    }

    /// Moves the machine onto its own thread, running on blocking conduits.
    pub fn spawn(
        mut self,
        input: Receiver<i64>,
        output: impl Into<Sink>,
    ) -> JoinHandle<Result<Machine>> {
        let output = output.into();
        thread::spawn(move || -> Result<Machine> {
            self.run_with_channels(input, output)?;
            Ok(self)
        })
    }

    /// Stores `noun` and `verb` at addresses 1 and 2, runs to completion, and
    /// returns the value left at address 0. Fails with `NotHalted` if a stop
    /// request ends the run first.
    pub fn run_with_noun_and_verb(&mut self, noun: i64, verb: i64) -> Result<i64> {
        self.store(NOUN_ADDR, noun)?;
        self.store(VERB_ADDR, verb)?;
        match self.run(&mut Queue::new()) {
            Poll::Ready(Ok(Exit::Halted)) => self.fetch(OUTPUT_ADDR),
            Poll::Ready(Ok(Exit::Stopped)) => Err(Error::NotHalted),
            Poll::Ready(Err(e)) => Err(e),
            Poll::Pending => Err(Error::InputExhausted),
        }
    }
}
