//! Amplifier topologies: several copies of one program wired output to input.

use std::{iter, panic, thread};

use log::{debug, info};

use crate::{
    error::{Error, Result},
    machine::Machine,
    port::conduit,
};

/// Runs one machine per phase setting in sequence. Each machine receives its
/// phase and then the previous machine's last output.
pub fn chain(program: &[i64], phases: &[i64], signal: i64) -> Result<i64> {
    if phases.is_empty() {
        return Err(Error::NoOutput);
    }
    let mut signal = signal;
    for (id, &phase) in phases.iter().enumerate() {
        let mut vm = Machine::from_code(program.to_vec());
        let output = vm.run_with_inputs(&[phase, signal])?;
        signal = *output.last().ok_or(Error::NoOutput)?;
        debug!("Amplifier {} (phase {}) -> {}", id, phase, signal);
    }
    Ok(signal)
}

/// Runs one machine per phase setting on its own thread, with the last
/// machine's output fed back into the first. Returns the last value the final
/// machine emitted before halting.
pub fn feedback_loop(program: &[i64], phases: &[i64], signal: i64) -> Result<i64> {
    if phases.is_empty() {
        return Err(Error::NoOutput);
    }

    let (sinks, sources): (Vec<_>, Vec<_>) = phases.iter().map(|_| conduit(None)).unzip();
    for (sink, &phase) in sinks.iter().zip(phases) {
        sink.send(phase)?;
    }
    sinks[0].send(signal)?;

    let (feedback, feedback_rx) = conduit(None);
    let mut sinks = sinks.into_iter();
    // The first machine's input stays here so that feedback can be forwarded.
    let head = sinks.next().ok_or(Error::NoOutput)?;

    thread::scope(|s| {
        let handles = sources
            .into_iter()
            .zip(sinks.chain(iter::once(feedback)))
            .enumerate()
            .map(|(id, (input, output))| {
                let code = program.to_vec();
                s.spawn(move || {
                    let mut vm = Machine::from_code(code);
                    let exit = vm.run_with_channels(input, output);
                    info!("Amplifier {} exited: {:?}", id, exit);
                    exit
                })
            })
            .collect::<Vec<_>>();

        let mut last = None;
        for value in feedback_rx.iter() {
            last = Some(value);
            if head.send(value).is_err() {
                debug!("First amplifier gone, dropping {}", value);
            }
        }
        drop(head);

        let mut errors = Vec::new();
        for handle in handles {
            match handle.join() {
                Ok(Ok(_)) => (),
                Ok(Err(e)) => errors.push(e),
                Err(payload) => panic::resume_unwind(payload),
            }
        }
        if let Some(e) = first_cause(errors) {
            return Err(e);
        }
        last.ok_or(Error::NoOutput)
    })
}

// A fault in one machine shows up as closed conduits in its neighbours, so
// prefer the error that is not a disconnect.
fn first_cause(errors: Vec<Error>) -> Option<Error> {
    let is_disconnect = |e: &Error| matches!(e, Error::InputClosed | Error::OutputClosed);
    if let Some(pos) = errors.iter().position(|e| !is_disconnect(e)) {
        errors.into_iter().nth(pos)
    } else {
        errors.into_iter().next()
    }
}

#[cfg(test)]
mod test {
    use super::{chain, feedback_loop};
    use crate::{error::Error, parse_program};

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_chain() {
        init_logger();
        let program = vec![
            3, 15, 3, 16, 1002, 16, 10, 16, 1, 16, 15, 15, 4, 15, 99, 0, 0,
        ];
        assert_eq!(chain(&program, &[4, 3, 2, 1, 0], 0), Ok(43210));

        let program = vec![
            3, 23, 3, 24, 1002, 24, 10, 24, 1002, 23, -1, 23, 101, 5, 23, 23, 1, 24, 23, 23, 4, 23, 99,
            0, 0,
        ];
        assert_eq!(chain(&program, &[0, 1, 2, 3, 4], 0), Ok(54321));

        let program = vec![
            3, 31, 3, 32, 1002, 32, 10, 32, 1001, 31, -2, 31, 1007, 31, 0, 33, 1002, 33, 7, 33, 1, 33,
            31, 31, 1, 32, 31, 31, 4, 31, 99, 0, 0, 0,
        ];
        assert_eq!(chain(&program, &[1, 0, 4, 3, 2], 0), Ok(65210));
    }

    #[test]
    fn test_feedback() {
        init_logger();
        let program = parse_program(
            "3,26,1001,26,-4,26,3,27,1002,27,2,27,1,27,26,27,4,27,1001,28,-1,28,1005,28,6,99,0,0,5",
        )
        .unwrap();
        assert_eq!(feedback_loop(&program, &[9, 8, 7, 6, 5], 0), Ok(139629729));

        let program = vec![
            3, 52, 1001, 52, -5, 52, 3, 53, 1, 52, 56, 54, 1007, 54, 5, 55, 1005, 55, 26, 1001, 54, -5,
            54, 1105, 1, 12, 1, 53, 54, 53, 1008, 54, 0, 55, 1001, 55, 1, 55, 2, 53, 55, 53, 4, 53,
            1001, 56, -1, 56, 1005, 56, 6, 99, 0, 0, 0, 0, 10,
        ];
        assert_eq!(feedback_loop(&program, &[9, 7, 8, 5, 6], 0), Ok(18216));
    }

    #[test]
    fn test_feedback_single() {
        init_logger();
        // Adds its phase to every signal until the sum reaches 10.
        let program = parse_program("3,20,3,21,1,20,21,21,4,21,1007,21,10,22,1005,22,2,99").unwrap();
        assert_eq!(feedback_loop(&program, &[3], 0), Ok(12));
    }

    #[test]
    fn test_errors() {
        init_logger();
        assert_eq!(chain(&[99], &[0], 0), Err(Error::NoOutput));
        assert_eq!(chain(&[3, 0, 99], &[], 0), Err(Error::NoOutput));
        assert_eq!(feedback_loop(&[99], &[0, 1], 0), Err(Error::NoOutput));
        assert_eq!(
            feedback_loop(&[3, 0, 3, 0, 4, 0, 42], &[0, 1, 2], 0),
            Err(Error::UnknownOpcode { word: 42, ip: 6 })
        );
    }
}
