//! Parsing machine execution.
//!
//! One `run` owns all mutable state: the cursor, the emitted values,
//! the bindings, and the frame stack. Failure is a single mechanism:
//! an opcode or scanner flags it, and the post-step unwind walks the
//! stack back to the nearest restart point, dropping abandoned mark
//! and call frames and any speculative values on the way.

use common::{trace, trace_detail, tracer, Tracer};

use crate::error::MachineError;
use crate::value::{Binding, Value};

use super::program::{OpCode, Program};

/// A stack frame. One of three roles, tagged.
enum Frame {
    /// Restart point: where to resume, and the state to restore.
    Backtrack {
        ret_idx: usize,
        saved_pos: usize,
        args_len: usize,
        kwargs_len: usize,
    },
    /// Start of a capture or action scope.
    Mark {
        pos: usize,
        args_len: usize,
        kwargs_len: usize,
    },
    /// Return address of a rule invocation.
    Call { ret_idx: usize },
}

/// The parsing machine.
///
/// The program and its scanners are read-only; independent machines may
/// share one program across threads.
pub struct Machine<'p, 'a, 's> {
    program: &'p Program<'a>,
    input: &'s str,
    pos: usize,
    args: Vec<Value<'s>>,
    kwargs: Vec<Binding<'a, 's>>,
    stack: Vec<Frame>,
    log: Tracer,
}

impl<'p, 'a, 's> Machine<'p, 'a, 's> {
    pub fn new(program: &'p Program<'a>, input: &'s str) -> Self {
        Self {
            program,
            input,
            pos: 0,
            args: Vec::new(),
            kwargs: Vec::new(),
            stack: Vec::new(),
            log: tracer("machine"),
        }
    }

    /// Execute from `start` (the address of a rule body) with the
    /// cursor at `pos`. Returns the end cursor, or `None` when the
    /// program does not match. `pos` must be a char boundary.
    pub fn run(&mut self, start: usize, pos: usize) -> Result<Option<usize>, MachineError> {
        if pos > self.input.len() {
            return Ok(None);
        }
        debug_assert!(self.input.is_char_boundary(pos));

        self.pos = pos;
        self.args.clear();
        self.kwargs.clear();
        self.stack.clear();
        // Bottom frames: a catch-all restart that lands on the FAIL
        // sentinel, and the pseudo-return that lands on PASS.
        self.stack.push(Frame::Backtrack {
            ret_idx: 0,
            saved_pos: pos,
            args_len: 0,
            kwargs_len: 0,
        });
        self.stack.push(Frame::Call {
            ret_idx: self.program.len() - 1,
        });

        trace!(self.log, "run @{} pos={}", start, pos);

        let mut idx = start;
        loop {
            let inst = match self.program.code.get(idx) {
                Some(inst) => inst,
                None => return Err(MachineError::Internal("instruction address out of range")),
            };
            trace_detail!(
                self.log,
                "{:4}: {:<9} pos={} stack={}",
                idx,
                inst.opcode.name(),
                self.pos,
                self.stack.len()
            );

            if inst.marking {
                self.stack.push(Frame::Mark {
                    pos: self.pos,
                    args_len: self.args.len(),
                    kwargs_len: self.kwargs.len(),
                });
            }

            let mut failed = false;
            match inst.opcode {
                OpCode::Scan => {
                    let scanner = match &inst.scanner {
                        Some(scanner) => scanner,
                        None => return Err(MachineError::Internal("SCAN without a scanner")),
                    };
                    match scanner.scan(self.input, self.pos) {
                        Some(end) => self.pos = end,
                        None => failed = true,
                    }
                }

                OpCode::Branch => {
                    self.stack.push(Frame::Backtrack {
                        ret_idx: target(idx, inst.oploc),
                        saved_pos: self.pos,
                        args_len: self.args.len(),
                        kwargs_len: self.kwargs.len(),
                    });
                    idx += 1;
                    continue;
                }

                OpCode::Call => {
                    self.stack.push(Frame::Call { ret_idx: idx + 1 });
                    idx = inst.oploc as usize;
                    continue;
                }

                OpCode::Commit => {
                    self.pop()?;
                    idx = target(idx, inst.oploc);
                    continue;
                }

                OpCode::Update => {
                    // Refresh the loop's restart point in place, so
                    // repetition does not grow the stack.
                    match self.stack.last_mut() {
                        Some(Frame::Backtrack {
                            saved_pos,
                            args_len,
                            kwargs_len,
                            ..
                        }) => {
                            *saved_pos = self.pos;
                            *args_len = self.args.len();
                            *kwargs_len = self.kwargs.len();
                        }
                        _ => {
                            return Err(MachineError::Internal(
                                "UPDATE without a backtrack frame",
                            ))
                        }
                    }
                    idx = target(idx, inst.oploc);
                    continue;
                }

                OpCode::Restore => {
                    // Lookahead succeeded: rewind the cursor.
                    match self.pop()? {
                        Frame::Backtrack { saved_pos, .. } => self.pos = saved_pos,
                        _ => {
                            return Err(MachineError::Internal(
                                "RESTORE without a backtrack frame",
                            ))
                        }
                    }
                    idx = target(idx, inst.oploc);
                    continue;
                }

                OpCode::FailTwice => {
                    // Negative lookahead matched: drop its restart
                    // point and fail past it.
                    match self.pop()? {
                        Frame::Backtrack { saved_pos, .. } => self.pos = saved_pos,
                        _ => {
                            return Err(MachineError::Internal(
                                "FAILTWICE without a backtrack frame",
                            ))
                        }
                    }
                    failed = true;
                }

                OpCode::Return => match self.pop()? {
                    Frame::Call { ret_idx } => {
                        idx = ret_idx;
                        continue;
                    }
                    _ => return Err(MachineError::Internal("RETURN without a call frame")),
                },

                OpCode::Jump => {
                    idx = target(idx, inst.oploc);
                    continue;
                }

                OpCode::Pass => {
                    trace!(self.log, "matched {}..{}", pos, self.pos);
                    self.stack.clear();
                    return Ok(Some(self.pos));
                }

                OpCode::Fail => failed = true,

                OpCode::Noop => {}
            }

            if failed {
                match self.unwind() {
                    Some(restart) => idx = restart,
                    None => {
                        trace!(self.log, "no match from {}", pos);
                        return Ok(None);
                    }
                }
                continue;
            }

            if inst.capturing {
                let (mark, args_len, kwargs_len) = self.pop_mark()?;
                let text = &self.input[mark..self.pos];
                self.args.truncate(args_len);
                self.args.push(Value::from(text));
                self.kwargs.truncate(kwargs_len);
            }

            if let Some(action) = inst.action {
                let (mark, args_len, kwargs_len) = self.pop_mark()?;
                let local_args = self.args.split_off(args_len);
                let local_kwargs = self.kwargs.split_off(kwargs_len);
                let (new_args, new_kwargs) = action
                    .invoke(self.input, mark, self.pos, local_args, local_kwargs)
                    .map_err(|source| MachineError::Action {
                        start: mark,
                        end: self.pos,
                        source,
                    })?;
                self.args.extend(new_args);
                self.kwargs.extend(new_kwargs);
            }

            idx += 1;
        }
    }

    /// Tear down and hand over the accumulated values.
    pub fn finish(self) -> (Vec<Value<'s>>, Vec<Binding<'a, 's>>) {
        (self.args, self.kwargs)
    }

    fn pop(&mut self) -> Result<Frame, MachineError> {
        self.stack
            .pop()
            .ok_or(MachineError::Internal("pop from empty stack"))
    }

    fn pop_mark(&mut self) -> Result<(usize, usize, usize), MachineError> {
        match self.pop()? {
            Frame::Mark {
                pos,
                args_len,
                kwargs_len,
            } => Ok((pos, args_len, kwargs_len)),
            _ => Err(MachineError::Internal("expected a mark frame")),
        }
    }

    /// Walk back to the nearest restart point, restoring its state and
    /// consuming it. Mark and call frames on the way are abandoned
    /// work. `None` means no restart point remains: the match failed.
    fn unwind(&mut self) -> Option<usize> {
        while let Some(frame) = self.stack.pop() {
            if let Frame::Backtrack {
                ret_idx,
                saved_pos,
                args_len,
                kwargs_len,
            } = frame
            {
                self.pos = saved_pos;
                self.args.truncate(args_len);
                self.kwargs.truncate(kwargs_len);
                return Some(ret_idx);
            }
        }
        None
    }
}

fn target(idx: usize, oploc: i32) -> usize {
    (idx as i64 + oploc as i64) as usize
}
