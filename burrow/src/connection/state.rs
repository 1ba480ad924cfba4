use crate::error::{Error, Result};

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum State {
    Opening,
    Open,
    Closing,
    Closed,
}

impl State {
    /// Whether `self -> to` is a legal step. `Closed` is terminal.
    pub fn can_become(self, to: State) -> bool {
        matches!(
            (self, to),
            (State::Opening, State::Open)
                | (State::Opening, State::Closing)
                | (State::Open, State::Closing)
                | (State::Closing, State::Closed)
        )
    }

    /// `true` for `Closing` and `Closed`.
    pub fn is_closing(self) -> bool {
        matches!(self, State::Closing | State::Closed)
    }

    fn to_u8(self) -> u8 {
        match self {
            State::Opening => 0,
            State::Open => 1,
            State::Closing => 2,
            State::Closed => 3,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => State::Opening,
            1 => State::Open,
            2 => State::Closing,
            _ => State::Closed,
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Opening => f.write_str("opening"),
            State::Open => f.write_str("open"),
            State::Closing => f.write_str("closing"),
            State::Closed => f.write_str("closed"),
        }
    }
}

/// A [`State`] shared between the handle and the I/O thread.
#[derive(Debug)]
pub struct StateCell {
    value: AtomicU8,
}

impl StateCell {
    /// Starts in [`State::Opening`].
    pub fn new() -> Self {
        Self {
            value: AtomicU8::new(State::Opening.to_u8()),
        }
    }

    pub fn get(&self) -> State {
        State::from_u8(self.value.load(Ordering::Acquire))
    }

    /// Moves to `to` if the current state allows it, returning the
    /// previous state.
    pub fn transition(&self, to: State) -> Result<State> {
        let mut current = self.get();

        loop {
            if !current.can_become(to) {
                log::error!("rejected state transition {current} -> {to}");
                return Err(Error::InvalidTransition { from: current, to });
            }

            match self.value.compare_exchange(
                current.to_u8(),
                to.to_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    log::debug!("connection {current} -> {to}");
                    return Ok(current);
                }
                Err(actual) => current = State::from_u8(actual),
            }
        }
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}
