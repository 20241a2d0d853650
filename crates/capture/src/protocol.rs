//! Host command parsing.
//!
//! ```text
//! immediate:  i S C F d m + *           act on the byte itself
//! line:       R<n> L<n> A<e><ch> D<e><ch> a[<ch>] t<type>… P<n>   end with CR or LF
//! ```
//!
//! `+` and `*` act immediately even in the middle of a line and drop it.
//! Bytes between commands that are CR, LF or space are ignored.

use heapless::Vec;
use platform::config::{ANALOG_INPUTS, MAX_CHANNELS};
use platform::{ChannelIndex, Edge, OutOfRangeError, SampleRateHz};

use crate::error::CommandError;
use crate::trigger::TriggerKind;

/// Longest argument line accepted, terminator excluded.
pub const MAX_LINE_BYTES: usize = 32;

/// Largest 12-bit ADC code, the ceiling for level triggers.
const MAX_LEVEL: u32 = 0x0FFF;

/// A parsed host command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// `i`: reply with the device id.
    Identify,
    /// `R<n>`: set the sample rate.
    SetRate(SampleRateHz),
    /// `L<n>`: set the post-trigger sample count.
    SetSamples(u32),
    /// `A<0|1><ch>`: disable/enable an ADC channel.
    Analog {
        /// `true` for `A1…`.
        enable: bool,
        /// ADC channel.
        channel: ChannelIndex,
    },
    /// `D<0|1><ch>`: disable/enable a digital line.
    Digital {
        /// `true` for `D1…`.
        enable: bool,
        /// Digital line.
        channel: ChannelIndex,
    },
    /// `a`: reply with the analog format descriptor.
    AnalogFormat,
    /// `a<ch>`: reply with one channel's calibration.
    Calibration(ChannelIndex),
    /// `C`: capture repeatedly until aborted.
    RunContinuous,
    /// `F`: capture once.
    RunOnce,
    /// `t…`: configure the trigger.
    Trigger(TriggerKind),
    /// `d`: disable the trigger.
    DisableTrigger,
    /// `S`: reply with the status flags.
    Status,
    /// `+`: abort.
    Abort,
    /// `*`: reset.
    Reset,
    /// `P<n>`: request pre-trigger samples.
    PreTrigger(u32),
    /// `m`: reply with the planned memory layout.
    Memory,
}

/// Incremental command reader fed one byte at a time.
#[derive(Debug, Default)]
pub struct CommandReader {
    line: Vec<u8, MAX_LINE_BYTES>,
    in_line: bool,
    overflow: bool,
}

impl CommandReader {
    /// Empty reader.
    pub const fn new() -> Self {
        Self {
            line: Vec::new(),
            in_line: false,
            overflow: false,
        }
    }

    /// Drop any partial line.
    pub fn clear(&mut self) {
        self.line.clear();
        self.in_line = false;
        self.overflow = false;
    }

    /// Feed one byte. Returns a result once a command is complete.
    pub fn push(&mut self, byte: u8) -> Option<Result<Command, CommandError>> {
        match byte {
            b'+' => {
                self.clear();
                return Some(Ok(Command::Abort));
            }
            b'*' => {
                self.clear();
                return Some(Ok(Command::Reset));
            }
            _ => {}
        }

        if self.in_line {
            if matches!(byte, b'\r' | b'\n') {
                let result = if self.overflow {
                    Err(CommandError::Syntax)
                } else {
                    parse_line(&self.line)
                };
                self.clear();
                return Some(result);
            }
            if self.line.push(byte).is_err() {
                self.overflow = true;
            }
            return None;
        }

        let command = match byte {
            b'\r' | b'\n' | b' ' => return None,
            b'i' => Command::Identify,
            b'S' => Command::Status,
            b'C' => Command::RunContinuous,
            b'F' => Command::RunOnce,
            b'd' => Command::DisableTrigger,
            b'm' => Command::Memory,
            b'R' | b'L' | b'A' | b'D' | b'a' | b't' | b'P' => {
                self.in_line = true;
                // Empty line buffer always has room.
                let _ = self.line.push(byte);
                return None;
            }
            _ => return Some(Err(CommandError::Syntax)),
        };
        Some(Ok(command))
    }
}

fn parse_line(line: &[u8]) -> Result<Command, CommandError> {
    let (&tag, args) = line.split_first().ok_or(CommandError::Syntax)?;
    match tag {
        b'R' => Ok(Command::SetRate(SampleRateHz::new(parse_u32(args)?)?)),
        b'L' => {
            let samples = parse_u32(args)?;
            in_range(samples, 1, u32::MAX)?;
            Ok(Command::SetSamples(samples))
        }
        b'A' => {
            let (enable, channel) = parse_toggle(args, usize::from(ANALOG_INPUTS))?;
            Ok(Command::Analog { enable, channel })
        }
        b'D' => {
            let (enable, channel) = parse_toggle(args, MAX_CHANNELS)?;
            Ok(Command::Digital { enable, channel })
        }
        b'a' if args.is_empty() => Ok(Command::AnalogFormat),
        b'a' => Ok(Command::Calibration(parse_channel(args, usize::from(ANALOG_INPUTS))?)),
        b't' => Ok(Command::Trigger(parse_trigger(args)?)),
        b'P' => Ok(Command::PreTrigger(parse_u32(args)?)),
        _ => Err(CommandError::Syntax),
    }
}

/// `<type><params>` after the `t`.
fn parse_trigger(args: &[u8]) -> Result<TriggerKind, CommandError> {
    let (&kind, params) = args.split_first().ok_or(CommandError::Syntax)?;
    let mut fields = params.split(|&b| b == b',');
    let mut next = || fields.next().ok_or(CommandError::Syntax);

    let trigger = match kind {
        b'n' if params.is_empty() => return Ok(TriggerKind::None),
        b'l' => {
            let channel = parse_channel(next()?, usize::from(ANALOG_INPUTS))?;
            let level = parse_u32(next()?)?;
            in_range(level, 0, MAX_LEVEL)?;
            let edge = parse_edge(next()?)?;
            TriggerKind::AnalogLevel {
                channel,
                // Checked against MAX_LEVEL above.
                level: u16::try_from(level).map_err(|_| CommandError::Syntax)?,
                edge,
            }
        }
        b'e' => TriggerKind::AnalogEdge {
            channel: parse_channel(next()?, usize::from(ANALOG_INPUTS))?,
            edge: parse_edge(next()?)?,
        },
        b'g' => TriggerKind::DigitalEdge {
            channel: parse_channel(next()?, MAX_CHANNELS)?,
            edge: parse_edge(next()?)?,
        },
        b'v' => {
            let id = parse_u32(next()?)?;
            in_range(id, 0, u32::from(u8::MAX))?;
            TriggerKind::InternalVariable {
                id: u8::try_from(id).map_err(|_| CommandError::Syntax)?,
                value: parse_i32(next()?)?,
            }
        }
        _ => return Err(CommandError::Syntax),
    };
    if fields.next().is_some() {
        return Err(CommandError::Syntax);
    }
    Ok(trigger)
}

/// `<0|1><ch>`.
fn parse_toggle(args: &[u8], channels: usize) -> Result<(bool, ChannelIndex), CommandError> {
    let (&flag, channel) = args.split_first().ok_or(CommandError::Syntax)?;
    let enable = match flag {
        b'0' => false,
        b'1' => true,
        _ => return Err(CommandError::Syntax),
    };
    Ok((enable, parse_channel(channel, channels)?))
}

fn parse_channel(digits: &[u8], channels: usize) -> Result<ChannelIndex, CommandError> {
    let value = parse_u32(digits)?;
    let last = u32::try_from(channels.saturating_sub(1)).unwrap_or(u32::MAX);
    in_range(value, 0, last)?;
    let index = u8::try_from(value).map_err(|_| CommandError::Syntax)?;
    Ok(ChannelIndex::new(index)?)
}

fn parse_edge(field: &[u8]) -> Result<Edge, CommandError> {
    match field {
        b"r" => Ok(Edge::Rising),
        b"f" => Ok(Edge::Falling),
        b"b" => Ok(Edge::Either),
        _ => Err(CommandError::Syntax),
    }
}

/// Decimal digits only; overflow is a range error.
fn parse_u32(digits: &[u8]) -> Result<u32, CommandError> {
    if digits.is_empty() {
        return Err(CommandError::Syntax);
    }
    digits.iter().try_fold(0u32, |acc, &b| {
        if !b.is_ascii_digit() {
            return Err(CommandError::Syntax);
        }
        acc.checked_mul(10)
            .and_then(|v| v.checked_add(u32::from(b.wrapping_sub(b'0'))))
            .ok_or(CommandError::Range(OutOfRangeError {
                value: u32::MAX,
                min: 0,
                max: u32::MAX,
            }))
    })
}

fn parse_i32(field: &[u8]) -> Result<i32, CommandError> {
    let (negative, digits) = match field.split_first() {
        Some((b'-', rest)) => (true, rest),
        _ => (false, field),
    };
    let magnitude = parse_u32(digits)?;
    let value = if negative {
        0i64.saturating_sub(i64::from(magnitude))
    } else {
        i64::from(magnitude)
    };
    i32::try_from(value).map_err(|_| {
        CommandError::Range(OutOfRangeError {
            value: magnitude,
            min: 0,
            max: i32::MAX.unsigned_abs(),
        })
    })
}

fn in_range(value: u32, min: u32, max: u32) -> Result<(), CommandError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(CommandError::Range(OutOfRangeError { value, min, max }))
    }
}
