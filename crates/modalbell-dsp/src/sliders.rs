/// Byte-stream parser for the serial slider box.
///
/// The box streams ASCII messages:
/// - `F<c>`: slave `c` reported a failure (two bytes)
/// - `II VVVV`: slider update (seven bytes): two hex digits of slider index,
///   one separator, four hex digits of a signed 16-bit position
///
/// Anything else is line noise and skipped. Messages may be split across
/// reads; an incomplete tail is kept until the next `feed`.
///
/// Opening the serial device is the caller's business: this type only
/// consumes bytes, so it works equally with a tty, a socket, or a test vector.

pub const SLIDER_COUNT: usize = 30;
pub const SLIDER_MIN: i16 = i16::MIN;
pub const SLIDER_MAX: i16 = i16::MAX;

const BUFFER_CAPACITY: usize = 1024;
const UPDATE_LEN: usize = 7;
const FAILURE_LEN: usize = 2;

/// One slider moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliderEvent {
    pub index: usize,
    pub value: i16,
}

impl SliderEvent {
    /// Position scaled to [0, 1] (bottom of travel = 0).
    pub fn normalized(&self) -> f32 {
        let span = SLIDER_MAX as f32 - SLIDER_MIN as f32;
        (self.value as f32 - SLIDER_MIN as f32) / span
    }
}

pub struct SliderParser {
    pending: Vec<u8>,
    values: [i16; SLIDER_COUNT],
}

impl Default for SliderParser {
    fn default() -> Self {
        Self::new()
    }
}

impl SliderParser {
    pub fn new() -> Self {
        Self {
            pending: Vec::with_capacity(BUFFER_CAPACITY),
            values: [0; SLIDER_COUNT],
        }
    }

    /// Last reported position of a slider (0 until the first update).
    pub fn value(&self, index: usize) -> Option<i16> {
        self.values.get(index).copied()
    }

    /// Bytes held back waiting for the rest of a message.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Consume freshly read bytes, calling `on_event` for every complete update.
    ///
    /// Input is taken at most as much as fits beside the held-back tail, so a
    /// partial message is never dropped however large the read.
    pub fn feed(&mut self, bytes: &[u8], mut on_event: impl FnMut(SliderEvent)) {
        let mut rest = bytes;
        while !rest.is_empty() {
            // drain() leaves less than one message behind
            let room = BUFFER_CAPACITY - self.pending.len();
            let (piece, tail) = rest.split_at(room.min(rest.len()));
            self.pending.extend_from_slice(piece);
            self.drain(&mut on_event);
            rest = tail;
        }
    }

    /// Convenience for callers that want the events collected.
    pub fn feed_collect(&mut self, bytes: &[u8]) -> Vec<SliderEvent> {
        let mut events = Vec::new();
        self.feed(bytes, |e| events.push(e));
        events
    }

    fn drain(&mut self, on_event: &mut impl FnMut(SliderEvent)) {
        let buf = &self.pending;
        let mut i = 0;

        while i < buf.len() {
            let c = buf[i];
            if c == b'F' {
                if buf.len() - i < FAILURE_LEN {
                    break;
                }
                log::warn!("slider box: slave '{}' failure", buf[i + 1] as char);
                i += FAILURE_LEN;
            } else if c.is_ascii_digit() || (b'a'..=b'f').contains(&c) {
                if buf.len() - i < UPDATE_LEN {
                    break;
                }
                let msg = &buf[i..i + UPDATE_LEN];
                match (parse_hex(&msg[0..2]), parse_hex(&msg[3..7])) {
                    (Some(index), Some(raw)) if (index as usize) < SLIDER_COUNT => {
                        let event = SliderEvent {
                            index: index as usize,
                            value: raw as u16 as i16,
                        };
                        self.values[event.index] = event.value;
                        on_event(event);
                    }
                    (Some(index), Some(_)) => {
                        log::warn!("slider box: bad slider index {index}");
                    }
                    _ => {
                        log::warn!("slider box: malformed update {:?}", String::from_utf8_lossy(msg));
                    }
                }
                i += UPDATE_LEN;
            } else {
                i += 1;
            }
        }

        self.pending.drain(..i);
    }
}

fn parse_hex(digits: &[u8]) -> Option<u32> {
    let s = std::str::from_utf8(digits).ok()?;
    u32::from_str_radix(s, 16).ok()
}
