//! MSB-first bit packing shared by the image encoders
//!
//! The first bit pushed lands in bit 7 of the byte, the eighth in bit 0.
//! A byte is flushed to the output as soon as it is full; [`BitWriter::finish`]
//! zero-pads whatever is left.

/// Appends single bits MSB-first onto a borrowed byte buffer
#[derive(Debug)]
pub struct BitWriter<'a> {
    out: &'a mut Vec<u8>,
    /// Current partial byte, filled from the low end and shifted up
    acc: u8,
    /// Bits in `acc` (0-7)
    filled: u8,
}

impl<'a> BitWriter<'a> {
    pub fn new(out: &'a mut Vec<u8>) -> Self {
        Self {
            out,
            acc: 0,
            filled: 0,
        }
    }

    /// Append one bit
    #[inline]
    pub fn push(&mut self, bit: bool) {
        self.acc = (self.acc << 1) | bit as u8;
        self.filled += 1;
        if self.filled == 8 {
            self.out.push(self.acc);
            self.acc = 0;
            self.filled = 0;
        }
    }

    /// Append `count` zero bits
    pub fn pad(&mut self, count: usize) {
        for _ in 0..count {
            self.push(false);
        }
    }

    /// True when no partial byte is pending
    pub fn is_aligned(&self) -> bool {
        self.filled == 0
    }

    /// Flush a pending partial byte, padding its low bits with zeros
    pub fn finish(mut self) {
        if self.filled > 0 {
            let missing = 8 - self.filled as usize;
            self.pad(missing);
        }
    }
}
