//! Decoders for the two proprietary compressed media formats found in Media
//! Station titles: a run-length-encoded indexed-color bitmap stream with
//! transparency and keyframe compositing, and an IMA ADPCM audio stream.
//!
//! Neither format is publicly documented; the behavior implemented here was
//! recovered from the original engine's output. Both decoders are pure
//! functions over byte slices: no I/O, no shared state, safe to call from any
//! number of threads at once.
//!
//! # Bitmap stream format
//!
//! The stream may begin with an optional two-byte `00 00` header, which is
//! skipped when present. The rest is a sequence of tokens. A non-zero first
//! byte is a literal run; a zero first byte escapes into control mode, where
//! the second byte selects an operation (see [consts] for the individual
//! opcodes).
//!
//! Frames may be placed inside a larger canvas (for movie frames positioned
//! on the screen), and intraframes may reference a previously decoded
//! keyframe for their transparent regions. See [`bitmap::decode`].
//!
//! # Audio stream format
//!
//! Each input byte holds two 4-bit IMA ADPCM codes, high nibble first. Codes
//! adjust a running predictor and an adaptive step size via fixed lookup
//! tables; every code yields one signed 16-bit PCM sample. See
//! [`adpcm::decode`].
#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

pub mod adpcm;
pub mod bitmap;

pub use bitmap::{FrameGeometry, TransparencyMap, TransparencyRun};

pub mod consts {
    /// Escape into control mode.
    ///
    /// ```plain
    /// .- escape ----------------.
    /// |  Byte[0]  |   Byte[1]   |
    /// |-----------+-------------|
    /// |   0x00    |   opcode    |
    /// `-------------------------`
    /// ```
    ///
    /// A length byte of zero never starts a literal run; the following byte
    /// is one of the `OP_*` opcodes below.
    pub const ESCAPE: u8 = 0x00;

    /// End of the current row.
    ///
    /// The decode cursor moves to the left edge of the frame on the next row.
    pub const OP_END_OF_ROW: u8 = 0x00;

    /// End of the image.
    ///
    /// Decoding stops immediately, even mid-row; any bytes that follow are
    /// never consumed and unfilled rows stay zero.
    pub const OP_END_OF_IMAGE: u8 = 0x01;

    /// Begin a transparency run.
    ///
    /// Arms transparency tracking at the current cursor position. The next
    /// literal run on this row closes the region, which is then sourced from
    /// the keyframe instead of the literal color when compositing. Cleared at
    /// the end of every row.
    pub const OP_TRANSPARENCY: u8 = 0x02;

    /// Reposition the cursor.
    ///
    /// ```plain
    /// .- reposition ------------------------------------.
    /// |  Byte[0]  |  Byte[1]  |  Byte[2]   |  Byte[3]   |
    /// |-----------+-----------+------------+------------|
    /// |   0x00    |   0x03    |  delta-x   |  delta-y   |
    /// `-------------------------------------------------`
    /// ```
    ///
    /// Moves the cursor right by `delta-x` columns and down by `delta-y` rows
    /// without writing pixels.
    pub const OP_REPOSITION: u8 = 0x03;

    /// Smallest opcode that denotes a raw (uncompressed) run.
    ///
    /// ```plain
    /// .- raw run ---------------------------------------.
    /// |  Byte[0]  |  Byte[1]  |  Byte[2..2+n]  |  pad   |
    /// |-----------+-----------+----------------+--------|
    /// |   0x00    |  n >= 4   |  n color bytes | 0 or 1 |
    /// `-------------------------------------------------`
    /// ```
    ///
    /// `n` color indices are copied verbatim to the output. If the read
    /// position after the run is odd (measured from the start of the input,
    /// including the optional header), one padding byte is skipped to keep
    /// the stream 16-bit aligned.
    pub const OP_RAW_RUN_MIN: u8 = 0x04;

    /// Optional two-byte stream header.
    ///
    /// A stream starting with these bytes decodes identically to the same
    /// stream without them.
    pub const STREAM_HEADER: [u8; 2] = [0x00, 0x00];

    /// Palette index treated as the background color.
    ///
    /// When an image contains no transparency runs at all and a keyframe is
    /// supplied, every decoded pixel with this value is taken from the
    /// keyframe instead.
    pub const BACKGROUND_INDEX: u8 = 0x00;
}
