//! The RLE bitmap decoder.
//!
//! Decodes a compressed stream into an 8-bit indexed-color canvas plus a
//! [`TransparencyMap`]. The canonical transparency representation is the run
//! list; the byte mask and keyframe-composited views are derived from it.

use crate::consts::*;
use alloc::{vec, vec::Vec};
use itertools::Itertools;
use snafu::{ensure, Snafu};

/// Placement of a frame within its (possibly larger) canvas.
///
/// Movie frames carry screen-relative coordinates, so a small intraframe can
/// land anywhere on a full-screen canvas. For standalone bitmaps the canvas
/// is the frame itself: [`FrameGeometry::new`] sets that up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGeometry {
    pub frame_width: u32,
    pub frame_height: u32,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub frame_x: u32,
    pub frame_y: u32,
}

impl FrameGeometry {
    /// A frame that fills its own canvas, placed at the origin.
    pub const fn new(frame_width: u32, frame_height: u32) -> Self {
        Self {
            frame_width,
            frame_height,
            canvas_width: frame_width,
            canvas_height: frame_height,
            frame_x: 0,
            frame_y: 0,
        }
    }

    /// Places the frame on a larger canvas.
    pub const fn on_canvas(mut self, canvas_width: u32, canvas_height: u32) -> Self {
        self.canvas_width = canvas_width;
        self.canvas_height = canvas_height;
        self
    }

    /// Offsets the frame's top-left corner within the canvas.
    pub const fn at(mut self, frame_x: u32, frame_y: u32) -> Self {
        self.frame_x = frame_x;
        self.frame_y = frame_y;
        self
    }

    /// Number of pixels (= bytes) in the canvas buffer.
    pub const fn canvas_len(&self) -> usize {
        self.canvas_width as usize * self.canvas_height as usize
    }

    fn validate(&self) -> Result<(), DecodeError> {
        let fits_x = self
            .frame_x
            .checked_add(self.frame_width)
            .map_or(false, |right| right <= self.canvas_width);
        let fits_y = self
            .frame_y
            .checked_add(self.frame_height)
            .map_or(false, |bottom| bottom <= self.canvas_height);
        let addressable =
            usize::try_from(self.canvas_width as u64 * self.canvas_height as u64).is_ok();
        ensure!(
            fits_x && fits_y && addressable,
            GeometryOverflowSnafu {
                frame_width: self.frame_width,
                frame_height: self.frame_height,
                frame_x: self.frame_x,
                frame_y: self.frame_y,
                canvas_width: self.canvas_width,
                canvas_height: self.canvas_height,
            }
        );
        Ok(())
    }
}

/// A contiguous span of keyframe-sourced pixels on one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransparencyRun {
    pub row: usize,
    pub col: usize,
    pub len: usize,
}

/// The transparent regions of one decoded image.
///
/// Internally a list of [`TransparencyRun`]s in stream order. Two derived
/// views exist: [`to_mask`](Self::to_mask) for callers that want a parallel
/// mask buffer, and [`composite`](Self::composite) for in-place keyframe
/// compositing. All three agree by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransparencyMap {
    width: usize,
    height: usize,
    runs: Vec<TransparencyRun>,
}

impl TransparencyMap {
    fn with_canvas(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            runs: Vec::new(),
        }
    }

    /// The canonical run list, in the order the runs appear in the stream.
    pub fn runs(&self) -> &[TransparencyRun] {
        &self.runs
    }

    /// `true` if the image recorded no transparency runs at all.
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Derives a full-canvas byte mask: `0x00` opaque, `0xff` transparent.
    pub fn to_mask(&self) -> Vec<u8> {
        let mut mask = vec![0u8; self.width * self.height];
        for run in &self.runs {
            let start = run.row * self.width + run.col;
            let end = (start + run.len).min(mask.len());
            if start < end {
                mask[start..end].fill(0xff);
            }
        }
        mask
    }

    /// Rebuilds the run list from a byte mask produced by
    /// [`to_mask`](Self::to_mask).
    ///
    /// Any non-zero mask byte counts as transparent. Adjacent transparent
    /// runs on the same row merge, so the round trip is exact up to run
    /// coalescing.
    pub fn from_mask(mask: &[u8], width: usize) -> Self {
        let height = if width == 0 { 0 } else { mask.len() / width };
        let mut runs = Vec::new();
        for (row, line) in mask.chunks(width.max(1)).enumerate() {
            let mut col = 0;
            for (transparent, group) in &line.iter().group_by(|&&byte| byte != 0) {
                let len = group.count();
                if transparent {
                    runs.push(TransparencyRun { row, col, len });
                }
                col += len;
            }
        }
        Self {
            width,
            height,
            runs,
        }
    }

    /// Composites `keyframe` into `pixels` at the transparent positions.
    ///
    /// When the image recorded no transparency runs at all, the fallback rule
    /// applies instead: every pixel equal to [`BACKGROUND_INDEX`] is taken
    /// from the keyframe, across the whole canvas. This lets a keyframe show
    /// through outside the bounds of a small intraframe. The fallback is kept
    /// as a separate pass here so its trigger condition (an entirely run-free
    /// image) stays visible.
    pub fn composite(&self, pixels: &mut [u8], keyframe: &[u8]) {
        if self.runs.is_empty() {
            for (pixel, &source) in pixels.iter_mut().zip(keyframe) {
                if *pixel == BACKGROUND_INDEX {
                    *pixel = source;
                }
            }
            return;
        }

        for run in &self.runs {
            let start = run.row * self.width + run.col;
            let end = (start + run.len).min(pixels.len()).min(keyframe.len());
            if start < end {
                pixels[start..end].copy_from_slice(&keyframe[start..end]);
            }
        }
    }
}

#[derive(Debug, Snafu)]
pub enum DecodeError {
    /// A token read would run past the end of the compressed input.
    #[snafu(display(
        "compressed stream truncated at byte {offset} (row {row}, column {col})"
    ))]
    TruncatedStream { offset: usize, row: usize, col: usize },

    /// The frame does not fit inside the canvas.
    #[snafu(display(
        "frame placement exceeds the canvas: {frame_width}x{frame_height} frame at \
         ({frame_x}, {frame_y}) on a {canvas_width}x{canvas_height} canvas"
    ))]
    GeometryOverflow {
        frame_width: u32,
        frame_height: u32,
        frame_x: u32,
        frame_y: u32,
        canvas_width: u32,
        canvas_height: u32,
    },

    /// The keyframe buffer does not match the canvas pixel count.
    #[snafu(display("keyframe is {actual} bytes, canvas needs {expected}"))]
    SizeMismatch { expected: usize, actual: usize },

    /// The caller-supplied output slice is smaller than the canvas.
    #[snafu(display("output buffer holds {actual} bytes, canvas needs {expected}"))]
    OutputTooSmall { expected: usize, actual: usize },

    /// A run would write past the end of the canvas.
    #[snafu(display(
        "run of {len} pixels at byte {offset} (row {row}, column {col}) overruns the canvas"
    ))]
    CanvasOverrun {
        offset: usize,
        row: usize,
        col: usize,
        len: usize,
    },

    /// The output buffer could not be allocated.
    #[snafu(display("failed to allocate the {bytes}-byte pixel buffer"))]
    AllocationFailure { bytes: usize },
}

/// Bounds-checked read cursor over the compressed input.
struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn next(&mut self) -> Option<u8> {
        let byte = *self.data.get(self.pos)?;
        self.pos += 1;
        Some(byte)
    }

    fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        let run = self.data.get(self.pos..self.pos.checked_add(len)?)?;
        self.pos += len;
        Some(run)
    }

    /// Restores 16-bit alignment after a raw run. Parity is measured from the
    /// start of the input, optional header included.
    fn skip_padding(&mut self) {
        if self.pos % 2 == 1 && self.pos < self.data.len() {
            self.pos += 1;
        }
    }
}

/// Decodes a compressed bitmap stream, allocating the canvas buffer.
///
/// Returns the decoded canvas (one palette index per pixel, row-major,
/// `canvas_width * canvas_height` bytes) and the transparency map. If
/// `keyframe` is supplied it must be exactly one canvas in size; transparent
/// runs are then filled from it, with the background-index fallback applied
/// to run-free images (see [`TransparencyMap::composite`]).
pub fn decode(
    src: &[u8],
    geometry: &FrameGeometry,
    keyframe: Option<&[u8]>,
) -> Result<(Vec<u8>, TransparencyMap), DecodeError> {
    geometry.validate()?;
    let canvas_len = geometry.canvas_len();
    if let Some(keyframe) = keyframe {
        ensure!(
            keyframe.len() == canvas_len,
            SizeMismatchSnafu {
                expected: canvas_len,
                actual: keyframe.len(),
            }
        );
    }

    let mut pixels = Vec::new();
    pixels
        .try_reserve_exact(canvas_len)
        .map_err(|_| DecodeError::AllocationFailure { bytes: canvas_len })?;
    pixels.resize(canvas_len, 0);

    let map = decode_into(src, geometry, &mut pixels)?;
    if let Some(keyframe) = keyframe {
        map.composite(&mut pixels, keyframe);
    }
    Ok((pixels, map))
}

/// Decodes a compressed bitmap stream into a caller-supplied canvas buffer.
///
/// `output` must hold at least `canvas_width * canvas_height` bytes; the
/// canvas portion is zeroed before decoding. No keyframe compositing is
/// performed, so the pixels of transparent runs keep their literal color.
pub fn decode_into(
    src: &[u8],
    geometry: &FrameGeometry,
    output: &mut [u8],
) -> Result<TransparencyMap, DecodeError> {
    geometry.validate()?;
    let canvas_width = geometry.canvas_width as usize;
    let canvas_len = geometry.canvas_len();
    ensure!(
        output.len() >= canvas_len,
        OutputTooSmallSnafu {
            expected: canvas_len,
            actual: output.len(),
        }
    );
    output[..canvas_len].fill(0);

    let mut map = TransparencyMap::with_canvas(canvas_width, geometry.canvas_height as usize);

    let mut cursor = ByteCursor::new(src);
    if src.len() >= 2 && src[..2] == STREAM_HEADER {
        cursor.pos = 2;
    }
    if src.len() <= 2 {
        return Ok(map);
    }

    let frame_x = geometry.frame_x as usize;
    let mut row = geometry.frame_y as usize;
    let last_row = row + geometry.frame_height as usize;

    'image: while row < last_row {
        let mut col = frame_x;
        // Arm-time (row, col) of a pending transparency region.
        let mut armed: Option<(usize, usize)> = None;

        loop {
            // Running out of input at a token boundary is an implicit
            // end-of-image; running out mid-token is a truncated stream.
            let Some(length) = cursor.next() else {
                break 'image;
            };

            if length == ESCAPE {
                let opcode = cursor
                    .next()
                    .ok_or_else(|| truncated(&cursor, row, col))?;
                match opcode {
                    OP_END_OF_ROW => break,
                    OP_END_OF_IMAGE => break 'image,
                    OP_TRANSPARENCY => armed = Some((row, col)),
                    OP_REPOSITION => {
                        let delta_x = cursor
                            .next()
                            .ok_or_else(|| truncated(&cursor, row, col))?;
                        let delta_y = cursor
                            .next()
                            .ok_or_else(|| truncated(&cursor, row, col))?;
                        col += delta_x as usize;
                        row += delta_y as usize;
                    }
                    OP_RAW_RUN_MIN..=u8::MAX => {
                        // Raw run: `opcode` literal bytes, then realignment.
                        let len = opcode as usize;
                        let offset = cursor.pos;
                        let run = cursor
                            .take(len)
                            .ok_or_else(|| truncated(&cursor, row, col))?;
                        let span = write_span(canvas_width, canvas_len, row, col, len)
                            .ok_or(DecodeError::CanvasOverrun {
                                offset,
                                row,
                                col,
                                len,
                            })?;
                        output[span].copy_from_slice(run);
                        col += len;
                        cursor.skip_padding();
                    }
                }
            } else {
                let offset = cursor.pos;
                let color = cursor
                    .next()
                    .ok_or_else(|| truncated(&cursor, row, col))?;
                let len = length as usize;
                let span = write_span(canvas_width, canvas_len, row, col, len).ok_or(
                    DecodeError::CanvasOverrun {
                        offset,
                        row,
                        col,
                        len,
                    },
                )?;
                output[span].fill(color);
                col += len;

                if let Some((armed_row, armed_col)) = armed.take() {
                    // The run is tied to the arm-time position; its length is
                    // the full distance covered up to the run's end, which
                    // can exceed the literal run if a reposition intervened.
                    map.runs.push(TransparencyRun {
                        row: armed_row,
                        col: armed_col,
                        len: col - armed_col,
                    });
                }
            }
        }

        row += 1;
    }

    Ok(map)
}

fn truncated(cursor: &ByteCursor<'_>, row: usize, col: usize) -> DecodeError {
    DecodeError::TruncatedStream {
        offset: cursor.pos,
        row,
        col,
    }
}

fn write_span(
    canvas_width: usize,
    canvas_len: usize,
    row: usize,
    col: usize,
    len: usize,
) -> Option<core::ops::Range<usize>> {
    let start = row.checked_mul(canvas_width)?.checked_add(col)?;
    let end = start.checked_add(len)?;
    (end <= canvas_len).then(|| start..end)
}
