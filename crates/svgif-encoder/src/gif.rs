//! GIF89a muxer for palette-indexed frame sequences

use crate::lzw;
use bytes::{BufMut, BytesMut};
use svgif_core::{EncodedStream, Error, FrameSequence, QuantizedFrame, Result, Rgb};
use tracing::debug;

const EXTENSION_INTRODUCER: u8 = 0x21;
const GRAPHIC_CONTROL_LABEL: u8 = 0xF9;
const APPLICATION_LABEL: u8 = 0xFF;
const IMAGE_SEPARATOR: u8 = 0x2C;
const TRAILER: u8 = 0x3B;

/// Disposal: leave the frame in place
const DISPOSE_KEEP: u8 = 1;
/// Disposal: clear the frame area to the background
const DISPOSE_BACKGROUND: u8 = 2;

/// How often the animation loops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Repeat {
    /// Loop forever
    #[default]
    Infinite,
    /// Loop a fixed number of times
    Finite(u16),
}

impl Repeat {
    /// Interpret a NETSCAPE loop count, where 0 means forever
    pub fn from_loop_count(count: u16) -> Self {
        if count == 0 {
            Repeat::Infinite
        } else {
            Repeat::Finite(count)
        }
    }

    fn loop_count(self) -> u16 {
        match self {
            Repeat::Infinite => 0,
            Repeat::Finite(n) => n,
        }
    }
}

/// Serializes a [`FrameSequence`] into one GIF89a stream
///
/// The first frame's palette becomes the global color table; later frames
/// only carry a local table when their palette differs from it. If any frame
/// has a transparent index, every frame is disposed to the background.
#[derive(Debug, Clone, Default)]
pub struct GifMuxer {
    repeat: Repeat,
}

impl GifMuxer {
    /// Create a new muxer that loops forever
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pattern: set loop behavior
    pub fn with_repeat(mut self, repeat: Repeat) -> Self {
        self.repeat = repeat;
        self
    }

    /// Validate `frames` as a sequence, then assemble it
    pub fn assemble_frames(&self, frames: Vec<QuantizedFrame>) -> Result<EncodedStream> {
        let sequence = FrameSequence::new(frames)?;
        self.assemble(&sequence)
    }

    /// Write header, loop extension, every frame in order, and the trailer
    pub fn assemble(&self, sequence: &FrameSequence) -> Result<EncodedStream> {
        let (width, height) = sequence.dimensions();
        let width = to_u16(width, "width")?;
        let height = to_u16(height, "height")?;

        let global = sequence.frames()[0].palette();
        // Transparent pixels must reveal the background, not the previous frame
        let disposal = if sequence.frames().iter().any(|f| f.transparent().is_some()) {
            DISPOSE_BACKGROUND
        } else {
            DISPOSE_KEEP
        };
        let mut buf = BytesMut::new();

        self.write_header(&mut buf, width, height, global);
        self.write_netscape(&mut buf);

        for frame in sequence.frames() {
            self.write_frame(&mut buf, frame, global, disposal);
        }

        buf.put_u8(TRAILER);

        debug!(
            "Assembled {} frame(s) at {}x{} into {} bytes",
            sequence.len(),
            width,
            height,
            buf.len()
        );

        Ok(EncodedStream::new(buf.freeze()))
    }

    fn write_header(&self, buf: &mut BytesMut, width: u16, height: u16, global: &[Rgb]) {
        buf.put_slice(b"GIF89a");
        buf.put_u16_le(width);
        buf.put_u16_le(height);
        // global table present, 8-bit color resolution, unsorted
        buf.put_u8(0x80 | 0x70 | table_size_field(global.len()));
        buf.put_u8(0); // background color index
        buf.put_u8(0); // pixel aspect ratio
        Self::write_color_table(buf, global);
    }

    fn write_netscape(&self, buf: &mut BytesMut) {
        buf.put_u8(EXTENSION_INTRODUCER);
        buf.put_u8(APPLICATION_LABEL);
        buf.put_u8(11);
        buf.put_slice(b"NETSCAPE2.0");
        buf.put_u8(3); // sub-block size
        buf.put_u8(1); // loop sub-block id
        buf.put_u16_le(self.repeat.loop_count());
        buf.put_u8(0);
    }

    fn write_frame(
        &self,
        buf: &mut BytesMut,
        frame: &QuantizedFrame,
        global: &[Rgb],
        disposal: u8,
    ) {
        self.write_graphic_control(buf, frame, disposal);

        let local = frame.palette() != global;
        buf.put_u8(IMAGE_SEPARATOR);
        buf.put_u16_le(0); // left
        buf.put_u16_le(0); // top
        buf.put_u16_le(frame.width() as u16);
        buf.put_u16_le(frame.height() as u16);
        if local {
            buf.put_u8(0x80 | table_size_field(frame.palette().len()));
            Self::write_color_table(buf, frame.palette());
        } else {
            buf.put_u8(0);
        }

        let min_code_size = lzw::min_code_size(frame.palette().len());
        buf.put_u8(min_code_size);
        let compressed = lzw::encode(frame.indices(), min_code_size);
        Self::write_sub_blocks(buf, &compressed);
    }

    fn write_graphic_control(&self, buf: &mut BytesMut, frame: &QuantizedFrame, disposal: u8) {
        let (transparent_flag, transparent_index) = match frame.transparent() {
            Some(index) => (1, index),
            None => (0, 0),
        };

        buf.put_u8(EXTENSION_INTRODUCER);
        buf.put_u8(GRAPHIC_CONTROL_LABEL);
        buf.put_u8(4); // block size
        buf.put_u8((disposal << 2) | transparent_flag);
        buf.put_u16_le(frame.delay_cs());
        buf.put_u8(transparent_index);
        buf.put_u8(0);
    }

    /// Write a color table padded to its declared power-of-two size
    fn write_color_table(buf: &mut BytesMut, palette: &[Rgb]) {
        let entries = 2usize << table_size_field(palette.len());
        for color in palette {
            buf.put_slice(&color.0);
        }
        buf.put_bytes(0, (entries - palette.len()) * 3);
    }

    fn write_sub_blocks(buf: &mut BytesMut, data: &[u8]) {
        for chunk in data.chunks(255) {
            buf.put_u8(chunk.len() as u8);
            buf.put_slice(chunk);
        }
        buf.put_u8(0); // block terminator
    }
}

/// Size field `n` such that the table holds `2 << n` entries
fn table_size_field(len: usize) -> u8 {
    let mut field = 0;
    while (2usize << field) < len {
        field += 1;
    }
    field
}

fn to_u16(value: u32, what: &str) -> Result<u16> {
    u16::try_from(value)
        .map_err(|_| Error::Assembly(format!("{} {} exceeds the GIF limit of 65535", what, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    struct Decoded {
        delay: u16,
        rgba: Vec<[u8; 4]>,
        local_palette: bool,
        dispose: ::gif::DisposalMethod,
    }

    fn decode(bytes: &[u8], output: ::gif::ColorOutput) -> (Vec<Decoded>, ::gif::Repeat) {
        let mut options = ::gif::DecodeOptions::new();
        options.set_color_output(output);
        let mut decoder = options.read_info(Cursor::new(bytes.to_vec())).unwrap();

        let mut frames = Vec::new();
        while let Some(frame) = decoder.read_next_frame().unwrap() {
            frames.push(Decoded {
                delay: frame.delay,
                rgba: frame
                    .buffer
                    .chunks_exact(4)
                    .map(|px| [px[0], px[1], px[2], px[3]])
                    .collect(),
                local_palette: frame.palette.is_some(),
                dispose: frame.dispose,
            });
        }
        (frames, decoder.repeat())
    }

    fn frame(palette: Vec<Rgb>, indices: Vec<u8>, width: u32, delay: u16) -> QuantizedFrame {
        let height = indices.len() as u32 / width;
        QuantizedFrame::new(width, height, palette, indices, delay, None).unwrap()
    }

    fn solid(color: Rgb, delay: u16) -> QuantizedFrame {
        frame(vec![color], vec![0; 4], 2, delay)
    }

    #[test]
    fn test_layout_markers() {
        let stream = GifMuxer::new()
            .assemble_frames(vec![solid(Rgb::new(1, 2, 3), 10)])
            .unwrap();
        let bytes = stream.as_bytes();

        assert_eq!(&bytes[..6], b"GIF89a");
        assert_eq!(u16::from_le_bytes([bytes[6], bytes[7]]), 2);
        assert_eq!(u16::from_le_bytes([bytes[8], bytes[9]]), 2);
        assert_eq!(bytes.last(), Some(&TRAILER));
        assert!(bytes.windows(11).any(|w| w == b"NETSCAPE2.0"));
    }

    #[test]
    fn test_round_trip_colors_and_delays() {
        let red = Rgb::new(255, 0, 0);
        let green = Rgb::new(0, 255, 0);
        let blue = Rgb::new(0, 0, 255);
        let frames = vec![
            frame(vec![red, green], vec![0, 1, 1, 0, 0, 0], 3, 10),
            frame(vec![red, green], vec![1, 1, 1, 0, 0, 0], 3, 25),
            frame(vec![blue, red, green], vec![0, 1, 2, 2, 1, 0], 3, 7),
        ];
        let expected = frames.clone();

        let stream = GifMuxer::new().assemble_frames(frames).unwrap();
        let (decoded, repeat) = decode(stream.as_bytes(), ::gif::ColorOutput::RGBA);

        assert_eq!(repeat, ::gif::Repeat::Infinite);
        assert_eq!(decoded.len(), expected.len());
        for (got, want) in decoded.iter().zip(&expected) {
            assert_eq!(got.delay, want.delay_cs());
            for (i, px) in got.rgba.iter().enumerate() {
                let color = want.color_at(i as u32 % 3, i as u32 / 3).unwrap();
                assert_eq!(*px, [color.r(), color.g(), color.b(), 255]);
            }
        }
    }

    #[test]
    fn test_local_palette_only_when_different() {
        let a = Rgb::new(10, 10, 10);
        let b = Rgb::new(200, 10, 10);
        let frames = vec![
            solid(a, 5),
            solid(a, 5),
            frame(vec![b, a], vec![0, 1, 0, 1], 2, 5),
        ];

        let stream = GifMuxer::new().assemble_frames(frames).unwrap();
        let (decoded, _) = decode(stream.as_bytes(), ::gif::ColorOutput::Indexed);
        let locals: Vec<bool> = decoded.iter().map(|f| f.local_palette).collect();
        assert_eq!(locals, vec![false, false, true]);
    }

    #[test]
    fn test_transparency_round_trip() {
        let opaque = Rgb::new(40, 80, 120);
        let quantized = QuantizedFrame::new(
            2,
            2,
            vec![opaque, Rgb::default()],
            vec![0, 1, 1, 0],
            3,
            Some(1),
        )
        .unwrap();

        let stream = GifMuxer::new().assemble_frames(vec![quantized]).unwrap();
        let (decoded, _) = decode(stream.as_bytes(), ::gif::ColorOutput::RGBA);
        let alphas: Vec<u8> = decoded[0].rgba.iter().map(|px| px[3]).collect();
        assert_eq!(alphas, vec![255, 0, 0, 255]);
        assert_eq!(decoded[0].rgba[0], [40, 80, 120, 255]);
    }

    /// Paint every frame over the canvas and apply its disposal afterwards
    fn composite(frames: &[Decoded]) -> Vec<Vec<[u8; 4]>> {
        let mut canvas = vec![[0u8; 4]; frames[0].rgba.len()];
        let mut shown = Vec::new();
        for frame in frames {
            for (dst, src) in canvas.iter_mut().zip(&frame.rgba) {
                if src[3] != 0 {
                    *dst = *src;
                }
            }
            shown.push(canvas.clone());
            if frame.dispose == ::gif::DisposalMethod::Background {
                canvas.fill([0; 4]);
            }
        }
        shown
    }

    #[test]
    fn test_transparent_frame_after_opaque_frame() {
        let red = Rgb::new(255, 0, 0);
        let blue = Rgb::new(0, 0, 255);
        let opaque = frame(vec![red], vec![0, 0], 2, 5);
        let holed =
            QuantizedFrame::new(2, 1, vec![blue, Rgb::default()], vec![0, 1], 5, Some(1)).unwrap();

        let stream = GifMuxer::new().assemble_frames(vec![opaque, holed]).unwrap();
        let (decoded, _) = decode(stream.as_bytes(), ::gif::ColorOutput::RGBA);

        assert!(decoded
            .iter()
            .all(|f| f.dispose == ::gif::DisposalMethod::Background));
        let shown = composite(&decoded);
        assert_eq!(shown[0], vec![[255, 0, 0, 255], [255, 0, 0, 255]]);
        assert_eq!(shown[1], vec![[0, 0, 255, 255], [0, 0, 0, 0]]);
    }

    #[test]
    fn test_opaque_frames_keep_disposal() {
        let frames = vec![solid(Rgb::new(1, 1, 1), 2), solid(Rgb::new(9, 9, 9), 2)];
        let stream = GifMuxer::new().assemble_frames(frames).unwrap();
        let (decoded, _) = decode(stream.as_bytes(), ::gif::ColorOutput::RGBA);
        assert!(decoded
            .iter()
            .all(|f| f.dispose == ::gif::DisposalMethod::Keep));
    }

    #[test]
    fn test_finite_repeat() {
        let stream = GifMuxer::new()
            .with_repeat(Repeat::Finite(3))
            .assemble_frames(vec![solid(Rgb::new(0, 0, 0), 1)])
            .unwrap();
        let (_, repeat) = decode(stream.as_bytes(), ::gif::ColorOutput::RGBA);
        assert_eq!(repeat, ::gif::Repeat::Finite(3));
    }

    #[test]
    fn test_large_noisy_frame_round_trip() {
        let palette: Vec<Rgb> = (0..=255u8).map(|i| Rgb::new(i, 255 - i, i / 2)).collect();
        let mut state = 7u32;
        let indices: Vec<u8> = (0..160 * 120)
            .map(|_| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (state >> 24) as u8
            })
            .collect();
        let quantized = frame(palette, indices, 160, 4);
        let expected = quantized.clone();

        let stream = GifMuxer::new().assemble_frames(vec![quantized]).unwrap();
        let (decoded, _) = decode(stream.as_bytes(), ::gif::ColorOutput::RGBA);
        for (i, px) in decoded[0].rgba.iter().enumerate() {
            let c = expected.color_at(i as u32 % 160, i as u32 / 160).unwrap();
            assert_eq!(*px, [c.r(), c.g(), c.b(), 255]);
        }
    }

    #[test]
    fn test_empty_sequence_rejected() {
        let err = GifMuxer::new().assemble_frames(Vec::new()).unwrap_err();
        assert!(matches!(err, Error::Assembly(_)));
    }

    #[test]
    fn test_mismatched_dimensions_rejected() {
        let frames = vec![
            solid(Rgb::new(0, 0, 0), 1),
            frame(vec![Rgb::new(0, 0, 0)], vec![0; 6], 3, 1),
        ];
        let err = GifMuxer::new().assemble_frames(frames).unwrap_err();
        assert!(matches!(err, Error::Assembly(_)));
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let wide = frame(vec![Rgb::default()], vec![0; 70_000], 70_000, 1);
        let err = GifMuxer::new().assemble_frames(vec![wide]).unwrap_err();
        assert!(matches!(err, Error::Assembly(msg) if msg.contains("width")));
    }

    #[test]
    fn test_table_size_field() {
        assert_eq!(table_size_field(1), 0);
        assert_eq!(table_size_field(2), 0);
        assert_eq!(table_size_field(3), 1);
        assert_eq!(table_size_field(16), 3);
        assert_eq!(table_size_field(17), 4);
        assert_eq!(table_size_field(256), 7);
    }

    #[test]
    fn test_repeat_from_loop_count() {
        assert_eq!(Repeat::from_loop_count(0), Repeat::Infinite);
        assert_eq!(Repeat::from_loop_count(2), Repeat::Finite(2));
    }
}
