//! MP4 output: a Motion-JPEG video track in a minimal ISO-BMFF file.
//!
//! Layout: `ftyp`, `mdat` (all JPEG samples in one chunk), then `moov` with a
//! single video `trak`. Frames play at a constant rate; the timescale is
//! `fps * 100` ticks per second.

use super::still::flatten_onto_white;
use super::{spent_sink, AnimationEncoder, AnimationParams, AnimationSink};
use crate::bitmap::RasterBitmap;
use crate::result::EncodeError;
use crate::settings::ExportFormat;
use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use std::io::Cursor;

const TICKS_PER_FRAME: u32 = 100;
const IDENTITY_MATRIX: [u32; 9] = [0x0001_0000, 0, 0, 0, 0x0001_0000, 0, 0, 0, 0x4000_0000];
const COMPRESSOR: &[u8] = b"Mockshot MJPEG";

/// MP4 [`AnimationEncoder`] writing JPEG samples
#[derive(Debug, Clone, Copy, Default)]
pub struct MjpegMp4Encoder;

impl MjpegMp4Encoder {
    /// Create the encoder
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl AnimationEncoder for MjpegMp4Encoder {
    fn supports(&self, format: ExportFormat) -> bool {
        format == ExportFormat::Mp4
    }

    fn begin(&self, params: &AnimationParams) -> Result<Box<dyn AnimationSink>, EncodeError> {
        if params.width > u32::from(u16::MAX) || params.height > u32::from(u16::MAX) {
            return Err(EncodeError::unsupported(
                "MP4",
                format!("{}x{} exceeds 65535px per side", params.width, params.height),
            ));
        }
        Ok(Box::new(Mp4Sink {
            width: params.width,
            height: params.height,
            fps: params.frame_rate.max(1),
            quality: params.quality.clamp(1, 100),
            samples: Vec::new(),
            finished: false,
        }))
    }
}

struct Mp4Sink {
    width: u32,
    height: u32,
    fps: u8,
    quality: u8,
    samples: Vec<Vec<u8>>,
    finished: bool,
}

impl Mp4Sink {
    fn encode_sample(&self, bitmap: &RasterBitmap) -> Result<Vec<u8>, EncodeError> {
        let rgb = if bitmap.dimensions() == (self.width, self.height) {
            flatten_onto_white(bitmap)
        } else {
            flatten_onto_white(&bitmap.clone().resized(self.width, self.height))
        };
        let mut buffer = Cursor::new(Vec::new());
        JpegEncoder::new_with_quality(&mut buffer, self.quality)
            .encode(rgb.as_raw(), self.width, self.height, ExtendedColorType::Rgb8)
            .map_err(|e| EncodeError::encoder(format!("JPEG encoding failed: {e}")))?;
        Ok(buffer.into_inner())
    }

    fn timescale(&self) -> u32 {
        u32::from(self.fps) * TICKS_PER_FRAME
    }

    fn duration(&self) -> u32 {
        (self.samples.len() as u32).saturating_mul(TICKS_PER_FRAME)
    }

    fn container(&self) -> Result<Vec<u8>, EncodeError> {
        let mut brands = Vec::with_capacity(20);
        brands.extend_from_slice(b"isom");
        put_u32s(&mut brands, &[512]);
        for brand in [b"isom", b"iso2", b"mp41"] {
            brands.extend_from_slice(brand);
        }
        let ftyp = mp4_box(b"ftyp", &brands);

        let payload: usize = self.samples.iter().map(Vec::len).sum();
        let mdat_size = u32::try_from(8 + payload)
            .map_err(|_| EncodeError::encoder("MP4 media data exceeds 4 GiB"))?;
        let mdat_offset = (ftyp.len() + 8) as u32;

        let mut out = Vec::with_capacity(ftyp.len() + 8 + payload + 1024);
        out.extend_from_slice(&ftyp);
        out.extend_from_slice(&mdat_size.to_be_bytes());
        out.extend_from_slice(b"mdat");
        for sample in &self.samples {
            out.extend_from_slice(sample);
        }
        out.extend_from_slice(&self.moov(mdat_offset));
        Ok(out)
    }

    fn moov(&self, chunk_offset: u32) -> Vec<u8> {
        let mut mvhd = Vec::new();
        put_u32s(&mut mvhd, &[0, 0, self.timescale(), self.duration(), 0x0001_0000]);
        mvhd.extend_from_slice(&[0x01, 0x00]);
        mvhd.extend_from_slice(&[0u8; 10]);
        put_u32s(&mut mvhd, &IDENTITY_MATRIX);
        mvhd.extend_from_slice(&[0u8; 24]);
        put_u32s(&mut mvhd, &[2]);

        let trak = mp4_box(b"trak", &[self.tkhd(), self.mdia(chunk_offset)].concat());
        mp4_box(b"moov", &[full_box(b"mvhd", 0, &mvhd), trak].concat())
    }

    fn tkhd(&self) -> Vec<u8> {
        let mut body = Vec::new();
        put_u32s(&mut body, &[0, 0, 1, 0, self.duration(), 0, 0]);
        // layer, alternate group, volume, reserved
        body.extend_from_slice(&[0u8; 8]);
        put_u32s(&mut body, &IDENTITY_MATRIX);
        put_u32s(&mut body, &[self.width << 16, self.height << 16]);
        // enabled | in movie
        full_box(b"tkhd", 3, &body)
    }

    fn mdia(&self, chunk_offset: u32) -> Vec<u8> {
        let mut mdhd = Vec::new();
        put_u32s(&mut mdhd, &[0, 0, self.timescale(), self.duration()]);
        mdhd.extend_from_slice(&0x55c4u16.to_be_bytes());
        mdhd.extend_from_slice(&[0, 0]);

        let mut hdlr = Vec::new();
        put_u32s(&mut hdlr, &[0]);
        hdlr.extend_from_slice(b"vide");
        hdlr.extend_from_slice(&[0u8; 12]);
        hdlr.extend_from_slice(b"VideoHandler\0");

        let vmhd = full_box(b"vmhd", 1, &[0u8; 8]);
        let url = full_box(b"url ", 1, &[]);
        let mut dref = Vec::new();
        put_u32s(&mut dref, &[1]);
        dref.extend_from_slice(&url);
        let dinf = mp4_box(b"dinf", &full_box(b"dref", 0, &dref));
        let minf = mp4_box(b"minf", &[vmhd, dinf, self.stbl(chunk_offset)].concat());

        mp4_box(
            b"mdia",
            &[full_box(b"mdhd", 0, &mdhd), full_box(b"hdlr", 0, &hdlr), minf].concat(),
        )
    }

    fn stbl(&self, chunk_offset: u32) -> Vec<u8> {
        let count = self.samples.len() as u32;

        let mut entry = Vec::new();
        entry.extend_from_slice(&[0u8; 6]);
        entry.extend_from_slice(&1u16.to_be_bytes());
        entry.extend_from_slice(&[0u8; 16]);
        entry.extend_from_slice(&(self.width as u16).to_be_bytes());
        entry.extend_from_slice(&(self.height as u16).to_be_bytes());
        put_u32s(&mut entry, &[0x0048_0000, 0x0048_0000, 0]);
        entry.extend_from_slice(&1u16.to_be_bytes());
        let mut name = [0u8; 32];
        name[0] = COMPRESSOR.len() as u8;
        name[1..=COMPRESSOR.len()].copy_from_slice(COMPRESSOR);
        entry.extend_from_slice(&name);
        entry.extend_from_slice(&24u16.to_be_bytes());
        entry.extend_from_slice(&(-1i16).to_be_bytes());

        let mut stsd = Vec::new();
        put_u32s(&mut stsd, &[1]);
        stsd.extend_from_slice(&mp4_box(b"jpeg", &entry));

        let mut stts = Vec::new();
        put_u32s(&mut stts, &[1, count, TICKS_PER_FRAME]);

        let mut stsc = Vec::new();
        put_u32s(&mut stsc, &[1, 1, count, 1]);

        let mut stsz = Vec::new();
        put_u32s(&mut stsz, &[0, count]);
        for sample in &self.samples {
            put_u32s(&mut stsz, &[sample.len() as u32]);
        }

        let mut stco = Vec::new();
        put_u32s(&mut stco, &[1, chunk_offset]);

        mp4_box(
            b"stbl",
            &[
                full_box(b"stsd", 0, &stsd),
                full_box(b"stts", 0, &stts),
                full_box(b"stsc", 0, &stsc),
                full_box(b"stsz", 0, &stsz),
                full_box(b"stco", 0, &stco),
            ]
            .concat(),
        )
    }
}

fn put_u32s(out: &mut Vec<u8>, values: &[u32]) {
    for value in values {
        out.extend_from_slice(&value.to_be_bytes());
    }
}

fn mp4_box(tag: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + body.len());
    out.extend_from_slice(&((8 + body.len()) as u32).to_be_bytes());
    out.extend_from_slice(tag);
    out.extend_from_slice(body);
    out
}

/// Box with a version-0 header and 24-bit flags
fn full_box(tag: &[u8; 4], flags: u32, body: &[u8]) -> Vec<u8> {
    let mut content = Vec::with_capacity(4 + body.len());
    content.extend_from_slice(&(flags & 0x00FF_FFFF).to_be_bytes());
    content.extend_from_slice(body);
    mp4_box(tag, &content)
}

#[async_trait]
impl AnimationSink for Mp4Sink {
    async fn push_frame(
        &mut self,
        bitmap: &RasterBitmap,
        _delay_ms: u32,
    ) -> Result<(), EncodeError> {
        if self.finished {
            return Err(spent_sink(ExportFormat::Mp4));
        }
        let sample = self.encode_sample(bitmap)?;
        self.samples.push(sample);
        Ok(())
    }

    fn frames_written(&self) -> usize {
        self.samples.len()
    }

    async fn finish(&mut self) -> Result<Vec<u8>, EncodeError> {
        if self.finished {
            return Err(spent_sink(ExportFormat::Mp4));
        }
        self.finished = true;
        let out = self.container()?;
        tracing::debug!(frames = self.samples.len(), bytes = out.len(), "mp4 muxed");
        self.samples.clear();
        Ok(out)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::settings::ExportSettings;

    /// Offset of the first box with `tag` inside `data[start..end]`
    fn find_box(data: &[u8], start: usize, end: usize, tag: &[u8; 4]) -> Option<(usize, usize)> {
        let mut offset = start;
        while offset + 8 <= end {
            let size = u32::from_be_bytes(data[offset..offset + 4].try_into().unwrap()) as usize;
            if &data[offset + 4..offset + 8] == tag {
                return Some((offset, size));
            }
            if size < 8 {
                return None;
            }
            offset += size;
        }
        None
    }

    async fn encode(frames: usize, fps: u8) -> Vec<u8> {
        let settings = ExportSettings::new(ExportFormat::Mp4).with_frame_rate(fps);
        let mut sink = MjpegMp4Encoder.begin(&AnimationParams::from_settings(&settings, 16, 12)).unwrap();
        for i in 0..frames {
            let shade = (i * 40) as u8;
            sink.push_frame(&RasterBitmap::filled(16, 12, [shade, 0, 0, 255]), 0)
                .await
                .unwrap();
        }
        assert_eq!(sink.frames_written(), frames);
        sink.finish().await.unwrap()
    }

    #[tokio::test]
    async fn test_top_level_boxes_cover_file() {
        let data = encode(3, 10).await;
        let (ftyp, ftyp_size) = find_box(&data, 0, data.len(), b"ftyp").unwrap();
        let (mdat, mdat_size) = find_box(&data, 0, data.len(), b"mdat").unwrap();
        let (moov, moov_size) = find_box(&data, 0, data.len(), b"moov").unwrap();
        assert_eq!(ftyp, 0);
        assert_eq!(mdat, ftyp_size);
        assert_eq!(moov, mdat + mdat_size);
        assert_eq!(moov + moov_size, data.len());
    }

    #[tokio::test]
    async fn test_chunk_offset_points_at_first_jpeg() {
        let data = encode(2, 5).await;
        let (mdat, _) = find_box(&data, 0, data.len(), b"mdat").unwrap();
        let first_sample = mdat + 8;
        assert_eq!(&data[first_sample..first_sample + 2], &[0xFF, 0xD8]);

        let stco = data.windows(4).position(|w| w == b"stco").unwrap();
        // tag, version/flags, entry count, offset
        let offset = u32::from_be_bytes(data[stco + 12..stco + 16].try_into().unwrap()) as usize;
        assert_eq!(offset, first_sample);
    }

    #[tokio::test]
    async fn test_duration_follows_frame_rate() {
        let data = encode(4, 20).await;
        let mvhd = data.windows(4).position(|w| w == b"mvhd").unwrap();
        // tag, version/flags, creation, modification, timescale, duration
        let timescale = u32::from_be_bytes(data[mvhd + 16..mvhd + 20].try_into().unwrap());
        let duration = u32::from_be_bytes(data[mvhd + 20..mvhd + 24].try_into().unwrap());
        assert_eq!(timescale, 2_000);
        assert_eq!(duration, 400);
        assert_eq!(f64::from(duration) / f64::from(timescale), 0.2);
    }

    #[tokio::test]
    async fn test_sample_sizes_sum_to_mdat() {
        let data = encode(3, 10).await;
        let (_, mdat_size) = find_box(&data, 0, data.len(), b"mdat").unwrap();
        let stsz = data.windows(4).position(|w| w == b"stsz").unwrap();
        let count = u32::from_be_bytes(data[stsz + 12..stsz + 16].try_into().unwrap());
        assert_eq!(count, 3);
        let sizes: usize = (0..3)
            .map(|i| {
                let at = stsz + 16 + i * 4;
                u32::from_be_bytes(data[at..at + 4].try_into().unwrap()) as usize
            })
            .sum();
        assert_eq!(sizes + 8, mdat_size);
    }

    #[tokio::test]
    async fn test_finish_twice_fails() {
        let settings = ExportSettings::new(ExportFormat::Mp4);
        let mut sink = MjpegMp4Encoder.begin(&AnimationParams::from_settings(&settings, 4, 4)).unwrap();
        sink.push_frame(&RasterBitmap::filled(4, 4, [1, 2, 3, 255]), 0).await.unwrap();
        sink.finish().await.unwrap();
        assert!(sink.finish().await.is_err());
    }
}
