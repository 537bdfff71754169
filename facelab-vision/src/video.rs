use anyhow::{Context, Result};
use image::RgbImage;
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::{Device, Format, FourCC};

pub struct Camera {
    stream: Stream<'static>,
    width: u32,
    height: u32,
    fourcc: FourCC,
}

impl Camera {
    pub fn open(device: &str) -> Result<Self> {
        let dev = Device::with_path(device).context("open camera")?;
        let fmt = negotiate_format(&dev).context("negotiate pixel format")?;
        let stream = Stream::with_buffers(&dev, Type::VideoCapture, 4).context("map stream")?;
        log::debug!(
            "camera {} streaming {}x{} {:?}",
            device,
            fmt.width,
            fmt.height,
            fmt.fourcc
        );
        Ok(Self {
            stream,
            width: fmt.width,
            height: fmt.height,
            fourcc: fmt.fourcc,
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn frame(&mut self) -> Result<RgbImage> {
        let (data, meta) = self.stream.next().context("capture frame")?;
        log::trace!("frame seq={} len={}", meta.sequence, data.len());

        let rgb = match self.fourcc {
            f if f == FourCC::new(b"RGB3") => data.to_vec(),
            f if f == FourCC::new(b"YUYV") => yuyv_to_rgb(self.width, self.height, data)?,
            f if f == FourCC::new(b"GREY") => grey_to_rgb(self.width, self.height, data)?,
            other => {
                log::warn!("unsupported pixel format {:?}, treating as packed RGB", other);
                data.to_vec()
            }
        };

        let expected = (self.width * self.height * 3) as usize;
        if rgb.len() < expected {
            anyhow::bail!(
                "short frame buffer: got {} bytes, need {} ({:?})",
                rgb.len(),
                expected,
                self.fourcc
            );
        }

        RgbImage::from_raw(self.width, self.height, rgb[..expected].to_vec())
            .ok_or_else(|| anyhow::anyhow!("failed to assemble frame image"))
    }
}

// Ask for packed RGB, fall back to YUYV, and otherwise keep whatever the
// driver already reports.
fn negotiate_format(dev: &Device) -> Result<Format> {
    let current = dev.format().context("query format")?;
    for fourcc in [FourCC::new(b"RGB3"), FourCC::new(b"YUYV")] {
        let wanted = Format::new(current.width, current.height, fourcc);
        if let Ok(got) = dev.set_format(&wanted) {
            if got.fourcc == fourcc {
                return Ok(got);
            }
        }
    }
    Ok(current)
}

fn yuyv_to_rgb(width: u32, height: u32, data: &[u8]) -> Result<Vec<u8>> {
    let expected = (width * height * 2) as usize;
    if data.len() < expected {
        anyhow::bail!("short YUYV buffer");
    }
    let mut out = Vec::with_capacity((width * height * 3) as usize);
    for chunk in data[..expected].chunks_exact(4) {
        let u = chunk[1] as f32 - 128.0;
        let v = chunk[3] as f32 - 128.0;
        for &y in &[chunk[0], chunk[2]] {
            let y = y as f32;
            out.push(clamp_u8(y + 1.402 * v));
            out.push(clamp_u8(y - 0.344136 * u - 0.714136 * v));
            out.push(clamp_u8(y + 1.772 * u));
        }
    }
    Ok(out)
}

fn grey_to_rgb(width: u32, height: u32, data: &[u8]) -> Result<Vec<u8>> {
    let expected = (width * height) as usize;
    if data.len() < expected {
        anyhow::bail!("short GREY buffer");
    }
    let mut out = Vec::with_capacity(expected * 3);
    for &y in &data[..expected] {
        out.extend_from_slice(&[y, y, y]);
    }
    Ok(out)
}

fn clamp_u8(v: f32) -> u8 {
    v.max(0.0).min(255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grey_expansion() {
        let out = grey_to_rgb(2, 1, &[10, 200]).unwrap();
        assert_eq!(out, vec![10, 10, 10, 200, 200, 200]);
    }

    #[test]
    fn test_grey_rejects_short_buffer() {
        assert!(grey_to_rgb(4, 4, &[0; 3]).is_err());
    }

    #[test]
    fn test_yuyv_neutral_chroma_is_grayscale() {
        // u = v = 128 means zero chroma, so both pixels come out gray.
        let out = yuyv_to_rgb(2, 1, &[100, 128, 50, 128]).unwrap();
        assert_eq!(out, vec![100, 100, 100, 50, 50, 50]);
    }

    #[test]
    fn test_clamp_u8_saturates() {
        assert_eq!(clamp_u8(-3.0), 0);
        assert_eq!(clamp_u8(300.0), 255);
    }
}
