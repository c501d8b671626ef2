use anyhow::{anyhow, Context, Result};
use image::{ImageFormat, RgbImage};
use v4l::buffer::Type;
use v4l::format::FourCC;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::Device;

use crate::application::ports::FrameSourcePort;
use crate::domain::camera::CaptureRequest;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::stream::Frame;

const PREFERRED_FORMATS: [&[u8; 4]; 2] = [b"MJPG", b"YUYV"];

/// Live V4L2 camera read through an MMAP stream.
pub struct V4l2Capture {
    path: String,
    stream: Option<Stream<'static>>,
    fourcc: FourCC,
    width: u32,
    height: u32,
}

impl V4l2Capture {
    /// Opens the device and negotiates MJPG, or YUYV when the driver refuses
    /// MJPG. The driver may adjust size and frame rate to the closest mode.
    pub fn open(req: &CaptureRequest) -> Result<Self> {
        let path = req.device_path();
        let dev = Device::with_path(&path).with_context(|| format!("cannot open {path}"))?;

        let mut actual = None;
        for fcc in PREFERRED_FORMATS {
            let mut fmt = dev.format()?;
            fmt.fourcc = FourCC::new(fcc);
            fmt.width = req.size.width;
            fmt.height = req.size.height;
            let negotiated = dev.set_format(&fmt)?;
            if &negotiated.fourcc.repr == fcc {
                actual = Some(negotiated);
                break;
            }
        }
        let actual = actual.ok_or_else(|| anyhow!("{path} supports neither MJPG nor YUYV"))?;

        let mut params = dev.params()?;
        params.interval.numerator = 1;
        params.interval.denominator = req.fps;
        if let Err(e) = dev.set_params(&params) {
            tracing::warn!("Could not set {} fps on {}: {}", req.fps, path, e);
        }

        // the stream keeps its own handle to the device
        let stream = Stream::with_buffers(&dev, Type::VideoCapture, 4)?;

        tracing::info!(
            "Camera opened: {} {}x{} [{}] at {} fps",
            path, actual.width, actual.height, actual.fourcc, req.fps
        );

        Ok(Self {
            path,
            stream: Some(stream),
            fourcc: actual.fourcc,
            width: actual.width,
            height: actual.height,
        })
    }

    fn next_rgb(&mut self) -> Result<RgbImage> {
        let stream = self.stream.as_mut().ok_or_else(|| anyhow!("capture closed"))?;
        let (data, _) = stream.next()?;

        match &self.fourcc.repr {
            b"MJPG" => Ok(image::load_from_memory_with_format(data, ImageFormat::Jpeg)?.to_rgb8()),
            b"YUYV" => Ok(yuyv_to_rgb(data, self.width, self.height)),
            _ => Err(anyhow!("unsupported pixel format {}", self.fourcc)),
        }
    }
}

impl FrameSourcePort for V4l2Capture {
    fn next_frame(&mut self) -> DomainResult<Frame> {
        self.next_rgb()
            .map(Frame::new)
            .map_err(|e| DomainError::SourceExhausted(format!("{}: {e}", self.path)))
    }

    fn close(&mut self) {
        if self.stream.take().is_some() {
            tracing::info!("Camera released: {}", self.path);
        }
    }
}

/// YUYV (YUV 4:2:2) to RGB. Every 4 bytes [Y0, U, Y1, V] carry two pixels.
fn yuyv_to_rgb(yuyv: &[u8], w: u32, h: u32) -> RgbImage {
    let mut out = RgbImage::new(w, h);

    for (i, chunk) in yuyv.chunks_exact(4).enumerate() {
        let u = chunk[1] as f32 - 128.0;
        let v = chunk[3] as f32 - 128.0;

        let pixel_idx = i as u32 * 2;
        let x = pixel_idx % w;
        let y = pixel_idx / w;
        if y >= h {
            break;
        }

        out.put_pixel(x, y, bt601(chunk[0] as f32, u, v));
        if x + 1 < w {
            out.put_pixel(x + 1, y, bt601(chunk[2] as f32, u, v));
        }
    }
    out
}

fn bt601(y: f32, u: f32, v: f32) -> image::Rgb<u8> {
    let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
    let g = (y - 0.344136 * u - 0.714136 * v).clamp(0.0, 255.0) as u8;
    let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;
    image::Rgb([r, g, b])
}
