use std::fs;
use std::io::Cursor;
use std::path::Path;

use chrono::NaiveDateTime;
use image::{DynamicImage, ImageFormat, ImageReader};
use tracing::{debug, error, info};

use crate::error::{DecodeError, ImageError};
use crate::models::{AnalyzedImage, AverageRgb, ColorAnalysis, Dimensions, Health, ImageAnalysis};

const EPSILON: f64 = 1e-6;
const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

/// Decoded 8-bit samples laid out row-major, `channels` values per pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub samples: Vec<u8>,
    pub format: String,
    pub mode: String,
}

impl PixelBuffer {
    pub fn new(
        width: u32,
        height: u32,
        channels: u8,
        samples: Vec<u8>,
        format: impl Into<String>,
    ) -> Self {
        Self {
            width,
            height,
            channels,
            samples,
            format: format.into(),
            mode: mode_for(channels).to_string(),
        }
    }

    /// Reads and decodes an image file, keeping its channel layout.
    /// Palette PNGs keep their indices as a single `P` channel.
    pub fn open(path: &Path) -> Result<Self, ImageError> {
        let bytes = fs::read(path)?;

        if bytes.starts_with(PNG_SIGNATURE) && is_indexed_png(&bytes)? {
            return Ok(decode_indexed_png(&bytes)?);
        }

        let reader = ImageReader::new(Cursor::new(bytes.as_slice()))
            .with_guessed_format()
            .map_err(|e| DecodeError::Format(e.to_string()))?;
        let format = reader
            .format()
            .or_else(|| ImageFormat::from_path(path).ok())
            .map(|f| format!("{f:?}").to_uppercase())
            .unwrap_or_else(|| "UNKNOWN".to_string());
        let image = reader
            .decode()
            .map_err(|e| DecodeError::Format(e.to_string()))?;
        Ok(Self::from_dynamic(image, format))
    }

    pub fn from_dynamic(image: DynamicImage, format: impl Into<String>) -> Self {
        let (width, height) = (image.width(), image.height());
        let channels = image.color().channel_count();
        let samples = match channels {
            1 => image.into_luma8().into_raw(),
            2 => image.into_luma_alpha8().into_raw(),
            3 => image.into_rgb8().into_raw(),
            _ => image.into_rgba8().into_raw(),
        };
        Self::new(width, height, channels.min(4), samples, format)
    }

    fn validate(&self) -> Result<(), DecodeError> {
        if self.channels == 0 || self.channels > 4 {
            return Err(DecodeError::Channels(self.channels));
        }
        if self.width == 0 || self.height == 0 {
            return Err(DecodeError::Empty {
                width: self.width,
                height: self.height,
            });
        }
        let expected = self.width as usize * self.height as usize * self.channels as usize;
        if self.samples.len() != expected {
            return Err(DecodeError::SampleCount {
                expected,
                found: self.samples.len(),
            });
        }
        Ok(())
    }
}

fn is_indexed_png(bytes: &[u8]) -> Result<bool, DecodeError> {
    let reader = png::Decoder::new(Cursor::new(bytes))
        .read_info()
        .map_err(|e| DecodeError::Format(e.to_string()))?;
    Ok(reader.info().color_type == png::ColorType::Indexed)
}

/// Palette indices, one byte per pixel, without expanding the palette.
fn decode_indexed_png(bytes: &[u8]) -> Result<PixelBuffer, DecodeError> {
    let mut decoder = png::Decoder::new(Cursor::new(bytes));
    decoder.set_transformations(png::Transformations::IDENTITY);
    let mut reader = decoder
        .read_info()
        .map_err(|e| DecodeError::Format(e.to_string()))?;

    let mut buf = vec![0; reader.output_buffer_size()];
    let frame = reader
        .next_frame(&mut buf)
        .map_err(|e| DecodeError::Format(e.to_string()))?;

    let (width, height) = (frame.width, frame.height);
    let depth = frame.bit_depth as usize;
    let per_byte = 8 / depth;
    let mask = ((1u16 << depth) - 1) as u8;

    let mut samples = Vec::with_capacity(width as usize * height as usize);
    for row in buf[..frame.buffer_size()].chunks(frame.line_size) {
        for x in 0..width as usize {
            let byte = row[x / per_byte];
            let shift = 8 - depth * (x % per_byte + 1);
            samples.push((byte >> shift) & mask);
        }
    }

    let mut buffer = PixelBuffer::new(width, height, 1, samples, "PNG");
    buffer.mode = "P".to_string();
    Ok(buffer)
}

fn mode_for(channels: u8) -> &'static str {
    match channels {
        1 => "L",
        2 => "LA",
        3 => "RGB",
        4 => "RGBA",
        _ => "UNKNOWN",
    }
}

pub fn analyze(buffer: &PixelBuffer) -> Result<ImageAnalysis, DecodeError> {
    buffer.validate()?;

    let color_analysis = analyze_colors(buffer);
    let estimated_health = match color_analysis.green_dominance() {
        Some(ratio) => classify_health(ratio),
        None => Health::Unknown,
    };

    Ok(ImageAnalysis {
        dimensions: Dimensions {
            width: buffer.width,
            height: buffer.height,
        },
        format: buffer.format.clone(),
        mode: buffer.mode.clone(),
        color_analysis,
        brightness: brightness(buffer),
        estimated_health,
    })
}

fn analyze_colors(buffer: &PixelBuffer) -> ColorAnalysis {
    if buffer.channels < 3 {
        return ColorAnalysis::Unavailable {
            error: "Image is not in color format".to_string(),
        };
    }

    let stride = buffer.channels as usize;
    let mut totals = [0u64; 3];
    for pixel in buffer.samples.chunks_exact(stride) {
        for (total, sample) in totals.iter_mut().zip(pixel) {
            *total += *sample as u64;
        }
    }

    let pixel_count = (buffer.samples.len() / stride) as f64;
    let red = totals[0] as f64 / pixel_count;
    let green = totals[1] as f64 / pixel_count;
    let blue = totals[2] as f64 / pixel_count;

    ColorAnalysis::Available {
        average_rgb: AverageRgb { red, green, blue },
        green_dominance: green_dominance(red, green, blue),
    }
}

pub fn green_dominance(red: f64, green: f64, blue: f64) -> f64 {
    green / (red + blue + EPSILON)
}

/// Flat mean of every sample, alpha included.
fn brightness(buffer: &PixelBuffer) -> f64 {
    let total: u64 = buffer.samples.iter().map(|s| *s as u64).sum();
    total as f64 / buffer.samples.len() as f64
}

pub fn classify_health(green_dominance: f64) -> Health {
    if green_dominance > 1.3 {
        Health::Excellent
    } else if green_dominance > 1.1 {
        Health::Good
    } else if green_dominance > 0.9 {
        Health::Fair
    } else {
        Health::Poor
    }
}

/// Analyzes each entry on its own; failures are logged and left out.
pub fn batch_analyze<I>(entries: I, analyzed_at: NaiveDateTime) -> Vec<AnalyzedImage>
where
    I: IntoIterator<Item = (String, Result<PixelBuffer, ImageError>)>,
{
    let mut results = Vec::new();

    for (filename, loaded) in entries {
        let analysis = loaded.and_then(|buffer| analyze(&buffer).map_err(ImageError::from));
        match analysis {
            Ok(analysis) => {
                debug!(file = %filename, health = %analysis.estimated_health, "image analyzed");
                results.push(AnalyzedImage {
                    filename,
                    analysis,
                    analyzed_at,
                });
            }
            Err(err) => error!(file = %filename, error = %err, "failed to analyze image"),
        }
    }

    info!(analyzed = results.len(), "batch analysis complete");
    results
}
