// src/tasks/images.rs

use std::path::PathBuf;

use anyhow::{Context, Result};
use image::{ColorType as DecodedColor, ImageFormat};
use jpeg_encoder::{ColorType, Encoder as JpegEncoder};
use quick_xml::events::Event;
use quick_xml::{Reader, Writer};
use tracing::debug;

use crate::tasks::{AssetTask, InputSet, SourceFile, TaskContext, TaskReport, for_each_source};
use crate::types::TaskKind;

/// Per-format settings used by `minimages`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compression {
    /// oxipng preset, 0 to 6.
    pub png_level: u8,
    /// Quality of the progressive JPEG re-encode, 1 to 100.
    pub jpeg_quality: u8,
}

/// Formats `minimages` knows how to shrink. Anything else is copied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Codec {
    Png,
    Jpeg,
    Gif,
    Svg,
}

impl Codec {
    fn of(source: &SourceFile) -> Option<Self> {
        let ext = source.path.extension()?.to_string_lossy().to_ascii_lowercase();
        match ext.as_str() {
            "png" => Some(Codec::Png),
            "jpg" | "jpeg" => Some(Codec::Jpeg),
            "gif" => Some(Codec::Gif),
            "svg" => Some(Codec::Svg),
            _ => None,
        }
    }
}

/// `copyimages` (plain copy) and `minimages` (recompression).
///
/// `minimages` runs PNG through oxipng, re-encodes JPEG as progressive,
/// rewrites GIF frames losslessly and strips comments, metadata and
/// formatting whitespace from SVG. Other formats (webp, ico, avif, ...) are
/// copied unchanged. An optimised image is never larger than its source.
#[derive(Debug, Clone)]
pub struct ImageTask {
    inputs: InputSet,
    output_dir: PathBuf,
    compression: Option<Compression>,
}

impl ImageTask {
    /// `compression = None` copies every image as-is.
    pub fn new(inputs: InputSet, output_dir: &str, compression: Option<Compression>) -> Self {
        Self {
            inputs,
            output_dir: PathBuf::from(output_dir),
            compression,
        }
    }

    fn output_path(&self, ctx: &TaskContext, source: &SourceFile) -> PathBuf {
        ctx.dist_root.join(&self.output_dir).join(&source.rel_base)
    }

    fn optimise(&self, source: &SourceFile, original: Vec<u8>) -> Result<Vec<u8>> {
        let Some(compression) = self.compression else {
            return Ok(original);
        };
        let Some(codec) = Codec::of(source) else {
            return Ok(original);
        };

        let optimised = match codec {
            Codec::Png => {
                let options = oxipng::Options::from_preset(compression.png_level);
                oxipng::optimize_from_memory(&original, &options).map_err(anyhow::Error::from)
            }
            Codec::Jpeg => progressive_jpeg(&original, compression.jpeg_quality),
            Codec::Gif => rewrite_gif(&original),
            Codec::Svg => strip_svg(&original),
        }
        .with_context(|| format!("optimising {}", source.rel_src.display()))?;

        if optimised.len() < original.len() {
            debug!(
                file = %source.rel_src.display(),
                ?codec,
                before = original.len(),
                after = optimised.len(),
                "optimised image"
            );
            Ok(optimised)
        } else {
            Ok(original)
        }
    }
}

fn progressive_jpeg(original: &[u8], quality: u8) -> Result<Vec<u8>> {
    let decoded = image::load_from_memory_with_format(original, ImageFormat::Jpeg)?;
    let width = u16::try_from(decoded.width()).context("jpeg too wide")?;
    let height = u16::try_from(decoded.height()).context("jpeg too tall")?;

    let mut out = Vec::with_capacity(original.len());
    let mut encoder = JpegEncoder::new(&mut out, quality);
    encoder.set_progressive(true);
    encoder.set_optimized_huffman_tables(true);

    if matches!(decoded.color(), DecodedColor::L8 | DecodedColor::L16) {
        encoder.encode(decoded.to_luma8().as_raw(), width, height, ColorType::Luma)?;
    } else {
        encoder.encode(decoded.to_rgb8().as_raw(), width, height, ColorType::Rgb)?;
    }
    Ok(out)
}

/// Decode every frame as palette indices and write them back out. Comments
/// and application extensions other than the loop count are dropped.
fn rewrite_gif(original: &[u8]) -> Result<Vec<u8>> {
    let mut options = gif::DecodeOptions::new();
    options.set_color_output(gif::ColorOutput::Indexed);
    let mut decoder = options.read_info(original)?;

    let mut frames = Vec::new();
    while let Some(frame) = decoder.read_next_frame()? {
        let mut frame = frame.clone();
        // The decoder hands rows back in display order.
        frame.interlaced = false;
        frames.push(frame);
    }

    let palette = decoder.global_palette().unwrap_or(&[]).to_vec();
    let mut out = Vec::with_capacity(original.len());
    {
        let mut encoder = gif::Encoder::new(&mut out, decoder.width(), decoder.height(), &palette)?;
        if frames.len() > 1 {
            encoder.set_repeat(decoder.repeat())?;
        }
        for frame in &frames {
            encoder.write_frame(frame)?;
        }
    }
    Ok(out)
}

fn is_editor_only(name: &[u8]) -> bool {
    name == b"metadata" || name.starts_with(b"sodipodi:") || name.starts_with(b"inkscape:")
}

/// Drop what browsers never render: XML declaration, doctype, processing
/// instructions, comments, `<metadata>` and editor-private elements, and
/// whitespace between tags.
fn strip_svg(original: &[u8]) -> Result<Vec<u8>> {
    let mut reader = Reader::from_reader(original);
    reader.config_mut().trim_text(true);
    let mut writer = Writer::new(Vec::with_capacity(original.len()));

    let mut buf = Vec::new();
    let mut skipped_depth = 0usize;
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(ref e) if skipped_depth > 0 || is_editor_only(e.name().as_ref()) => {
                skipped_depth += 1;
            }
            Event::End(_) if skipped_depth > 0 => skipped_depth -= 1,
            _ if skipped_depth > 0 => {}
            Event::Empty(ref e) if is_editor_only(e.name().as_ref()) => {}
            Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
            other => writer.write_event(other)?,
        }
        buf.clear();
    }
    Ok(writer.into_inner())
}

impl AssetTask for ImageTask {
    fn kind(&self) -> TaskKind {
        if self.compression.is_some() {
            TaskKind::MinImages
        } else {
            TaskKind::CopyImages
        }
    }

    fn plan(&self, ctx: &TaskContext) -> Result<Vec<PathBuf>> {
        let sources = self.inputs.collect(ctx.fs.as_ref(), &ctx.src_root)?;
        Ok(sources.iter().map(|s| self.output_path(ctx, s)).collect())
    }

    fn run(&self, ctx: &TaskContext) -> Result<TaskReport> {
        let sources = self.inputs.collect(ctx.fs.as_ref(), &ctx.src_root)?;
        for_each_source(self.kind(), &sources, |source, report| {
            let original = ctx.fs.read(&source.path)?;
            let bytes = self.optimise(source, original)?;
            report.write(ctx, self.output_path(ctx, source), &bytes)
        })
    }
}
