// src/bin/tonemap.rs — Command-line host for the convolution / tone-map pipeline.
//
// Usage:
//   tonemap <input> -g <gamma> [-f <filter>] [-c] [output]
//
//   -g, --gamma       tone-mapping exponent (required; < 1 compresses)
//   -f, --filter      kernel file: dimension N, then N² weights
//   -c                tone map with a convolved log-luminance base layer
//   output            where to write the result; .exr and .hdr keep floats,
//                     anything else is quantized to 8 bits
//
// Decoding and encoding go through the `image` crate. The library only
// sees float RGBA buffers.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use log::info;

use spatial_tonemap::convert::{self, Origin};
use spatial_tonemap::tonemap::DEFAULT_EPSILON;
use spatial_tonemap::{
    BlackPixelPolicy, ImageBuffers, Kernel, Pipeline, PipelineConfig, Stage, ToneMapMode,
    ToneMapper,
};

#[derive(Debug, Parser)]
#[command(name = "tonemap")]
#[command(about = "Convolve and tone map an HDR image")]
struct Cli {
    /// Image to read.
    input: PathBuf,

    /// Where to write the result. Nothing is written if omitted.
    output: Option<PathBuf>,

    /// Tone-mapping exponent.
    #[arg(short, long)]
    gamma: Option<f32>,

    /// Kernel file: dimension first, then the weights row by row.
    #[arg(short, long)]
    filter: Option<PathBuf>,

    /// Tone map with a convolved base layer instead of the global curve.
    #[arg(short = 'c', long = "convolve-tonemap")]
    local: bool,

    /// Convolution passes to run before tone mapping.
    #[arg(long, default_value_t = 1)]
    passes: usize,

    /// Explicit stage list, overriding the default order.
    #[arg(long, value_enum, value_delimiter = ',')]
    stages: Option<Vec<StageArg>>,

    /// Handling of pixels whose luminance cannot be mapped.
    #[arg(long, value_enum, default_value_t = PolicyArg::PassThrough)]
    black_policy: PolicyArg,

    /// Luminance floor for `--black-policy epsilon`.
    #[arg(long, default_value_t = DEFAULT_EPSILON)]
    epsilon: f32,

    /// Convolve rows on all cores.
    #[arg(long)]
    parallel: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StageArg {
    Convolve,
    Tonemap,
    Reset,
    Commit,
    Toggle,
}

impl From<StageArg> for Stage {
    fn from(arg: StageArg) -> Self {
        match arg {
            StageArg::Convolve => Stage::Convolve,
            StageArg::Tonemap => Stage::ToneMap,
            StageArg::Reset => Stage::Reset,
            StageArg::Commit => Stage::Commit,
            StageArg::Toggle => Stage::Toggle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PolicyArg {
    PassThrough,
    Epsilon,
    Error,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run(Cli::parse()) {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // Configuration first: nothing is decoded until it all checks out.
    let mapper = ToneMapper::from_option(cli.gamma)?;
    let kernel = cli.filter.as_deref().map(load_kernel).transpose()?;

    let stages: Vec<Stage> = match &cli.stages {
        Some(list) => list.iter().copied().map(Stage::from).collect(),
        None => default_stages(kernel.is_some() && !cli.local, cli.passes),
    };
    let policy = match cli.black_policy {
        PolicyArg::PassThrough => BlackPixelPolicy::PassThrough,
        PolicyArg::Epsilon => BlackPixelPolicy::Epsilon(cli.epsilon),
        PolicyArg::Error => BlackPixelPolicy::Error,
    };
    let mode = if cli.local { ToneMapMode::Local } else { ToneMapMode::Global };

    let config = PipelineConfig::new(mapper.gamma())?
        .with_stages(stages)
        .with_black_policy(policy)
        .with_tone_mode(mode)
        .with_parallel(cli.parallel);
    let pipeline = Pipeline::new(config, kernel)?;

    let mut buffers = load_image(&cli.input)?;
    let (w, h) = buffers.dimensions();
    info!("loaded {} ({w}x{h})", cli.input.display());

    let summary = pipeline.run(&mut buffers)?;
    info!(
        "{} convolution pass(es), {} tone map pass(es)",
        summary.convolutions,
        summary.tone_maps.len()
    );

    match &cli.output {
        Some(path) => {
            save_image(path, &buffers)?;
            info!("wrote {}", path.display());
        }
        None => println!("The optional image output file was not provided."),
    }
    Ok(())
}

fn default_stages(convolve: bool, passes: usize) -> Vec<Stage> {
    let mut stages = Vec::with_capacity(passes + 1);
    if convolve {
        stages.extend(std::iter::repeat(Stage::Convolve).take(passes));
    }
    stages.push(Stage::ToneMap);
    stages
}

fn load_kernel(path: &Path) -> Result<Kernel> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read filter {}", path.display()))?;
    let kernel = Kernel::parse_filter_file(&text)
        .with_context(|| format!("bad filter {}", path.display()))?;
    info!("filter {}: {1}x{1}", path.display(), kernel.size());
    Ok(kernel)
}

fn load_image(path: &Path) -> Result<ImageBuffers> {
    let decoded = image::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?
        .to_rgb32f();
    let (w, h) = decoded.dimensions();
    let img = convert::from_interleaved(w as usize, h as usize, 3, decoded.as_raw(), Origin::TopLeft)?;
    Ok(ImageBuffers::new(img))
}

fn save_image(path: &Path, buffers: &ImageBuffers) -> Result<()> {
    let img = buffers.working();
    let (w, h) = (img.width() as u32, img.height() as u32);
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let result = if ext == "exr" || ext == "hdr" {
        let data = convert::to_interleaved_rgba(img, Origin::TopLeft);
        let Some(buf) = image::Rgba32FImage::from_raw(w, h, data) else {
            bail!("float buffer does not match {w}x{h}");
        };
        if ext == "hdr" {
            image::DynamicImage::ImageRgba32F(buf).to_rgb32f().save(path)
        } else {
            buf.save(path)
        }
    } else {
        let data = convert::to_rgba8(img, Origin::TopLeft);
        let Some(buf) = image::RgbaImage::from_raw(w, h, data) else {
            bail!("8-bit buffer does not match {w}x{h}");
        };
        buf.save(path)
    };
    result.with_context(|| format!("failed to write {}", path.display()))
}
