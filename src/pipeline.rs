// pipeline.rs — Ordered convolution / tone-map stages over an ImageBuffers pair.
//
// The host decides which stages run and in what order:
//
//   raw buffer → ImageBuffers → [Convolve]* → [ToneMap]? → ImageBuffers → sink
//
// plus the two buffer copies (Reset, Commit) and the parity Toggle, so a
// scripted session can reproduce what a user would do interactively.
//
// Everything that can be wrong with the configuration (bad gamma, a stage
// that needs a kernel when there is none) is caught in `Pipeline::new`,
// before any pixel is read.

use std::time::Instant;

use log::{debug, trace};

use crate::buffer::{BufferCopy, ImageBuffers};
use crate::color::Rgba;
use crate::convolution::{convolve, convolve_parallel};
use crate::error::{ConfigError, Result};
use crate::image::Image;
use crate::kernel::Kernel;
use crate::tonemap::{BlackPixelPolicy, ToneMapMode, ToneMapStats, ToneMapper};

/// One step of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Convolve the working buffer with the kernel.
    Convolve,
    /// Tone map the working buffer.
    ToneMap,
    /// working ← original
    Reset,
    /// original ← working
    Commit,
    /// Reset or Commit, alternating.
    Toggle,
}

/// Pipeline configuration.
///
/// There is no `Default`: the gamma exponent has no sensible fallback and
/// must come from the caller.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Tone-mapping exponent. Below 1 compresses, above 1 expands.
    pub gamma: f32,
    /// What tone mapping does with black or non-finite pixels.
    pub black_policy: BlackPixelPolicy,
    /// Global curve or convolved base layer.
    pub tone_mode: ToneMapMode,
    /// Split convolution across rayon workers by row.
    pub parallel: bool,
    /// Stages in run order.
    pub stages: Vec<Stage>,
}

impl PipelineConfig {
    /// A configuration that only tone maps, with the given gamma.
    pub fn new(gamma: f32) -> std::result::Result<Self, ConfigError> {
        ToneMapper::new(gamma)?;
        Ok(PipelineConfig {
            gamma,
            black_policy: BlackPixelPolicy::default(),
            tone_mode: ToneMapMode::Global,
            parallel: false,
            stages: vec![Stage::ToneMap],
        })
    }

    /// Replace the stage list.
    pub fn with_stages(mut self, stages: impl IntoIterator<Item = Stage>) -> Self {
        self.stages = stages.into_iter().collect();
        self
    }

    pub fn with_black_policy(mut self, policy: BlackPixelPolicy) -> Self {
        self.black_policy = policy;
        self
    }

    pub fn with_tone_mode(mut self, mode: ToneMapMode) -> Self {
        self.tone_mode = mode;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// What a run did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Convolution passes applied.
    pub convolutions: usize,
    /// Stats from each tone-map pass, in order.
    pub tone_maps: Vec<ToneMapStats>,
    /// Buffer copies performed by Reset / Commit / Toggle.
    pub copies: Vec<BufferCopy>,
}

/// A validated, ready-to-run pipeline.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    kernel: Option<Kernel>,
    mapper: ToneMapper,
}

impl Pipeline {
    /// Validate `config` against the available kernel.
    pub fn new(config: PipelineConfig, kernel: Option<Kernel>) -> Result<Self> {
        let mapper = ToneMapper::new(config.gamma)?.with_policy(config.black_policy);

        if kernel.is_none() {
            if config.stages.contains(&Stage::Convolve) {
                return Err(ConfigError::MissingKernel("convolution").into());
            }
            if config.tone_mode == ToneMapMode::Local && config.stages.contains(&Stage::ToneMap) {
                return Err(ConfigError::MissingKernel("local tone mapping").into());
            }
        }

        debug!(
            "pipeline: stages {:?}, gamma {}, mode {:?}, kernel {}",
            config.stages,
            config.gamma,
            config.tone_mode,
            kernel.as_ref().map_or("none".to_string(), |k| format!("{0}x{0}", k.size())),
        );
        Ok(Pipeline { config, kernel, mapper })
    }

    #[inline]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    #[inline]
    pub fn kernel(&self) -> Option<&Kernel> {
        self.kernel.as_ref()
    }

    /// One convolution pass over the working buffer.
    pub fn convolve(&self, buffers: &mut ImageBuffers) -> Result<()> {
        let kernel = self.require_kernel("convolution")?;
        let src = buffers.working();
        let out = if self.config.parallel {
            convolve_parallel(src, kernel)
        } else {
            convolve(src, kernel)
        };
        buffers.set_working(out);
        Ok(())
    }

    /// One tone-map pass over the working buffer.
    pub fn tonemap(&self, buffers: &mut ImageBuffers) -> Result<ToneMapStats> {
        match self.config.tone_mode {
            ToneMapMode::Global => self.mapper.apply(buffers.working_mut()),
            ToneMapMode::Local => {
                let kernel = self.require_kernel("local tone mapping")?;
                self.mapper.apply_local(buffers.working_mut(), kernel)
            }
        }
    }

    /// Run every configured stage in order. Stops at the first error.
    pub fn run(&self, buffers: &mut ImageBuffers) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        for &stage in &self.config.stages {
            let start = Instant::now();
            match stage {
                Stage::Convolve => {
                    self.convolve(buffers)?;
                    summary.convolutions += 1;
                }
                Stage::ToneMap => summary.tone_maps.push(self.tonemap(buffers)?),
                Stage::Reset => {
                    buffers.reset_from_original();
                    summary.copies.push(BufferCopy::Reset);
                }
                Stage::Commit => {
                    buffers.commit_to_original();
                    summary.copies.push(BufferCopy::Commit);
                }
                Stage::Toggle => summary.copies.push(buffers.toggle()),
            }
            trace!("stage {stage:?} took {:.2?}", start.elapsed());
        }
        Ok(summary)
    }

    /// Run the stages on a single image and return the working result.
    pub fn process(&self, image: Image<Rgba>) -> Result<Image<Rgba>> {
        let mut buffers = ImageBuffers::new(image);
        self.run(&mut buffers)?;
        Ok(buffers.into_working())
    }

    fn require_kernel(&self, what: &'static str) -> std::result::Result<&Kernel, ConfigError> {
        self.kernel.as_ref().ok_or(ConfigError::MissingKernel(what))
    }
}
