//! Filter stage synchronization across a worker group.
//!
//! Each filter name in the chain is one stage, run in lock-step by every
//! rank:
//!
//! 1. **Agree** on the kernel, so an unknown filter aborts every rank together
//! 2. **Scatter** block slices of the current image from the coordinator
//! 3. **Compute** the rank's block against its local full-image copy
//! 4. **Gather** the filtered blocks into a new buffer on the coordinator
//! 5. **Broadcast** the new buffer, replacing every local copy
//!
//! Step 5 is what lets stage `k + 1` read neighbours across block boundaries
//! safely: all local copies hold exactly stage `k`'s output when it starts.

use std::ops::Range;
use std::path::Path;

use tracing::{debug, info};

use crate::config::FilterConfig;
use crate::error::{try_alloc, Error, Result};
use crate::filters::kernels::lookup;
use crate::filters::stencil::{evaluate_image, evaluate_into, Narrowing};
use crate::group::{Communicator, WorkerGroup};
use crate::image::Image;
use crate::partition::{plan, Block};
use crate::pnm;

/// Apply `filters` in order to `image` using `config.workers` ranks.
///
/// On error, stages that completed before the failing one stay applied to
/// `image`; the failing stage and everything after it are skipped.
pub fn apply_filters<S>(image: &mut Image, filters: &[S], config: &FilterConfig) -> Result<()>
where
    S: AsRef<str> + Sync,
{
    let blocks = plan(image.pixel_count(), config.workers)?;
    let ranges: Vec<Range<usize>> = blocks
        .iter()
        .map(|b| image.sample_range(b.start, b.len))
        .collect();
    let group = WorkerGroup::new(config.workers)?;

    debug!(
        workers = config.workers,
        block_len = blocks[0].len,
        "partitioned {} pixels",
        image.pixel_count()
    );

    let source: &Image = image;
    let outcomes = group.run(|comm| {
        let stage = Stage {
            block: blocks[comm.rank()],
            ranges: &ranges,
            narrowing: config.narrowing,
        };
        run_rank(comm, source, filters, &stage)
    });

    let (final_image, result) = outcomes
        .into_iter()
        .next()
        .ok_or_else(|| Error::WorkerGroup("worker group returned no ranks".into()))?;
    if let Some(final_image) = final_image {
        *image = final_image;
    }
    result
}

/// Single-process path: every stage runs over the whole image as one block.
///
/// Produces byte-identical output to [`apply_filters`] for any worker count.
pub fn apply_filters_serial<S: AsRef<str>>(
    image: &mut Image,
    filters: &[S],
    narrowing: Narrowing,
) -> Result<()> {
    for (stage, name) in filters.iter().enumerate() {
        let kernel = lookup(name.as_ref())?;
        debug!(stage, filter = %kernel.name(), "applying filter serially");
        let filtered = evaluate_image(image, kernel, narrowing)?;
        image.replace_samples(filtered)?;
    }
    Ok(())
}

/// Load `input`, apply `filters`, save to `output`.
///
/// Nothing is written unless every stage succeeds.
pub fn run<S>(input: &Path, output: &Path, filters: &[S], config: &FilterConfig) -> Result<()>
where
    S: AsRef<str> + Sync,
{
    let mut image = pnm::load(input)?;
    let config = config.capped_to(image.pixel_count());
    info!(
        input = %input.display(),
        width = image.width(),
        height = image.height(),
        mode = ?image.mode(),
        workers = config.workers,
        "loaded image"
    );

    apply_filters(&mut image, filters, &config)?;

    pnm::save(output, &image)?;
    info!(output = %output.display(), stages = filters.len(), "wrote filtered image");
    Ok(())
}

/// Per-rank parameters that stay fixed for the whole run.
struct Stage<'a> {
    block: Block,
    ranges: &'a [Range<usize>],
    narrowing: Narrowing,
}

/// Buffers each rank allocates once and reuses for every stage.
struct Scratch {
    /// This rank's copy of the full image.
    local: Image,
    block_in: Vec<u8>,
    block_out: Vec<u8>,
    /// Gather target on the coordinator; empty elsewhere.
    staged: Vec<u8>,
}

impl Scratch {
    fn allocate(comm: &Communicator<'_>, source: &Image, block: &Block) -> Result<Self> {
        let full_len = source.samples().len();
        let block_len = block.len * source.channels();

        let mut samples = try_alloc(full_len)?;
        if comm.is_root() {
            samples.copy_from_slice(source.samples());
        }
        let local = Image::new(
            source.width(),
            source.height(),
            source.mode(),
            source.max_value(),
            samples,
        )?;

        Ok(Self {
            local,
            block_in: try_alloc(block_len)?,
            block_out: try_alloc(block_len)?,
            staged: if comm.is_root() { try_alloc(full_len)? } else { Vec::new() },
        })
    }
}

/// Everything one rank does for the run. The coordinator hands back its
/// local image, which holds every stage that completed.
fn run_rank<S: AsRef<str>>(
    comm: &Communicator<'_>,
    source: &Image,
    filters: &[S],
    stage: &Stage<'_>,
) -> (Option<Image>, Result<()>) {
    let mut scratch = match comm.agree(Scratch::allocate(comm, source, &stage.block)) {
        Ok(scratch) => scratch,
        Err(e) => return (None, Err(e)),
    };

    let result = run_stages(comm, &mut scratch, filters, stage);
    let image = comm.is_root().then_some(scratch.local);
    (image, result)
}

fn run_stages<S: AsRef<str>>(
    comm: &Communicator<'_>,
    scratch: &mut Scratch,
    filters: &[S],
    stage: &Stage<'_>,
) -> Result<()> {
    // Workers start from the coordinator's image.
    comm.broadcast(scratch.local.samples_mut())?;

    for (index, name) in filters.iter().enumerate() {
        let kernel = comm.agree(lookup(name.as_ref()))?;
        if comm.is_root() {
            debug!(stage = index, filter = %kernel.name(), "starting stage");
        }

        comm.scatter(scratch.local.samples(), stage.ranges, &mut scratch.block_in)?;

        let own = stage.ranges[comm.rank()].clone();
        let computed = if scratch.block_in[..] != scratch.local.samples()[own] {
            Err(Error::WorkerGroup(format!(
                "rank {} local image diverged from the coordinator before stage {index}",
                comm.rank()
            )))
        } else {
            evaluate_into(
                &scratch.local,
                &stage.block,
                kernel,
                stage.narrowing,
                &mut scratch.block_out,
            )
        };
        comm.agree(computed)?;

        comm.gather(&scratch.block_out, stage.ranges, &mut scratch.staged)?;

        let swapped = if comm.is_root() {
            let next = std::mem::take(&mut scratch.staged);
            scratch
                .local
                .replace_samples(next)
                .map(|previous| scratch.staged = previous)
        } else {
            Ok(())
        };
        comm.agree(swapped)?;

        comm.broadcast(scratch.local.samples_mut())?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::kernels::FilterName;
    use crate::image::ChannelMode;

    fn pattern(width: usize, height: usize, mode: ChannelMode) -> Image {
        let len = width * height * mode.channels();
        let samples = (0..len)
            .map(|i| ((i * 53 + (i / 7) * 29 + 17) % 256) as u8)
            .collect();
        Image::new(width, height, mode, 255, samples).unwrap()
    }

    fn filtered(image: &Image, filters: &[&str], workers: usize) -> Image {
        let mut out = image.clone();
        let config = FilterConfig::default().with_workers(workers);
        apply_filters(&mut out, filters, &config).unwrap();
        out
    }

    #[test]
    fn test_uniform_smooth_4x4() {
        let image = Image::filled(4, 4, ChannelMode::Gray, 100).unwrap();
        for workers in [1, 2, 3, 16] {
            let out = filtered(&image, &["smooth"], workers);
            assert!(out.samples().iter().all(|&v| v == 100), "workers={workers}");
        }
    }

    #[test]
    fn test_no_seams_for_any_worker_count() {
        let chain = ["sharpen", "blur", "emboss", "mean", "smooth"];
        for mode in [ChannelMode::Gray, ChannelMode::Rgb] {
            let image = pattern(6, 5, mode);

            let mut reference = image.clone();
            apply_filters_serial(&mut reference, &chain, Narrowing::Wrap).unwrap();

            for workers in 1..=image.pixel_count() {
                let out = filtered(&image, &chain, workers);
                assert_eq!(
                    out.samples(),
                    reference.samples(),
                    "mode={mode:?} workers={workers}"
                );
            }
        }
    }

    #[test]
    fn test_multi_stage_matches_serial_on_wide_image() {
        let image = pattern(23, 9, ChannelMode::Rgb);
        let chain = ["blur", "sharpen", "sharpen", "mean"];

        let mut reference = image.clone();
        apply_filters_serial(&mut reference, &chain, Narrowing::Saturate).unwrap();

        let mut out = image.clone();
        let config = FilterConfig::default()
            .with_workers(7)
            .with_narrowing(Narrowing::Saturate);
        apply_filters(&mut out, &chain, &config).unwrap();
        assert_eq!(out, reference);
    }

    #[test]
    fn test_stage_order_matters() {
        let image = pattern(8, 8, ChannelMode::Gray);
        let a = filtered(&image, &["sharpen", "blur"], 3);
        let b = filtered(&image, &["blur", "sharpen"], 3);
        assert_ne!(a.samples(), b.samples());
    }

    #[test]
    fn test_unknown_filter_keeps_completed_stages() {
        let image = pattern(5, 5, ChannelMode::Gray);

        let mut expected = image.clone();
        apply_filters_serial(&mut expected, &["blur"], Narrowing::Wrap).unwrap();

        for workers in [1, 4] {
            let mut out = image.clone();
            let config = FilterConfig::default().with_workers(workers);
            let result = apply_filters(&mut out, &["blur", "nonexistent", "smooth"], &config);

            assert!(matches!(
                result,
                Err(Error::InvalidFilterName { ref name }) if name == "nonexistent"
            ));
            assert_eq!(out, expected, "workers={workers}");
        }
    }

    #[test]
    fn test_unknown_first_filter_leaves_image_untouched() {
        let image = pattern(4, 3, ChannelMode::Rgb);
        let mut out = image.clone();
        let result = apply_filters(&mut out, &["nonexistent"], &FilterConfig::default().with_workers(2));
        assert!(result.is_err());
        assert_eq!(out, image);
    }

    #[test]
    fn test_too_many_workers_rejected_before_any_stage() {
        let image = pattern(2, 2, ChannelMode::Gray);
        let mut out = image.clone();
        let result = apply_filters(&mut out, &["smooth"], &FilterConfig::default().with_workers(5));
        assert!(matches!(result, Err(Error::InvalidPartition(_))));
        assert_eq!(out, image);
    }

    #[test]
    fn test_empty_chain_is_identity() {
        let image = pattern(4, 4, ChannelMode::Gray);
        let out = filtered(&image, &[], 2);
        assert_eq!(out, image);
    }

    #[test]
    fn test_every_filter_serial_matches_group() {
        let image = pattern(9, 7, ChannelMode::Gray);
        for filter in FilterName::ALL {
            let mut reference = image.clone();
            apply_filters_serial(&mut reference, &[filter.as_str()], Narrowing::Wrap).unwrap();
            let out = filtered(&image, &[filter.as_str()], 5);
            assert_eq!(out, reference, "{filter}");
        }
    }
}
