// dsdiff-cli
// Copyright (c) 2026 The dsdiff-rs Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Justification: every output format's sink/transform pair is built the same shape
// (Option<Box<dyn Transform>>, Box<dyn Sink>)) and it reads better inline than behind
// a type alias used in exactly one function.
#![allow(clippy::type_complexity)]

mod exit_code;
mod pcm_sink;
mod track_select;

use clap::{Parser, ValueEnum};
use dsdiff::{DsdiffSink, DsdiffSource, DsfSink, Error, Format, Pipeline, Result, Sink, Source, Transform};
use dsdiff_pipeline::transforms::dsd_to_pcm::{DsdToPcmTransform, SinglePoleDecimator};
use log::{error, info, warn};
use pcm_sink::{RawPcmSink, WideningPcmKernel};
use std::path::PathBuf;

/// Read, write, and convert DSDIFF files: split tracks out, re-wrap DSD as DSF, or
/// decimate DSD down to a raw PCM dump.
#[derive(Parser, Debug)]
#[command(name = "dsdiff-cli", version, about)]
struct Cli {
    /// Source DSDIFF file to read.
    input: PathBuf,

    /// One output sink as `<kind>:<path>`, kind one of dsdiff, dsf, pcm. Repeat for
    /// multiple outputs (up to 8). `<path>` may contain a `{track}` placeholder to
    /// write one file per selected track instead of one combined file.
    #[arg(short = 'o', long = "output", required = true)]
    outputs: Vec<String>,

    /// Tracks to process: "all", a comma-separated list ("1,3"), a range ("2-5"), or
    /// a combination ("1,3-5,8"). Track numbers are 1-based.
    #[arg(short = 't', long = "tracks", default_value = "all")]
    tracks: String,

    /// Decimation quality for `pcm` outputs.
    #[arg(long, value_enum, default_value_t = Quality::Normal)]
    quality: Quality,

    /// Emit 64-bit float samples instead of 32-bit for `pcm` outputs.
    #[arg(long)]
    fp64: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Quality {
    Low,
    Normal,
    High,
}

impl Quality {
    /// (decimation factor, filter smoothing coefficient) fed to [`SinglePoleDecimator`].
    /// Lower decimation keeps more bandwidth at the cost of a gentler stopband; these
    /// three points are reference values, not a calibrated filter design.
    fn decimator_params(self) -> (u32, f32) {
        match self {
            Quality::Low => (64, 0.05),
            Quality::Normal => (32, 0.15),
            Quality::High => (8, 0.35),
        }
    }
}

enum OutputKind {
    Dsdiff,
    Dsf,
    Pcm,
}

struct OutputSpec {
    kind: OutputKind,
    path_template: String,
}

impl OutputSpec {
    fn parse(raw: &str) -> Result<OutputSpec> {
        let (kind, path) =
            raw.split_once(':').ok_or(Error::InvalidArg("output must be '<kind>:<path>'"))?;
        let kind = match kind {
            "dsdiff" => OutputKind::Dsdiff,
            "dsf" => OutputKind::Dsf,
            "pcm" => OutputKind::Pcm,
            _ => return Err(Error::InvalidArg("output kind must be dsdiff, dsf, or pcm")),
        };
        Ok(OutputSpec { kind, path_template: path.to_string() })
    }

    fn is_per_track(&self) -> bool {
        self.path_template.contains("{track}")
    }

    fn resolve_path(&self, track_number: usize) -> String {
        self.path_template.replace("{track}", &track_number.to_string())
    }
}

fn build_leg(cli: &Cli, spec: &OutputSpec, path: &str, format: Format) -> Result<(Option<Box<dyn Transform>>, Box<dyn Sink>)> {
    match spec.kind {
        OutputKind::Dsdiff => Ok((None, Box::new(DsdiffSink::create(path, format)?))),
        OutputKind::Dsf => Ok((None, Box::new(DsfSink::create(path, format)?))),
        OutputKind::Pcm => {
            let (decimation, alpha) = cli.quality.decimator_params();
            let sink: Box<dyn Sink> = Box::new(RawPcmSink::create(path)?);
            let transform: Box<dyn Transform> = if cli.fp64 {
                let kernel = WideningPcmKernel::new(SinglePoleDecimator::new(format.channels, alpha, decimation));
                Box::new(DsdToPcmTransform::new(kernel))
            }
            else {
                Box::new(DsdToPcmTransform::new(SinglePoleDecimator::new(format.channels, alpha, decimation)))
            };
            Ok((Some(transform), sink))
        }
    }
}

/// Runs every output whose path doesn't need per-track splitting through one shared
/// pipeline, so sinks fan out concurrently instead of each re-reading the source.
fn run_shared(cli: &Cli, selection: &[usize], specs: &[&OutputSpec], format: Format) -> Result<()> {
    let source = DsdiffSource::open(&cli.input)?;
    let mut pipeline = Pipeline::new(Box::new(source));
    for spec in specs {
        let (transform, sink) = build_leg(cli, spec, &spec.path_template, format)?;
        pipeline.add_sink(transform, sink)?;
    }
    for &track_idx in selection {
        pipeline.run(track_idx)?;
        info!("wrote track {}", track_idx + 1);
    }
    pipeline.finish()
}

/// Runs one output spec that needs a distinct file per track: a fresh source and
/// pipeline per track, since the sink itself changes between tracks.
fn run_per_track(cli: &Cli, track_idx: usize, spec: &OutputSpec, format: Format) -> Result<()> {
    let source = DsdiffSource::open(&cli.input)?;
    let mut pipeline = Pipeline::new(Box::new(source));
    let path = spec.resolve_path(track_idx + 1);
    let (transform, sink) = build_leg(cli, spec, &path, format)?;
    pipeline.add_sink(transform, sink)?;
    pipeline.run(track_idx)?;
    pipeline.finish()?;
    info!("wrote track {} to {}", track_idx + 1, path);
    Ok(())
}

fn run(cli: &Cli) -> Result<()> {
    if cli.outputs.is_empty() {
        return Err(Error::InvalidArg("at least one --output is required"));
    }
    if cli.outputs.len() > 8 {
        return Err(Error::InvalidArg("at most 8 outputs are supported"));
    }

    let probe = DsdiffSource::open(&cli.input)?;
    let track_count = probe.tracks().len();
    let format = probe.tracks()[0].format;
    drop(probe);

    let selection = track_select::parse_track_selection(&cli.tracks, track_count).map_err(|detail| {
        warn!("invalid track selection '{}': {detail}", cli.tracks);
        Error::TrackIndexInvalid
    })?;

    let specs: Vec<OutputSpec> =
        cli.outputs.iter().map(|raw| OutputSpec::parse(raw)).collect::<Result<_>>()?;

    let (shared, per_track): (Vec<&OutputSpec>, Vec<&OutputSpec>) =
        specs.iter().partition(|spec| !spec.is_per_track());

    if !shared.is_empty() {
        run_shared(cli, &selection, &shared, format)?;
    }
    for spec in &per_track {
        for &track_idx in &selection {
            run_per_track(cli, track_idx, spec, format)?;
        }
    }
    Ok(())
}

fn main() {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let code = match run(&cli) {
        Ok(()) => 0,
        Err(e) => {
            error!("{e}");
            exit_code::exit_code_for(&e)
        }
    };
    std::process::exit(code);
}
