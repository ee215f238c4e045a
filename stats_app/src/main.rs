//! Scene statistics tool
//!
//! Loads a scene document, drives a render controller over a list of frames
//! and reports what it cost: locations, set sizes, controller edits, timings
//! and memory.

use anyhow::{Context as _, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::sync::Arc;

use scene_sync::foundation::logging;
use scene_sync::prelude::*;
use scene_sync::scene::LIGHTS_SET_NAME;

mod frames;
mod writer;

use frames::parse_frame_list;
use writer::{format_memory, format_seconds, group, item, Item, StatsWriter};

/// Parsed command line
#[derive(Debug, Default)]
struct StatsOptions {
    scene_file: PathBuf,
    output_file: Option<PathBuf>,
    frames: Option<String>,
    minimum_expansion_depth: Option<usize>,
    expand: Vec<String>,
    sets: Vec<String>,
    pre_cache: bool,
    config_file: Option<PathBuf>,
    json: bool,
}

fn build_command() -> Command {
    Command::new("scene_stats")
        .about("Reports statistics for synchronizing a scene into a renderer")
        .arg(
            Arg::new("scene")
                .value_name("FILE")
                .help("Scene document (.toml or .ron)")
                .required(true),
        )
        .arg(
            Arg::new("output-file")
                .short('o')
                .long("output-file")
                .value_name("FILE")
                .help("Write statistics to a file instead of stdout"),
        )
        .arg(
            Arg::new("frames")
                .short('f')
                .long("frames")
                .value_name("LIST")
                .help("Frames to synchronize, e.g. 1-10x2,15"),
        )
        .arg(
            Arg::new("min-expansion-depth")
                .long("min-expansion-depth")
                .value_name("DEPTH")
                .help("Locations at or above this depth have their children expanded")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("expand")
                .long("expand")
                .value_name("PATH")
                .help("Additional locations to expand")
                .num_args(1..)
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("sets")
                .long("sets")
                .value_name("NAME")
                .help("Sets to evaluate and measure")
                .num_args(1..)
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("pre-cache")
                .long("pre-cache")
                .help("Synchronize once before measuring")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Controller configuration (.toml or .ron)"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Write JSON instead of text")
                .action(ArgAction::SetTrue),
        )
}

impl StatsOptions {
    fn from_matches(matches: &ArgMatches) -> Self {
        let strings = |name: &str| -> Vec<String> {
            matches
                .get_many::<String>(name)
                .map(|values| values.cloned().collect())
                .unwrap_or_default()
        };
        Self {
            scene_file: matches.get_one::<String>("scene").map(PathBuf::from).unwrap_or_default(),
            output_file: matches.get_one::<String>("output-file").map(PathBuf::from),
            frames: matches.get_one::<String>("frames").cloned(),
            minimum_expansion_depth: matches.get_one::<usize>("min-expansion-depth").copied(),
            expand: strings("expand"),
            sets: strings("sets"),
            pre_cache: matches.get_flag("pre-cache"),
            config_file: matches.get_one::<String>("config").map(PathBuf::from),
            json: matches.get_flag("json"),
        }
    }

    /// Arguments as reported in the "Args" section, sorted by name
    fn items(&self) -> Vec<Item> {
        let mut items = vec![
            item("config", self.config_file.as_ref().map(|p| p.display().to_string()).unwrap_or_default()),
            item("expand", self.expand.join(" ")),
            item("frames", self.frames.clone().unwrap_or_default()),
            item("json", self.json),
            item(
                "minExpansionDepth",
                self.minimum_expansion_depth.map(|d| d.to_string()).unwrap_or_default(),
            ),
            item("outputFile", self.output_file.as_ref().map(|p| p.display().to_string()).unwrap_or_default()),
            item("preCache", self.pre_cache),
            item("scene", self.scene_file.display().to_string()),
            item("sets", self.sets.join(" ")),
        ];
        items.sort_by(|a, b| a.0.cmp(&b.0));
        items
    }

    fn controller_config(&self) -> Result<ControllerConfig> {
        let mut config = match &self.config_file {
            Some(path) => ControllerConfig::load_from_file(path)
                .with_context(|| format!("Failed to load controller config {}", path.display()))?,
            None => ControllerConfig::default(),
        };
        if let Some(depth) = self.minimum_expansion_depth {
            config.minimum_expansion_depth = depth;
        }
        for path in &self.expand {
            config
                .expanded_paths
                .push(ScenePath::parse(path).with_context(|| format!("Invalid --expand path {path:?}"))?);
        }
        Ok(config)
    }
}

/// Counts gathered by walking the whole scene
#[derive(Debug, Default, PartialEq, Eq)]
struct SceneSummary {
    locations: usize,
    objects: usize,
    lights: usize,
    max_depth: usize,
}

fn summarize(scene: &dyn SceneSource, context: &Context) -> Result<SceneSummary> {
    let lights = scene.set(LIGHTS_SET_NAME, context)?;
    let mut summary = SceneSummary::default();
    let mut pending = vec![ScenePath::root()];

    while let Some(path) = pending.pop() {
        summary.locations += 1;
        summary.max_depth = summary.max_depth.max(path.depth());
        if lights.contains(&path) {
            summary.lights += 1;
        } else if scene.object(&path, context)?.is_some() {
            summary.objects += 1;
        }
        for name in scene.child_names(&path, context)? {
            pending.push(path.child(name));
        }
    }
    Ok(summary)
}

fn report_items(report: &SyncReport) -> Vec<Item> {
    vec![
        item("Locations visited", report.locations_visited),
        item("Objects created", report.objects_created),
        item("Objects updated", report.objects_updated),
        item("Lights created", report.lights_created),
        item("Lights updated", report.lights_updated),
        item("Proxies pushed", report.proxies_pushed),
        item("Items removed", report.items_removed),
        item("Options changed", report.options_changed),
        item("Edits", report.edits()),
    ]
}

fn resident_memory() -> Option<u64> {
    let pid = sysinfo::get_current_pid().ok()?;
    let mut system = sysinfo::System::new();
    system.refresh_process(pid);
    system.process(pid).map(sysinfo::Process::memory)
}

fn run(options: &StatsOptions) -> Result<StatsWriter> {
    let mut writer = StatsWriter::new();
    let mut timings = Vec::new();

    writer.section(
        "Version",
        vec![
            item("scene_stats", env!("CARGO_PKG_VERSION")),
            item("Renderer", "Capturing"),
        ],
    );
    writer.section("Args", options.items());

    let mut loading = Stopwatch::start_new();
    let description = SceneDescription::load(&options.scene_file)
        .with_context(|| format!("Failed to load scene {}", options.scene_file.display()))?;
    let scene = Arc::new(description.build().context("Invalid scene description")?);
    loading.stop();
    timings.push(item("Loading", format_seconds(loading.elapsed_secs())));

    let frames = match &options.frames {
        Some(list) => parse_frame_list(list)?,
        None => vec![0],
    };
    let first_frame = frames.first().copied().unwrap_or_default();
    let first_context = Arc::new(Context::at_frame(first_frame as f32));

    let summary = summarize(scene.as_ref(), &first_context)?;
    writer.section(
        "Scene",
        vec![
            item("Locations", summary.locations),
            item("Objects", summary.objects),
            item("Lights", summary.lights),
            item("Max depth", summary.max_depth),
            item("Sets", scene.set_names(&first_context)?.len()),
        ],
    );

    let mut set_items = Vec::new();
    let mut set_seconds = 0.0;
    for name in &options.sets {
        let mut stopwatch = Stopwatch::start_new();
        let paths = scene.set(name, &first_context)?;
        stopwatch.stop();
        set_seconds += stopwatch.elapsed_secs();
        set_items.push(group(
            name.as_str(),
            vec![
                item("Paths", paths.len()),
                item("Time", format_seconds(stopwatch.elapsed_secs())),
            ],
        ));
    }
    writer.section("Sets", set_items);
    if !options.sets.is_empty() {
        timings.push(item("Sets", format_seconds(set_seconds)));
    }

    let renderer = Arc::new(CapturingRenderer::new(RenderType::Batch));
    let mut controller = RenderController::with_config(
        scene.clone(),
        first_context,
        renderer.clone(),
        options.controller_config()?,
    );

    if options.pre_cache {
        let mut pre_cache = Stopwatch::start_new();
        controller.update().context("Pre-cache sync failed")?;
        pre_cache.stop();
        timings.push(item("Pre-cache", format_seconds(pre_cache.elapsed_secs())));
    }

    let mut controller_items = Vec::new();
    let mut sync_time = Stopwatch::new();
    for frame in &frames {
        controller.set_context(Arc::new(Context::at_frame(*frame as f32)));
        let report = sync_time
            .time(|| controller.update())
            .with_context(|| format!("Sync failed at frame {frame}"))?;
        log::info!("Frame {frame}: {} edits", report.edits());
        controller_items.push(group(format!("Frame {frame}"), report_items(&report)));
    }
    controller_items.push(item("Tracked locations", controller.tracked_locations()));
    controller_items.push(item("Renderer items", renderer.item_ids().len()));
    writer.section("Controller", controller_items);

    timings.push(item("Scene sync", format_seconds(sync_time.elapsed_secs())));
    writer.section("Timing", timings);

    let mut memory = Vec::new();
    if let Some(bytes) = resident_memory() {
        memory.push(item("Resident size", format_memory(bytes)));
    }
    writer.section("Memory", memory);

    Ok(writer)
}

fn main() -> Result<()> {
    logging::init();
    let options = StatsOptions::from_matches(&build_command().get_matches());
    log::debug!("Running with {options:?}");

    let writer = run(&options)?;

    match &options.output_file {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
            writer.write_to(&mut BufWriter::new(file), options.json)
        }
        None => writer.write_to(&mut io::stdout().lock(), options.json),
    }
}
