use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use timeline::{
    layout::{DebugLayout, LayoutConfig},
    reconstruct_table, Breakpoint, Clip, ClipCatalog, CompositionBuilder, CompositionConfig,
    RationalTime, TimeInterval, TimelineModel, VolumeRampPolicy, Window, DEFAULT_TIMESCALE,
};
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "crossfade-cli")]
#[command(about = "Crossfade timeline builder - headless composition and envelope inspection")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true)]
    verbose: bool,

    /// Override the requested transition duration, in seconds
    #[arg(long, global = true)]
    transition: Option<f64>,

    /// Fade volume across every transition instead of only the first
    #[arg(long, global = true)]
    per_transition_volume: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the timeline and print its windows, tracks and envelopes
    Build {
        /// Project file path
        project: PathBuf,

        /// Print the whole model as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the breakpoints reconstructed from each envelope
    Envelopes {
        /// Project file path
        project: PathBuf,
    },

    /// Print debug view geometry for the built timeline
    Layout {
        /// Project file path
        project: PathBuf,

        /// View width
        #[arg(long, default_value = "1024")]
        width: f64,

        /// View height
        #[arg(long, default_value = "200")]
        height: f64,
    },

    /// Print a sample two-clip project file
    Sample,
}

/// On-disk project: the clip catalog plus optional build and layout settings.
#[derive(Debug, Serialize, Deserialize)]
struct ProjectFile {
    #[serde(default)]
    composition: CompositionConfig,
    #[serde(default)]
    layout: LayoutConfig,
    clips: ClipCatalog,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt().with_max_level(level).init();

    let overrides = Overrides {
        transition: cli.transition,
        per_transition_volume: cli.per_transition_volume,
    };

    match cli.command {
        Commands::Build { project, json } => build_command(&project, &overrides, json),
        Commands::Envelopes { project } => envelopes_command(&project, &overrides),
        Commands::Layout {
            project,
            width,
            height,
        } => layout_command(&project, &overrides, width, height),
        Commands::Sample => sample_command(),
    }
}

struct Overrides {
    transition: Option<f64>,
    per_transition_volume: bool,
}

impl Overrides {
    fn apply(&self, config: &mut CompositionConfig) {
        if let Some(seconds) = self.transition {
            config.transition_duration = RationalTime::from_seconds(seconds, DEFAULT_TIMESCALE);
        }
        if self.per_transition_volume {
            config.volume_ramps = VolumeRampPolicy::PerTransition;
        }
    }
}

fn load_project(path: &Path) -> Result<ProjectFile> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read project {}", path.display()))?;
    let project: ProjectFile = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse project {}", path.display()))?;
    debug!("Loaded {} clips from {:?}", project.clips.len(), path);
    Ok(project)
}

fn build_model(project: &ProjectFile, overrides: &Overrides) -> Result<TimelineModel> {
    let mut config = project.composition.clone();
    overrides.apply(&mut config);

    info!(
        "Building {} clips with a {:.3}s transition",
        project.clips.len(),
        config.transition_duration.as_seconds()
    );
    let model = CompositionBuilder::new(config).build(&project.clips)?;
    Ok(model)
}

fn build_command(path: &Path, overrides: &Overrides, json: bool) -> Result<()> {
    let project = load_project(path)?;
    let model = build_model(&project, overrides)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&model)?);
        return Ok(());
    }

    println!("transition: {}s", seconds(model.transition_duration));
    println!("total:      {}s", seconds(model.total_duration));

    println!("clips:");
    for (i, clip) in project.clips.iter().enumerate() {
        println!(
            "  {:<3} {} {:?} trim {}",
            i,
            clip.id,
            clip.name,
            interval_label(clip.trim_range)
        );
    }

    println!("windows:");
    for window in &model.windows {
        println!(
            "  {:<15} clip {:<3} {}",
            window_label(window),
            window.clip_index(),
            interval_label(window.interval())
        );
    }

    println!("tracks:");
    for track in &model.tracks {
        let segments: Vec<String> = track
            .describe()
            .into_iter()
            .map(|d| if d.is_empty() { "<empty>".to_string() } else { d })
            .collect();
        println!("  {} {}: {}", track.kind, track.lane, segments.join(" | "));
    }

    println!("envelopes:");
    for (key, envelope) in &model.envelopes {
        println!("  {}: {}", key, breakpoints_label(&envelope.breakpoints()));
    }

    Ok(())
}

fn envelopes_command(path: &Path, overrides: &Overrides) -> Result<()> {
    let project = load_project(path)?;
    let model = build_model(&project, overrides)?;

    let table = reconstruct_table(&model.envelopes, model.total_duration);
    if table.is_empty() {
        info!("Timeline has no envelopes");
    }
    for (key, points) in &table {
        println!("{}: {}", key, breakpoints_label(points));
    }
    Ok(())
}

fn layout_command(path: &Path, overrides: &Overrides, width: f64, height: f64) -> Result<()> {
    let project = load_project(path)?;
    let model = build_model(&project, overrides)?;
    let layout = DebugLayout::for_model(&model, width, height, &project.layout);

    println!(
        "banners: {}  rows: {}  row height: {:.1}",
        layout.banner_count, layout.row_count, layout.row_height
    );
    println!("scale: {:.3} per second", layout.scale.points_per_second);
    for window in &model.windows {
        let interval = window.interval();
        println!(
            "  {:<15} clip {:<3} x {:.1} .. {:.1}",
            window_label(window),
            window.clip_index(),
            layout.scale.x_for(interval.start),
            layout.scale.x_for(interval.end())
        );
    }
    Ok(())
}

fn sample_command() -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&sample_project()?)?);
    Ok(())
}

fn sample_project() -> Result<ProjectFile> {
    let at = |s: i64| RationalTime::new(s * DEFAULT_TIMESCALE as i64, DEFAULT_TIMESCALE);
    let clips = ClipCatalog::from_clips(vec![
        Clip::new("clip1.mov", at(10)).with_trim(TimeInterval::new(at(0), at(5)))?,
        Clip::new("clip2.mov", at(8)).with_trim(TimeInterval::new(at(0), at(5)))?,
    ]);
    Ok(ProjectFile {
        composition: CompositionConfig::default(),
        layout: LayoutConfig::default(),
        clips,
    })
}

fn window_label(window: &Window) -> &'static str {
    match window {
        Window::PassThrough { .. } => "pass_through",
        Window::TransitionIn { .. } => "transition_in",
        Window::TransitionOut { .. } => "transition_out",
    }
}

fn seconds(time: RationalTime) -> String {
    format!("{:.3}", time.as_seconds())
}

fn interval_label(interval: TimeInterval) -> String {
    format!("[{}, {})", seconds(interval.start), seconds(interval.end()))
}

fn breakpoints_label(points: &[Breakpoint]) -> String {
    points
        .iter()
        .map(|p| format!("({}, {:.2})", seconds(p.time), p.value))
        .collect::<Vec<_>>()
        .join(" ")
}
