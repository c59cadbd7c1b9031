use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "storycut", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the timeline for a script and print it as JSON, without rendering.
    Plan(PlanArgs),
    /// Assemble and render a script into an MP4 (requires `ffmpeg` on PATH).
    Render(RenderArgs),
}

#[derive(Parser, Debug)]
struct CommonArgs {
    /// Project root; audio/visual paths in the script are relative to this.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Input script JSON (array of segments).
    #[arg(long = "script")]
    script_path: PathBuf,

    /// Output frame width.
    #[arg(long, default_value_t = 1920)]
    width: u32,

    /// Output frame height.
    #[arg(long, default_value_t = 1080)]
    height: u32,

    /// Output frame rate.
    #[arg(long, default_value_t = 24)]
    fps: u32,

    /// Transition spacer duration between scenes, in seconds (0 disables).
    #[arg(long, default_value_t = storycut::DEFAULT_TRANSITION_SEC)]
    transition: f64,
}

#[derive(Parser, Debug)]
struct PlanArgs {
    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Plan(args) => cmd_plan(args),
        Command::Render(args) => cmd_render(args),
    }
}

fn make_config(common: &CommonArgs, out: PathBuf) -> storycut::AssemblyConfig {
    let mut cfg =
        storycut::AssemblyConfig::new(&common.root, &common.script_path, out);
    cfg.resolution = storycut::Resolution {
        width: common.width,
        height: common.height,
    };
    cfg.fps = common.fps;
    cfg.transition_sec = common.transition;
    cfg
}

fn cmd_plan(args: PlanArgs) -> anyhow::Result<()> {
    let cfg = make_config(&args.common, PathBuf::from("unused.mp4"));
    let timeline = storycut::assemble_timeline(&cfg)?;
    println!("{}", serde_json::to_string_pretty(&timeline)?);
    eprintln!(
        "{} scenes, {} transitions, {:.3}s total",
        timeline.scene_count(),
        timeline.transition_count(),
        timeline.total_duration_sec()
    );
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let cfg = make_config(&args.common, args.out);
    let outcome = storycut::assemble_video(&cfg);
    match outcome.status {
        storycut::AssemblyStatus::Success => {
            let path = outcome
                .output_path
                .ok_or_else(|| anyhow::anyhow!("success outcome missing output path (bug)"))?;
            eprintln!("wrote {}", path.display());
            Ok(())
        }
        storycut::AssemblyStatus::Failure => anyhow::bail!(
            "assembly failed: {}",
            outcome
                .error_message
                .unwrap_or_else(|| "unknown error".to_string())
        ),
    }
}
