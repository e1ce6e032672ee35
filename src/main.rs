mod api;
mod app;
mod config;
mod error;
mod scene;
mod speech;
mod view;

use anyhow::Context;
use api::CompletionClient;
use app::{AppController, AppEvent, Notice, PendingScene};
use clap::{Parser, Subcommand};
use config::AppConfig;
use error::GenerateError;
use scene::{Scene, SceneGenerator, SceneStore};
use speech::{HostSynthesizer, SpeechPlayer, SpeechSynthesizer};
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dialog-cards")]
#[command(about = "Language-learning dialog scenes with text-to-speech", long_about = None)]
struct Args {
    /// Scene collection (JSON array of scenes)
    #[arg(short, long)]
    scenes: Option<PathBuf>,

    /// Append generated scenes to the scene collection file
    #[arg(long)]
    persist_generated: bool,

    /// Locale used for speech synthesis, e.g. zh-CN
    #[arg(long)]
    locale: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List all scenes
    List,
    /// Show one scene (rows start at 1)
    Show { row: usize },
    /// Speak one line of a scene
    Play { row: usize, line: usize },
    /// Generate a new scene from a description
    Generate {
        #[arg(required = true, num_args = 1..)]
        description: Vec<String>,
    },
    /// List voices reported by the speech backend
    Voices,
    /// Browse scenes interactively (default)
    Interactive,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut config = AppConfig::from_env().context("Failed to read configuration")?;
    if let Some(path) = args.scenes {
        config.scenes_path = path;
    }
    if let Some(locale) = args.locale {
        config.locale = locale;
    }
    config.persist_generated |= args.persist_generated;

    let synthesizer = HostSynthesizer::detect();

    if let Some(Command::Voices) = args.command {
        let voices = synthesizer.voices().await.context("Failed to list voices")?;
        if voices.is_empty() {
            println!("No voices available from {}", synthesizer.name());
        }
        for voice in voices {
            println!("{:<40} {}", voice.name, voice.lang);
        }
        return Ok(());
    }

    let store = SceneStore::load(&config.scenes_path)
        .await
        .context("Failed to load scenes")?;

    // 没有配置补全接口时仍然可以浏览和播放
    let generator = match CompletionClient::new(&config.completion) {
        Ok(client) => Some(SceneGenerator::new(client, config.require_aligned_translation)),
        Err(e) => {
            info!("Scene generation disabled: {}", e);
            None
        }
    };

    let player = SpeechPlayer::spawn(synthesizer, config.locale.clone());
    let mut app = AppController::new(
        store,
        player,
        generator,
        config.speakers.clone(),
        config.persist_generated,
    );
    if app.store().is_empty() {
        warn!("No scenes found in {}", config.scenes_path.display());
    } else {
        info!("{} scenes available", app.store().len());
    }

    match args.command.unwrap_or(Command::Interactive) {
        Command::List => print!("{}", app.list()),
        Command::Show { row } => {
            if select(&mut app, row) {
                print_detail(&app);
            }
        }
        Command::Play { row, line } => {
            if select(&mut app, row) {
                match line.checked_sub(1) {
                    Some(index) => report(app.handle(AppEvent::Play(index))),
                    None => eprintln!("Lines start at 1"),
                }
            }
        }
        Command::Generate { description } => {
            report(Some(app.generate(&description.join(" ")).await));
            // 单次命令中只有生成成功才会有详情视图
            print_detail(&app);
        }
        Command::Interactive => run_interactive(&mut app).await?,
        Command::Voices => {}
    }

    app.shutdown().await;
    Ok(())
}

fn select(app: &mut AppController, row: usize) -> bool {
    let Some(index) = row.checked_sub(1) else {
        eprintln!("Rows start at 1");
        return false;
    };
    match app.handle(AppEvent::Select(index)) {
        None => true,
        notice => {
            report(notice);
            false
        }
    }
}

fn print_detail(app: &AppController) {
    if let Some(detail) = app.detail() {
        print!("{}", detail);
    }
}

/// 生成成功时即使保存失败也会展示场景
async fn finish_generate(app: &mut AppController, result: Result<Scene, GenerateError>) {
    let generated = result.is_ok();
    report(Some(app.finish_generate(result).await));
    if generated {
        print_detail(app);
    }
}

fn report(notice: Option<Notice>) {
    match notice {
        Some(Notice::Alert(msg)) => eprintln!("! {}", msg),
        Some(Notice::Info(msg)) => println!("{}", msg),
        None => {}
    }
}

const HELP: &str = "\
Commands:
  list                 show the scene list
  <n> | select <n>     show scene n
  play <n>             speak line n of the current scene
  gen <description>    generate a new scene
  help                 show this help
  quit                 exit";

/// 交互模式：生成请求进行时仍可选择场景、播放句子
async fn run_interactive(app: &mut AppController) -> anyhow::Result<()> {
    println!("{}", HELP);
    print!("{}", app.list());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pending: Option<PendingScene> = None;

    loop {
        print!("{}", prompt(app));
        std::io::stdout().flush().ok();

        tokio::select! {
            result = async {
                match pending.as_mut() {
                    Some(future) => future.await,
                    None => std::future::pending().await,
                }
            }, if pending.is_some() => {
                pending = None;
                finish_generate(app, result).await;
            }
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read input")? else {
                    break;
                };
                let line = line.trim();
                let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
                let rest = rest.trim();

                match command {
                    "" => {}
                    "quit" | "exit" | "q" => break,
                    "help" | "?" => println!("{}", HELP),
                    "list" | "ls" => print!("{}", app.list()),
                    "play" | "p" => match rest.parse::<usize>().ok().and_then(|n| n.checked_sub(1)) {
                        Some(index) => report(app.handle(AppEvent::Play(index))),
                        None => eprintln!("Usage: play <line>"),
                    },
                    "gen" | "generate" => match app.begin_generate(rest) {
                        Ok(future) => {
                            println!("Generating...");
                            pending = Some(future);
                        }
                        Err(e) => report(Some(app::generation_failed(&e))),
                    },
                    "select" | "s" => show_row(app, rest),
                    other => show_row(app, other),
                }
            }
        }
    }

    if pending.is_some() {
        warn!("Exiting with a scene generation still in progress");
    }
    Ok(())
}

/// 提示符中显示当前场景和生成状态，例如 `2#5 (generating)> `
fn prompt(app: &AppController) -> String {
    let scene = app
        .selected()
        .map(|s| format!("{}#{}", s.row + 1, s.scene_id))
        .unwrap_or_default();
    let busy = if app.is_busy() { " (generating)" } else { "" };
    format!("{}{}> ", scene, busy)
}

fn show_row(app: &mut AppController, raw: &str) {
    match raw.parse::<usize>() {
        Ok(row) => {
            if select(app, row) {
                print!("{}", app.list());
                println!();
                print_detail(app);
            }
        }
        Err(_) => eprintln!("Unknown command `{}` (try `help`)", raw),
    }
}
