//! CLI interface for hands-in

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::api::ApiClient;
use crate::capture::{CaptureStatus, SyntheticCamera};
use crate::config::{self, Config, PerceptionBackend};
use crate::curriculum::{HttpPolicyClient, MasteryTracker, NextRequest, PolicyService};
use crate::inference::{HttpRecognitionClient, RecognitionService, VerifySignRequest};
use crate::perception::{LandmarkModel, ModelLoader, ModelStatus, ReplayLoader};
use crate::practice::{PracticeComponents, PracticeOptions, PracticeSession};
use crate::types::{LandmarkSnapshot, Letter};

#[derive(Parser)]
#[command(name = "hands-in")]
#[command(about = "Fingerspelling practice with live sign recognition and an adaptive curriculum", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive practice session (default when no command given)
    Practice,
    /// Ask the policy service which letter should follow
    Next {
        /// Letter the learner is currently on
        #[arg(short, long, default_value = "A")]
        letter: Letter,
    },
    /// Send a landmark snapshot to the recognition service
    Verify {
        /// JSON file holding 21 [x, y, z] triples
        #[arg(short, long)]
        landmarks: PathBuf,
        /// Letter the learner is expected to be showing
        #[arg(short, long)]
        expected: Option<Letter>,
    },
    /// Configure hands-in
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
        /// Reset configuration to defaults
        #[arg(long)]
        reset: bool,
        /// Set a value (usage: --set section.key value)
        #[arg(long, value_names = &["key", "value"], num_args = 2)]
        set: Option<Vec<String>>,
    },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None | Some(Commands::Practice) => {
            run_practice(Config::load()?).await?;
        }
        Some(Commands::Next { letter }) => {
            query_next(&Config::load()?, letter).await?;
        }
        Some(Commands::Verify { landmarks, expected }) => {
            verify_landmarks(&Config::load()?, &landmarks, expected).await?;
        }
        Some(Commands::Config { show, reset, set }) => {
            if reset {
                config::reset_config()?;
            } else if let Some(pair) = set {
                if let [key, value] = pair.as_slice() {
                    config::set_value(key, value)?;
                }
            } else if show {
                config::show_config()?;
            } else {
                println!("Config path: {}", config::config_path()?.display());
                println!("Use --show to display configuration");
            }
        }
    }

    Ok(())
}

fn model_loader(backend: PerceptionBackend) -> Result<Arc<dyn ModelLoader>> {
    match backend {
        PerceptionBackend::Replay => Ok(Arc::new(ReplayLoader)),
        #[cfg(feature = "onnx")]
        PerceptionBackend::Onnx => Ok(Arc::new(crate::perception::OnnxLoader)),
        #[cfg(not(feature = "onnx"))]
        PerceptionBackend::Onnx => anyhow::bail!("The onnx backend needs a build with `--features onnx`"),
    }
}

fn policy_client(config: &Config) -> Result<HttpPolicyClient> {
    let api = ApiClient::new(&config.server.policy_url, config.server.request_timeout())?;
    Ok(HttpPolicyClient::new(api))
}

fn recognition_client(config: &Config) -> Result<HttpRecognitionClient> {
    let api = ApiClient::new(&config.server.recognition_url, config.server.request_timeout())?;
    Ok(HttpRecognitionClient::new(api))
}

fn print_help() {
    println!("Commands:");
    println!("  s  start camera      x  stop camera");
    println!("  c  check answer      n  skip to next letter");
    println!("  r  reset progress    ?  show stats");
    println!("  q  quit");
}

fn print_target(session: &PracticeSession) {
    println!("Show the sign for letter \"{}\"", session.target());
}

fn print_stats(session: &PracticeSession) {
    let stats = session.stats();
    println!(
        "Score {}/{} ({}%), mastered {}/{}, current letter {}",
        stats.score,
        stats.attempts,
        stats.accuracy,
        stats.mastered,
        Letter::COUNT,
        stats.target
    );
    match session.model_status() {
        ModelStatus::Ready => {}
        status => println!("Model: {}", status),
    }
}

async fn run_practice(config: Config) -> Result<()> {
    let loader = model_loader(config.perception.backend)?;
    let model = Arc::new(LandmarkModel::new());

    // Camera use does not wait for the model
    let load_task = tokio::spawn({
        let model = model.clone();
        let path = config.perception.model_path.clone();
        async move {
            let _ = model.initialize(loader.as_ref(), &path).await;
        }
    });

    let components = PracticeComponents {
        camera: Arc::new(SyntheticCamera::new(config.capture.frame_rate)),
        model,
        recognition: Arc::new(recognition_client(&config)?),
        policy: Arc::new(policy_client(&config)?),
    };
    let (mut session, mut results) = PracticeSession::new(components, PracticeOptions::from(&config));
    info!("Practice session {}", session.id());

    session.start().await;
    print_help();
    print_target(&session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            Some(detection) = results.recv() => {
                if session.on_recognition(detection) {
                    let marker = if session.is_showing_target() { "  ✓" } else { "" };
                    let result = detection.result;
                    println!("Detected: {} ({:.1}%){}", result.label, result.confidence, marker);
                }
            }
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read from stdin")? else {
                    break;
                };
                match line.trim() {
                    "s" => match session.start_camera().await {
                        CaptureStatus::Ready => println!("Camera on"),
                        CaptureStatus::Failed(e) => println!("{}", e.user_message()),
                        status => println!("Camera {}", status),
                    },
                    "x" => {
                        session.stop_camera().await;
                        println!("Camera off");
                    }
                    "c" => {
                        let report = session.check_answer().await;
                        if report.outcome.is_correct {
                            println!("Correct! {} is now {}", report.letter, report.mastery);
                        } else {
                            println!("Not quite, keep practicing {}", report.letter);
                        }
                        print_target(&session);
                    }
                    "n" => {
                        if session.skip() {
                            print_target(&session);
                        } else {
                            println!("Already at the last letter");
                        }
                    }
                    "r" => {
                        session.reset().await;
                        println!("Progress reset");
                        print_target(&session);
                    }
                    "?" => print_stats(&session),
                    "q" => break,
                    "" => {}
                    _ => print_help(),
                }
            }
        }
    }

    print_stats(&session);
    session.shutdown().await;
    load_task.abort();
    Ok(())
}

async fn query_next(config: &Config, letter: Letter) -> Result<()> {
    let tracker = MasteryTracker::new();
    let request = NextRequest {
        current_letter: letter,
        mastery_level: tracker.mastery().get(letter),
        mastery_map: tracker.mastery().clone(),
        recent_history: Vec::new(),
    };

    let response = policy_client(config)?
        .next(&request)
        .await
        .context("Policy service request failed")?;

    println!("state_key: {}", response.state_key);
    println!("action:    {}", response.action);
    match response.target_letter() {
        Some(target) => println!("target:    {}", target),
        None => println!("target:    (none, stay on {})", letter),
    }
    Ok(())
}

async fn verify_landmarks(config: &Config, path: &Path, expected: Option<Letter>) -> Result<()> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let landmarks: LandmarkSnapshot = serde_json::from_str(&contents)
        .context("Landmark file must hold 21 [x, y, z] triples")?;

    let response = recognition_client(config)?
        .verify_sign(&VerifySignRequest { landmarks, expected })
        .await
        .context("Recognition service request failed")?;

    println!("Top label:  {} ({:.1}%)", response.top_label, response.top_confidence);
    if let Some(is_match) = response.is_match {
        println!("Match:      {}", if is_match { "yes" } else { "no" });
    }

    let mut ranked: Vec<_> = response.probs.iter().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(a.1));
    for (label, p) in ranked.into_iter().take(5) {
        println!("  {:<3} {:>6.2}", label, p);
    }
    Ok(())
}
