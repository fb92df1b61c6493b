use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use lyric_sync::{
    build_client, parse_timed_lyrics, read_lyrics_file, render_srt, split_lyrics,
    validate_structure, validate_timing, write_srt, AlignConfig, Aligner, AlignmentDocument,
    AlignmentSource, CacheConfig, CachedClient, DurationProbe, JsonTranscriber, LlmClient,
    LlmConfig, Provider, SymphoniaProbe, Transcriber, TranscriptFilter, DEFAULT_KEEP_PATTERN,
};

#[derive(Parser)]
#[command(name = "lyric-sync")]
#[command(author, version, about = "Align song lyrics to audio timestamps with an LLM", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Align a lyrics file against an audio clip
    Align {
        /// Lyrics file, one lyric line per text line
        #[arg(short, long)]
        lyrics: PathBuf,

        /// Audio clip of the song
        #[arg(short, long)]
        audio: PathBuf,

        /// Speech transcript JSON; aligns against the transcript instead of the audio
        #[arg(short, long)]
        transcript: Option<PathBuf>,

        /// LLM vendor
        #[arg(long, value_enum, default_value = "gemini")]
        provider: Provider,

        /// Model name (defaults to the provider's audio-capable model)
        #[arg(long)]
        model: Option<String>,

        /// Maximum LLM round-trips
        #[arg(long, default_value = "3")]
        max_attempts: u32,

        /// Audio duration in seconds (skips probing the file)
        #[arg(long)]
        duration: Option<f64>,

        /// Output file for the machine-readable result (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output file for the timed lyric blocks
        #[arg(long)]
        srt: Option<PathBuf>,

        /// Response cache capacity (0 disables caching)
        #[arg(long, default_value = "32")]
        cache_size: usize,

        /// Regex of transcript text to keep
        #[arg(long, default_value = DEFAULT_KEEP_PATTERN)]
        keep_pattern: String,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate an existing timed-lyrics answer without calling an LLM
    Check {
        /// Lyrics file, one lyric line per text line
        #[arg(short, long)]
        lyrics: PathBuf,

        /// Timed lyric blocks to check
        #[arg(short, long)]
        timed: PathBuf,

        /// Audio clip to read the duration from
        #[arg(short, long, conflicts_with = "duration")]
        audio: Option<PathBuf>,

        /// Audio duration in seconds
        #[arg(long)]
        duration: Option<f64>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Align {
            lyrics,
            audio,
            transcript,
            provider,
            model,
            max_attempts,
            duration,
            output,
            srt,
            cache_size,
            keep_pattern,
            verbose,
        } => {
            setup_logging(verbose);
            align(AlignArgs {
                lyrics,
                audio,
                transcript,
                provider,
                model,
                max_attempts,
                duration,
                output,
                srt,
                cache_size,
                keep_pattern,
            })
            .await
        }
        Commands::Check {
            lyrics,
            timed,
            audio,
            duration,
            verbose,
        } => {
            setup_logging(verbose);
            check(&lyrics, &timed, audio.as_deref(), duration)
        }
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

struct AlignArgs {
    lyrics: PathBuf,
    audio: PathBuf,
    transcript: Option<PathBuf>,
    provider: Provider,
    model: Option<String>,
    max_attempts: u32,
    duration: Option<f64>,
    output: Option<PathBuf>,
    srt: Option<PathBuf>,
    cache_size: usize,
    keep_pattern: String,
}

async fn align(args: AlignArgs) -> Result<()> {
    info!("Loading lyrics from {:?}", args.lyrics);
    let lyrics = read_lyrics_file(&args.lyrics)?;
    let audio_duration = resolve_duration(Some(&args.audio), args.duration)?;

    let source = match &args.transcript {
        Some(path) => {
            let filter = TranscriptFilter::new(&args.keep_pattern)?;
            let segments = JsonTranscriber::new(path)
                .with_filter(filter)
                .transcribe(&args.audio)?;
            info!("Aligning against {} transcript segments", segments.len());
            AlignmentSource::Transcript(segments)
        }
        None => AlignmentSource::Audio(args.audio.to_string_lossy().into_owned()),
    };

    let llm_config = LlmConfig::from_env(args.provider, args.model)?;
    let client = build_client(&llm_config)?;
    let client: Box<dyn LlmClient> = if args.cache_size > 0 {
        Box::new(CachedClient::new(
            client,
            &CacheConfig {
                capacity: args.cache_size,
            },
        ))
    } else {
        client
    };

    let aligner = Aligner::new(
        client,
        AlignConfig {
            max_attempts: args.max_attempts,
        },
    )?;
    let outcome = aligner
        .run(&lyrics, &source, audio_duration)
        .await
        .context("Alignment failed")?;

    if let Some(path) = &args.output {
        AlignmentDocument::from_outcome(&outcome, llm_config.provider.as_str(), &llm_config.model)
            .write_json(path)?;
        info!("Output written to {:?}", path);
    }
    if let Some(path) = &args.srt {
        write_srt(&outcome.lyrics, path)?;
        info!("Timed lyrics written to {:?}", path);
    }

    print!("{}", render_srt(&outcome.lyrics));

    if outcome.converged {
        info!(
            "Complete: {} lines aligned in {} attempt(s)",
            outcome.lyrics.len(),
            outcome.attempts.len()
        );
    } else {
        warn!(
            "Alignment did not pass validation after {} attempts; output is the last attempt",
            outcome.attempts.len()
        );
    }

    Ok(())
}

fn check(lyrics: &Path, timed: &Path, audio: Option<&Path>, duration: Option<f64>) -> Result<()> {
    let lines = split_lyrics(&read_lyrics_file(lyrics)?);
    let answer = std::fs::read_to_string(timed)
        .with_context(|| format!("Failed to read timed lyrics: {:?}", timed))?;
    let parsed = parse_timed_lyrics(&answer);
    let audio_duration = resolve_duration(audio, duration)?;

    let structural = validate_structure(&lines, &parsed);
    let temporal = validate_timing(audio_duration, &parsed);

    println!("Alignment Check");
    println!("===============");
    println!("Lyric lines: {}", lines.len());
    println!("Parsed blocks: {}", parsed.len());
    println!("Audio duration: {:.3}s", audio_duration);
    println!();

    for (label, validation) in [("Structure", &structural), ("Timing", &temporal)] {
        if validation.is_valid {
            println!("{}: ok", label);
        } else {
            println!("{}: {} problem(s)", label, validation.errors.len());
            for error in &validation.errors {
                println!("  - {}", error);
            }
        }
    }

    if !(structural.is_valid && temporal.is_valid) {
        bail!("{:?} failed validation", timed);
    }
    Ok(())
}

fn resolve_duration(audio: Option<&Path>, duration: Option<f64>) -> Result<f64> {
    if let Some(seconds) = duration {
        return Ok(seconds);
    }
    let Some(audio) = audio else {
        bail!("Either --audio or --duration is required");
    };
    let seconds = SymphoniaProbe
        .duration(audio)
        .with_context(|| format!("Failed to read audio duration: {:?}", audio))?;
    info!("Audio duration: {:.3}s", seconds);
    Ok(seconds)
}
