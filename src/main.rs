use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;

use kokoro_say::engine::{KokoroEngine, SAMPLE_RATE};
use kokoro_say::output::{self, OutputFormat};
use kokoro_say::text::{self, ChunkMode};
use kokoro_say::voice::{self, Voice};
use kokoro_say::{playback, synthesize_chunks};

#[derive(Debug, Parser)]
#[command(name = "kokoro-say")]
#[command(about = "Kokoro TTS - a small, high-quality text-to-speech model")]
#[command(after_help = "\
Examples:
  kokoro-say \"Hello, world!\"
  kokoro-say --voice sarah \"Hello from Sarah!\"
  kokoro-say --voice af_bella input.txt
  kokoro-say --debug \"Hello world\"     # Saves processed text chunks
  kokoro-say --silent \"Hello world\"    # Only saves file without playback
  kokoro-say --format opus \"Hello\"     # Save as compressed opus file")]
struct Cli {
    /// Text to speak. Can be a string or a path to a text/markdown file
    text: Option<String>,

    /// Voice to use (can be full name like 'af_sarah' or just 'sarah')
    #[arg(short, long, default_value = "af_sky")]
    voice: String,

    /// List available voices and exit
    #[arg(long)]
    voices: bool,

    /// Save debug information including processed text chunks
    #[arg(long)]
    debug: bool,

    /// Only save audio file without playing
    #[arg(long)]
    silent: bool,

    /// Output audio format
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Wav)]
    format: OutputFormat,

    /// Directory containing the Kokoro model, voicepack archive, and config
    #[arg(long, default_value = "models/kokoro")]
    model_dir: PathBuf,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if cli.voices {
        print_voices();
        return;
    }

    let Some(text_arg) = cli.text.clone() else {
        println!("Error: Text argument is required unless using --voices");
        std::process::exit(1);
    };

    let Some(voice) = voice::resolve(&cli.voice) else {
        println!("Error: Voice '{}' not found.", cli.voice);
        print_voices();
        std::process::exit(1);
    };

    println!("Using voice: {voice} - {}", voice.description());

    if let Err(err) = run(&cli, voice, &text_arg) {
        println!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn print_voices() {
    println!("\nAvailable Voices:");
    println!("----------------");
    for voice in Voice::ALL {
        println!("{:<12} - {}", voice.id(), voice.description());
    }
    println!();
}

fn run(cli: &Cli, voice: Voice, text_arg: &str) -> Result<()> {
    let output_dir = Path::new("output");
    fs::create_dir_all(output_dir).context("could not create output directory")?;

    let (raw_text, mode) =
        text::load_input(text_arg).with_context(|| format!("could not read {text_arg}"))?;

    let cleaned = text::clean_text(&raw_text);
    let chunks = text::chunk_text(&cleaned, mode);

    let mut engine = KokoroEngine::new();
    engine
        .load_model(&cli.model_dir)
        .with_context(|| format!("could not load model from {}", cli.model_dir.display()))?;

    let samples = synthesize_chunks(&mut engine, &chunks, voice);
    if samples.is_empty() {
        bail!("No audio could be generated from the input text");
    }

    let timestamp = output::unix_timestamp();

    // The transcript records every chunk, including ones later skipped for
    // being too short, joined back with the delimiter they were split on.
    if cli.debug {
        let transcript = match mode {
            ChunkMode::Lines => chunks.join("\n"),
            ChunkMode::Sentences => chunks.join("."),
        };
        let transcript_path = output::transcript_file(output_dir, voice, timestamp);
        fs::write(&transcript_path, transcript)
            .with_context(|| format!("could not write {}", transcript_path.display()))?;
    }

    let output_path = output::output_file(output_dir, voice, timestamp, cli.format);
    output::save_audio(&samples, &output_path, cli.format, SAMPLE_RATE)?;
    println!("\nSaved audio to: {}", output_path.display());

    if !cli.silent {
        playback::play_blocking(samples, SAMPLE_RATE)?;
    }

    Ok(())
}
