use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;

use gemini_transparency::{
    pipeline, AspectRatio, Error, GeminiClient, GenerationOptions, Generator, ImageSize,
    DEFAULT_MODEL,
};

#[derive(Parser)]
#[command(
    name = "gemini-gen",
    about = "Generate images with Gemini, optionally with a true alpha channel",
    version,
    after_help = "Examples:\n  \
                  gemini-gen \"a banana sticker\" -o banana.png\n  \
                  gemini-gen \"pixel art sword\" -o sword.png --transparent\n  \
                  gemini-gen \"game logo\" -o logo.png --size 4K --ratio 16:9\n\n\
                  Requires GOOGLE_API_KEY or GEMINI_API_KEY (a .env file works too)."
)]
struct Cli {
    /// Image generation prompt
    prompt: String,

    /// Output filename
    #[arg(short, long, default_value = "output.png")]
    output: PathBuf,

    /// Extract transparency using difference matting
    #[arg(short, long)]
    transparent: bool,

    /// Image size (1K, 2K or 4K)
    #[arg(long, default_value = "2K")]
    size: String,

    /// Aspect ratio (1:1, 2:3, 3:2, 3:4, 4:3, 4:5, 5:4, 9:16, 16:9, 21:9)
    #[arg(long, default_value = "1:1")]
    ratio: String,

    /// Model to use
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    /// Maximum black-background conversion attempts
    #[arg(long, default_value = "5")]
    attempts: u32,

    /// Seconds to wait between conversion attempts
    #[arg(long, default_value = "1")]
    retry_delay: u64,

    /// Suppress progress output
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();

    let image_size: ImageSize = match cli.size.parse() {
        Ok(size) => size,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    let aspect_ratio: AspectRatio = match cli.ratio.parse() {
        Ok(ratio) => ratio,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    if cli.attempts == 0 {
        eprintln!("Error: --attempts must be at least 1");
        process::exit(1);
    }

    let client = match GeminiClient::from_env() {
        Ok(client) => client,
        Err(Error::MissingApiKey) => {
            eprintln!("Error: No API key found.");
            eprintln!("Set GOOGLE_API_KEY in .env or export it directly.");
            eprintln!("Get a key at: https://aistudio.google.com/apikey");
            process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    let opts = GenerationOptions {
        aspect_ratio,
        image_size,
        model: cli.model,
        max_black_attempts: cli.attempts,
        retry_delay: Duration::from_secs(cli.retry_delay),
        quiet: cli.quiet,
    };

    let generator = Generator::new(client);

    let result = if cli.transparent {
        if !cli.quiet {
            eprintln!("Generating transparent image: {}", cli.prompt);
        }
        generator
            .generate_transparent(&cli.prompt, &opts)
            .and_then(|rgba| pipeline::save_rgba(&rgba, &cli.output))
    } else {
        if !cli.quiet {
            eprintln!("Generating image: {}", cli.prompt);
        }
        generator
            .generate(&cli.prompt, &opts)
            .and_then(|img| pipeline::save_opaque(&img, &cli.output))
    };

    match result {
        Ok(()) => {
            if !cli.quiet {
                eprintln!("Saved: {}", cli.output.display());
            }
        }
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
