//! Generate a sticker with a true alpha channel.
//!
//! Usage:
//! ```sh
//! cargo run --example transparent_sticker -- "a cute banana sticker" out.png
//! ```
//!
//! Requires `GOOGLE_API_KEY` or `GEMINI_API_KEY`.

use std::env;
use std::process;

use gemini_transparency::{save_rgba, GeminiClient, GenerationOptions, Generator};

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <prompt> <output.png>", args[0]);
        process::exit(1);
    }

    let prompt = &args[1];
    let output = &args[2];

    let client = GeminiClient::from_env().expect("API key not configured");
    let generator = Generator::new(client);

    let opts = GenerationOptions::default();
    match generator.generate_transparent(prompt, &opts) {
        Ok(rgba) => {
            save_rgba(&rgba, output.as_ref()).expect("failed to save");
            println!("Saved: {output}");
        }
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
