use std::env;

use telemetry_serial::frame::{codec::HexTextCodec, Outcome, TelemetryDecoder};
use telemetry_serial::TelemetryState;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let chunks: Vec<String> = env::args().skip(1).collect();

    if chunks.is_empty() {
        return Err("Provide at least 1 hex chunk argument, e.g. 00FF2A".into());
    }

    let mut decoder = TelemetryDecoder::<HexTextCodec>::new();
    let mut state = TelemetryState::new();
    for chunk in &chunks {
        match decoder.process_chunk(chunk.as_bytes(), &mut state) {
            Outcome::Malformed(e) => eprintln!("chunk {:?} dropped: {}", chunk, e),
            outcome => println!("chunk {:?}: {:?}", chunk, outcome),
        }
    }

    println!("\n{}", state);
    println!("\n{:?}", decoder.stats());
    Ok(())
}
