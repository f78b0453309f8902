use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use sidekick::fault::{diagnostic_word, pulse_train, Pulse, DIAG_MARKER};

use crate::cmd::FaultDecodeArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::OutputFormat;

#[derive(Serialize)]
struct FaultOutput {
    word: String,
    marker_present: bool,
    source: &'static str,
    code: u16,
    bit_period_ms: u32,
    pulses: Vec<PulseOutput>,
}

#[derive(Serialize)]
struct PulseOutput {
    bit: u8,
    on_ms: u32,
    off_ms: u32,
}

pub fn run(args: FaultDecodeArgs, format: OutputFormat) -> CliResult<i32> {
    // Accept a bare fault record: its top byte is always zero, so the
    // marker can be reconstructed unambiguously.
    let word = if args.word >> 24 == 0 {
        diagnostic_word(args.word)
    } else {
        args.word
    };

    let marker_present = word & 0xff00_0000 == DIAG_MARKER;
    let source = match (word >> 16) & 0xff {
        0x1 => "frame-channel",
        0x2 => "i2c-periph",
        _ => "unknown",
    };
    let code = (word & 0xffff) as u16;
    let pulses = pulse_train(word, args.bit_period);

    match format {
        OutputFormat::Json => {
            let out = FaultOutput {
                word: format!("{word:#010x}"),
                marker_present,
                source,
                code,
                bit_period_ms: args.bit_period,
                pulses: pulses
                    .iter()
                    .map(|pulse| PulseOutput {
                        bit: u8::from(pulse.is_one()),
                        on_ms: pulse.on_ms,
                        off_ms: pulse.off_ms,
                    })
                    .collect(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            print_summary(word, marker_present, source, code);

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["#", "BIT", "ON (ms)", "OFF (ms)"]);
            for (index, pulse) in pulses.iter().enumerate() {
                table.add_row(vec![
                    index.to_string(),
                    u8::from(pulse.is_one()).to_string(),
                    pulse.on_ms.to_string(),
                    pulse.off_ms.to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            print_summary(word, marker_present, source, code);
            println!("pulses: {}", pulse_shorthand(&pulses));
        }
    }

    Ok(SUCCESS)
}

fn print_summary(word: u32, marker_present: bool, source: &str, code: u16) {
    println!("word: {word:#010x}");
    println!(
        "marker: {}",
        if marker_present { "present" } else { "MISSING" }
    );
    println!("source: {source}");
    println!("code: {code} ({code:#06x})");
}

fn pulse_shorthand(pulses: &[Pulse]) -> String {
    pulses
        .iter()
        .map(|pulse| if pulse.is_one() { '1' } else { '0' })
        .collect()
}
