use clap::{Parser, Subcommand};
use ooklink_core::adapters::{ImageSpec, PixelMode};
use ooklink_core::bits::{bits_from_text, bits_to_text};
use ooklink_core::payload::{strip_sync, Payload};
use ooklink_core::tlv::{decode_bitstream, FieldValue, ImageSink, SinkConfig, TableSink};
use rand::Rng;
use std::fs;
use std::path::{Path, PathBuf};

/// Column names of the housekeeping table; fixed on both ends of the
/// link, since the header row never travels on the wire.
const HOUSEKEEPING_HEADER: [&str; 12] = [
    "Timestamp",
    "Bus_Voltage_V",
    "Bus_Current_A",
    "Battery_Temp_C",
    "OBDH_Temp_C",
    "Panel_Temp_C",
    "Mode",
    "ADCS_Mode",
    "ReactionWheel_Speed_rpm",
    "Sun_Vector_X",
    "Sun_Vector_Y",
    "Sun_Vector_Z",
];

/// Names of the scalar header fields, in wire order.
const HEADER_FIELDS: [&str; 7] = [
    "version",
    "direction",
    "transmission_mode",
    "crc_flag",
    "transfer_id",
    "spacecraft_id",
    "groundstation_id",
];

#[derive(Parser)]
#[command(name = "ooklink")]
#[command(about = "OOK telemetry link: payload assembly and recording decode")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble a payload and write the bitstream as a 0/1 text file
    Encode {
        /// Output bitstream file
        #[arg(value_name = "OUTPUT.TXT")]
        output: PathBuf,

        #[arg(long, default_value = "1")]
        version: u64,

        /// 0 = spacecraft to ground, 1 = ground to spacecraft
        #[arg(long, default_value = "0")]
        direction: u64,

        /// 1 = acknowledged, 0 = unacknowledged
        #[arg(long, default_value = "1")]
        transmission_mode: u64,

        /// Set the CRC flag (the checksum itself is never computed)
        #[arg(long)]
        crc: bool,

        #[arg(long, default_value = "0")]
        transfer_id: u64,

        #[arg(long, default_value = "0")]
        spacecraft_id: u64,

        #[arg(long, default_value = "0")]
        groundstation_id: u64,

        /// Attach a random telemetry log of this many bits
        #[arg(long)]
        telemetry_bits: Option<usize>,

        /// Attach an image file (sent grayscale unless --rgb)
        #[arg(long)]
        image: Option<PathBuf>,

        /// Attach a housekeeping CSV file
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Attach a text report file
        #[arg(long)]
        text_report: Option<PathBuf>,

        /// Attach a JSON file
        #[arg(long)]
        json: Option<PathBuf>,

        /// Send the image as RGB instead of grayscale
        #[arg(long)]
        rgb: bool,

        /// Omit the literal synchronization head and tail
        #[arg(long)]
        no_sync: bool,
    },

    /// Decode a bitstream text file and reconstruct its sections
    Decode {
        /// Input bitstream file
        #[arg(value_name = "INPUT.TXT")]
        input: PathBuf,

        /// Directory for reconstructed sections
        #[arg(long, default_value = "./reconstructed")]
        out_dir: PathBuf,

        /// The bitstream carries no synchronization head/tail
        #[arg(long)]
        no_sync: bool,

        /// Expected image width, agreed with the transmitter
        #[arg(long, default_value = "568")]
        image_width: u32,

        /// Expected image height, agreed with the transmitter
        #[arg(long, default_value = "425")]
        image_height: u32,

        /// Reconstruct the image as RGB instead of grayscale
        #[arg(long)]
        rgb: bool,
    },

    /// Demodulate a 2-channel I/Q WAV recording and decode its payload
    Receive {
        /// Input WAV recording
        #[arg(value_name = "INPUT.WAV")]
        input: PathBuf,

        /// Directory for reconstructed sections
        #[arg(long, default_value = "./reconstructed")]
        out_dir: PathBuf,

        /// Expected image width, agreed with the transmitter
        #[arg(long, default_value = "568")]
        image_width: u32,

        /// Expected image height, agreed with the transmitter
        #[arg(long, default_value = "425")]
        image_height: u32,

        /// Reconstruct the image as RGB instead of grayscale
        #[arg(long)]
        rgb: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Encode {
            output,
            version,
            direction,
            transmission_mode,
            crc,
            transfer_id,
            spacecraft_id,
            groundstation_id,
            telemetry_bits,
            image,
            csv,
            text_report,
            json,
            rgb,
            no_sync,
        } => {
            let mut payload = Payload::new(
                version,
                direction,
                transmission_mode,
                crc,
                transfer_id,
                spacecraft_id,
                groundstation_id,
            );
            if let Some(n) = telemetry_bits {
                let mut rng = rand::thread_rng();
                payload.telemetry_log = Some((0..n).map(|_| rng.gen_bool(0.5)).collect());
            }
            payload.image_path = image;
            payload.image_mode = pixel_mode(rgb);
            payload.csv_path = csv;
            payload.text_report_path = text_report;
            payload.json_path = json;

            encode_command(&payload, &output, !no_sync)?
        }
        Commands::Decode {
            input,
            out_dir,
            no_sync,
            image_width,
            image_height,
            rgb,
        } => {
            let text = fs::read_to_string(&input)?;
            let bits = bits_from_text(&text)?;
            println!("Read {} bits from {}", bits.len(), input.display());

            let spec = ImageSpec {
                width: image_width,
                height: image_height,
                mode: pixel_mode(rgb),
            };
            decode_command(&bits, !no_sync, &out_dir, spec)?
        }
        Commands::Receive {
            input,
            out_dir,
            image_width,
            image_height,
            rgb,
        } => {
            let (i, q) = read_iq_recording(&input)?;
            println!("Read {} I/Q sample pairs from {}", i.len(), input.display());

            let bits = ooklink_core::demodulate(&i, &q)?;
            println!("Demodulated {} bits", bits.len());

            let spec = ImageSpec {
                width: image_width,
                height: image_height,
                mode: pixel_mode(rgb),
            };
            decode_command(&bits, true, &out_dir, spec)?
        }
    }

    Ok(())
}

fn pixel_mode(rgb: bool) -> PixelMode {
    if rgb {
        PixelMode::Rgb
    } else {
        PixelMode::Grayscale
    }
}

fn encode_command(
    payload: &Payload,
    output: &Path,
    with_sync: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let bits = payload.to_bits(with_sync)?;
    fs::write(output, bits_to_text(&bits))?;
    println!("Wrote {} bits to {}", bits.len(), output.display());
    Ok(())
}

fn decode_command(
    bits: &[bool],
    with_sync: bool,
    out_dir: &Path,
    image_spec: ImageSpec,
) -> Result<(), Box<dyn std::error::Error>> {
    let body = if with_sync { strip_sync(bits)? } else { bits };

    fs::create_dir_all(out_dir)?;
    let sinks = SinkConfig {
        telemetry: Some(out_dir.join("reconstructed_telemetry_log.bin")),
        image: Some(ImageSink {
            path: out_dir.join("reconstructed_image.png"),
            spec: image_spec,
        }),
        table: Some(TableSink {
            path: out_dir.join("reconstructed_housekeeping.csv"),
            header: HOUSEKEEPING_HEADER.iter().map(|s| s.to_string()).collect(),
        }),
        report: Some(out_dir.join("reconstructed_report.txt")),
        json: Some(out_dir.join("reconstructed_housekeeping.json")),
    };

    let values = decode_bitstream(body, &sinks)?;

    for (name, value) in HEADER_FIELDS.iter().zip(values.iter()) {
        match value {
            FieldValue::Integer(v) => println!("{name}: {v}"),
            FieldValue::Float(v) => println!("{name}: {v}"),
            FieldValue::Text(v) => println!("{name}: {v}"),
            FieldValue::Boolean(v) => println!("{name}: {v}"),
        }
    }
    Ok(())
}

/// Read a 2-channel WAV recording into separate I and Q sample buffers.
fn read_iq_recording(path: &Path) -> Result<(Vec<f64>, Vec<f64>), Box<dyn std::error::Error>> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    if spec.channels != 2 {
        return Err(format!(
            "expected a 2-channel I/Q recording, got {} channel(s)",
            spec.channels
        )
        .into());
    }

    let interleaved: Vec<f64> = match spec.sample_format {
        hound::SampleFormat::Int => reader
            .samples::<i16>()
            .map(|s| s.map(f64::from))
            .collect::<Result<_, _>>()?,
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| s.map(f64::from))
            .collect::<Result<_, _>>()?,
    };

    let mut i = Vec::with_capacity(interleaved.len() / 2);
    let mut q = Vec::with_capacity(interleaved.len() / 2);
    for pair in interleaved.chunks_exact(2) {
        i.push(pair[0]);
        q.push(pair[1]);
    }
    Ok((i, q))
}
