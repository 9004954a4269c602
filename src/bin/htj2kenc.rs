//! htj2kenc CLI - encode raw pixel files to HTJ2K codestreams.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use htj2kenc_rs::translator::derive_config;
use htj2kenc_rs::{EncodeParameters, ProgressionOrder};

/// HTJ2K encoder for raw, pixel-interleaved sample buffers
#[derive(Parser)]
#[command(name = "htj2kenc")]
#[command(author = "htj2kenc-rs contributors")]
#[command(version)]
#[command(about = "Encode raw pixels to High-Throughput JPEG 2000 codestreams", long_about = None)]
#[command(after_help = "EXAMPLES:
    htj2kenc encode -i ct.raw -o ct.j2c -w 512 -H 512 -b 16 --signed
    htj2kenc encode -i photo.raw -o photo.j2c -w 640 -H 480 -n 3 --ratio 10
    htj2kenc params -w 512 -H 512 -n 3 -p rpcl

Set RUST_LOG=debug to trace the encode stages.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a raw pixel file
    ///
    /// Samples are pixel-interleaved; samples above 8 bits are
    /// little-endian byte pairs.
    #[command(visible_alias = "e")]
    Encode {
        /// Input raw pixel file
        #[arg(short, long, help = "Path to raw pixel data file")]
        input: PathBuf,

        /// Output codestream file
        #[arg(short, long, help = "Path for the encoded .j2c file")]
        output: PathBuf,

        #[command(flatten)]
        image: ImageArgs,
    },

    /// Print the codec configuration derived from the parameters
    #[command(visible_alias = "p")]
    Params {
        #[command(flatten)]
        image: ImageArgs,
    },
}

#[derive(Args)]
struct ImageArgs {
    /// Image width in pixels
    #[arg(short, long)]
    width: u32,

    /// Image height in pixels
    #[arg(short = 'H', long)]
    height: u32,

    /// Number of components (1=grayscale, 3=RGB)
    #[arg(short = 'n', long, default_value = "1")]
    components: u32,

    /// Bits per sample (1-16)
    #[arg(short, long, default_value = "8")]
    bits: u32,

    /// Samples are two's complement
    #[arg(long)]
    signed: bool,

    /// Target compression ratio; any positive value selects the lossy 9/7 path
    #[arg(short, long)]
    ratio: Option<f32>,

    /// Packet progression order
    #[arg(short, long, default_value = "lrcp", value_enum)]
    progression: Progression,

    /// Wavelet decomposition levels
    #[arg(short, long, default_value = "5")]
    decompositions: u32,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Progression {
    Lrcp,
    Rlcp,
    Rpcl,
    Pcrl,
    Cprl,
}

impl From<Progression> for ProgressionOrder {
    fn from(p: Progression) -> Self {
        match p {
            Progression::Lrcp => ProgressionOrder::Lrcp,
            Progression::Rlcp => ProgressionOrder::Rlcp,
            Progression::Rpcl => ProgressionOrder::Rpcl,
            Progression::Pcrl => ProgressionOrder::Pcrl,
            Progression::Cprl => ProgressionOrder::Cprl,
        }
    }
}

impl ImageArgs {
    fn to_params(&self) -> EncodeParameters {
        let ratio = self.ratio.unwrap_or(0.0);
        EncodeParameters::new(self.width, self.height, self.components, self.bits)
            .with_signed(self.signed)
            .with_reversible(ratio <= 0.0)
            .with_compression_ratio(ratio)
            .with_progression_order(self.progression.into())
            .with_decompositions(self.decompositions)
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Encode {
            input,
            output,
            image,
        } => encode_file(&input, &output, &image.to_params()),
        Commands::Params { image } => show_params(&image.to_params()),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn encode_file(
    input: &PathBuf,
    output: &PathBuf,
    params: &EncodeParameters,
) -> Result<(), Box<dyn std::error::Error>> {
    let pixels = fs::read(input)?;
    let encoded = htj2kenc_rs::encode(&pixels, params)?;
    fs::write(output, &encoded)?;

    let raw_size = params.expected_raw_size()?;
    println!(
        "✓ Encoded {}x{} image ({} components, {} bits) to {:?}: {} bytes ({:.2}:1)",
        params.width,
        params.height,
        params.components,
        params.bits_per_sample,
        output,
        encoded.len(),
        raw_size as f64 / encoded.len() as f64
    );
    Ok(())
}

fn show_params(params: &EncodeParameters) -> Result<(), Box<dyn std::error::Error>> {
    let config = derive_config(params)?;

    println!("Image:            {}x{}", config.width, config.height);
    println!("Components:       {}", config.components);
    println!(
        "Sample format:    {} bits, {}",
        config.bits_per_sample,
        if config.is_signed { "signed" } else { "unsigned" }
    );
    println!(
        "Wavelet:          {} ({} levels)",
        if config.reversible { "5/3 reversible" } else { "9/7 irreversible" },
        config.decompositions
    );
    println!("Progression:      {}", config.progression_order);
    println!("Colour transform: {}", config.color_transform);
    println!(
        "Code-blocks:      {}x{}",
        config.block_dims.w, config.block_dims.h
    );
    match &config.precincts {
        Some(sizes) => println!(
            "Precincts:        {}x{} at {} resolutions",
            sizes[0].w,
            sizes[0].h,
            sizes.len()
        ),
        None => println!("Precincts:        codec default"),
    }
    match config.target_bpp {
        Some(bpp) => println!("Target rate:      {:.3} bits/pixel", bpp),
        None => println!("Target rate:      unconstrained"),
    }
    Ok(())
}
