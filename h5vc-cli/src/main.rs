//! h5vc CLI entrypoint.
//!
//! ```bash
//! h5vc compress --input stack.raw --output stack.h5vc --width 512 --height 512 --depth 64
//! h5vc compress --input stack.raw --output stack.h5vc --width 512 --height 512 --depth 64 \
//!     --encoder libsvtav1 --preset 6 --crf 30 --bit-depth 10 --json
//! h5vc decompress --input stack.h5vc --output stack.raw
//! h5vc inspect --input stack.h5vc --json
//! h5vc codecs --json
//! ```

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use serde_json::{Value, json};

use h5vc_core::codec_table::{Decoder, Encoder, resolve_decoder, resolve_encoder};
use h5vc_core::config::FilterConfig;
use h5vc_core::error::{FilterError, Result};
use h5vc_core::header::{self, MetadataHeader};
use h5vc_core::params::{BitMode, CompressionParameters};
use h5vc_ffmpeg::FfmpegBackend;

const JSON_SCHEMA_VERSION: u32 = 1;

#[derive(Parser, Debug)]
#[command(
    name = "h5vc",
    version,
    about = "Video-codec compression for 3-D grayscale volumes",
    arg_required_else_help = true,
    after_help = "Examples:\n  h5vc codecs --json\n  h5vc compress --input in.raw --output out.h5vc --width 64 --height 64 --depth 64\n  h5vc decompress --input out.h5vc --output back.raw\n  h5vc inspect --input out.h5vc --json"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encode a raw plane stack into a framed blob.
    Compress(CompressArgs),
    /// Decode a framed blob back into raw planes.
    Decompress(DecompressArgs),
    /// Print the metadata header of a framed blob.
    Inspect(InspectArgs),
    /// List known encoders and decoders and whether FFmpeg provides them.
    Codecs(CodecsArgs),
}

#[derive(Args, Debug, Clone)]
struct CompressArgs {
    /// Raw input: depth × height × width samples, little-endian for >8 bits.
    #[arg(short = 'i', long = "input")]
    input: PathBuf,

    /// Framed blob to write.
    #[arg(short = 'o', long = "output")]
    output: PathBuf,

    #[arg(long = "width")]
    width: u32,

    #[arg(long = "height")]
    height: u32,

    /// Number of planes.
    #[arg(long = "depth")]
    depth: u32,

    /// FFmpeg encoder name.
    #[arg(long = "encoder", default_value = "libx264")]
    encoder: String,

    /// FFmpeg decoder name stored for decompression (default: the encoder's software decoder).
    #[arg(long = "decoder")]
    decoder: Option<String>,

    /// Preset name from the encoder's table (see `h5vc codecs`).
    #[arg(long = "preset")]
    preset: Option<String>,

    /// Tune name from the encoder's table.
    #[arg(long = "tune")]
    tune: Option<String>,

    /// Quality (crf/qp); out-of-range values leave the codec default.
    #[arg(long = "crf", default_value_t = 23)]
    crf: u32,

    /// Sample bit depth.
    #[arg(long = "bit-depth", default_value_t = 8, value_parser = parse_bit_depth)]
    bit_depth: u32,

    /// Film grain level (SVT-AV1 and rav1e).
    #[arg(long = "film-grain", default_value_t = 0)]
    film_grain: u32,

    /// GPU ordinal for hardware encoders.
    #[arg(long = "gpu", default_value_t = 0)]
    gpu: u32,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Args, Debug, Clone)]
struct DecompressArgs {
    /// Framed blob to read.
    #[arg(short = 'i', long = "input")]
    input: PathBuf,

    /// Raw output file.
    #[arg(short = 'o', long = "output")]
    output: PathBuf,

    /// Override the decoder recorded in the header.
    #[arg(long = "decoder")]
    decoder: Option<String>,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Args, Debug, Clone)]
struct RunArgs {
    /// JSON filter config; `H5VC_*` environment variables override it.
    #[arg(long = "config")]
    config: Option<PathBuf>,

    /// Give up after this many milliseconds.
    #[arg(long = "timeout-ms")]
    timeout_ms: Option<u64>,

    /// Emit JSON summary output.
    #[arg(long = "json", default_value_t = false)]
    json: bool,
}

#[derive(Args, Debug, Clone)]
struct InspectArgs {
    #[arg(short = 'i', long = "input")]
    input: PathBuf,

    #[arg(long = "json", default_value_t = false)]
    json: bool,
}

#[derive(Args, Debug, Clone)]
struct CodecsArgs {
    #[arg(long = "json", default_value_t = false)]
    json: bool,
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let json_error_command = match &cli.command {
        Commands::Compress(args) if args.run.json => Some("compress"),
        Commands::Decompress(args) if args.run.json => Some("decompress"),
        Commands::Inspect(args) if args.json => Some("inspect"),
        Commands::Codecs(args) if args.json => Some("codecs"),
        _ => None,
    };

    let result = match cli.command {
        Commands::Compress(args) => run_compress(args),
        Commands::Decompress(args) => run_decompress(args),
        Commands::Inspect(args) => run_inspect(args),
        Commands::Codecs(args) => run_codecs(args),
    };

    match result {
        Ok(()) => std::process::exit(0),
        Err(err) => {
            if let Some(command) = json_error_command {
                println!("{}", command_error_json(command, &err));
            } else {
                tracing::error!(error = %err, code = err.error_code(), "Command failed");
            }
            std::process::exit(err.error_code() as i32);
        }
    }
}

fn init_tracing() {
    let ansi_enabled = std::env::var_os("NO_COLOR").is_none() && std::io::stderr().is_terminal();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_ansi(ansi_enabled)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<FilterConfig> {
    let base = match path {
        Some(path) => {
            let data = std::fs::read_to_string(path)?;
            serde_json::from_str::<FilterConfig>(&data).map_err(|err| {
                FilterError::InvalidParameters(format!(
                    "invalid config {}: {err}",
                    path.display()
                ))
            })?
        }
        None => FilterConfig::default(),
    };
    base.overlay_env()
}

fn build_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}

/// Run `job` inline, or on the blocking pool with a deadline when requested.
fn run_job<T, F>(timeout_ms: Option<u64>, job: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    match timeout_ms {
        Some(ms) => {
            let rt = build_runtime()?;
            rt.block_on(h5vc_ffmpeg::run_blocking_with_timeout(
                Duration::from_millis(ms),
                job,
            ))
        }
        None => job(),
    }
}

fn parse_bit_depth(raw: &str) -> std::result::Result<u32, String> {
    let bits = raw
        .parse::<u32>()
        .map_err(|e| format!("invalid bit depth '{raw}': {e}"))?;
    BitMode::from_bits(bits)
        .map(BitMode::bits)
        .map_err(|_| format!("unsupported bit depth {bits} (expected 8, 10 or 12)"))
}

fn compression_params(args: &CompressArgs) -> Result<CompressionParameters> {
    let encoder = Encoder::from_name(&args.encoder)?;
    let family = encoder.family();
    let decoder = match &args.decoder {
        Some(name) => Decoder::from_name(name)?,
        None => encoder.default_decoder(),
    };
    let preset_id = args
        .preset
        .as_deref()
        .map(|name| family.preset_id(name))
        .transpose()?
        .unwrap_or(0);
    let tune_id = args
        .tune
        .as_deref()
        .map(|name| family.tune_id(name))
        .transpose()?
        .unwrap_or(0);

    let params = CompressionParameters {
        encoder_id: encoder.id(),
        decoder_id: decoder.id(),
        width: args.width,
        height: args.height,
        depth: args.depth,
        bit_mode: BitMode::from_bits(args.bit_depth)?.word(),
        preset_id,
        tune_id,
        crf: args.crf,
        film_grain: args.film_grain,
        gpu_id: args.gpu,
    };
    params.validate()?;
    Ok(params)
}

fn run_compress(args: CompressArgs) -> Result<()> {
    let params = compression_params(&args)?;
    let config = load_config(args.run.config.as_deref())?;
    let raw = std::fs::read(&args.input)?;
    let input_bytes = raw.len();

    let start = Instant::now();
    let blob = run_job(args.run.timeout_ms, move || {
        h5vc_ffmpeg::compress_framed(&params, &raw, &config)
    })?;
    let elapsed = start.elapsed();
    std::fs::write(&args.output, &blob)?;

    let payload_bytes = blob.len().saturating_sub(header::FRAMED_HEADER_SIZE);
    let ratio = if payload_bytes == 0 {
        0.0
    } else {
        input_bytes as f64 / payload_bytes as f64
    };
    tracing::info!(
        output = %args.output.display(),
        input_bytes,
        payload_bytes,
        ratio,
        "Compressed"
    );

    if args.run.json {
        println!(
            "{}",
            json!({
                "schema_version": JSON_SCHEMA_VERSION,
                "command": "compress",
                "ok": true,
                "encoder": resolve_encoder(params.encoder_id).codec_name(),
                "decoder": resolve_decoder(params.decoder_id).codec_name(),
                "input_bytes": input_bytes,
                "payload_bytes": payload_bytes,
                "blob_bytes": blob.len(),
                "ratio": ratio,
                "elapsed_ms": elapsed.as_millis() as u64,
            })
        );
    } else {
        println!("compress: ok");
        println!("output={}", args.output.display());
        println!("input_bytes={input_bytes}");
        println!("payload_bytes={payload_bytes}");
        println!("ratio={ratio:.2}");
    }
    Ok(())
}

fn run_decompress(args: DecompressArgs) -> Result<()> {
    let config = load_config(args.run.config.as_deref())?;
    let decoder = args.decoder.as_deref().map(Decoder::from_name).transpose()?;
    let blob = std::fs::read(&args.input)?;

    let start = Instant::now();
    let (meta, raw) = run_job(args.run.timeout_ms, move || match decoder {
        Some(decoder) => h5vc_ffmpeg::decompress_framed_with_decoder(&blob, decoder, &config),
        None => h5vc_ffmpeg::decompress_framed(&blob, &config),
    })?;
    let elapsed = start.elapsed();
    std::fs::write(&args.output, &raw)?;

    let params = meta.params;
    let decoder = decoder.unwrap_or_else(|| resolve_decoder(params.decoder_id));
    if args.run.json {
        println!(
            "{}",
            json!({
                "schema_version": JSON_SCHEMA_VERSION,
                "command": "decompress",
                "ok": true,
                "decoder": decoder.codec_name(),
                "payload_bytes": meta.compressed_size,
                "output_bytes": raw.len(),
                "shape": [params.depth, params.height, params.width],
                "elapsed_ms": elapsed.as_millis() as u64,
            })
        );
    } else {
        println!("decompress: ok");
        println!("output={}", args.output.display());
        println!("shape={}x{}x{}", params.depth, params.height, params.width);
        println!("output_bytes={}", raw.len());
    }
    Ok(())
}

fn run_inspect(args: InspectArgs) -> Result<()> {
    let blob = std::fs::read(&args.input)?;
    let (meta, _payload) = header::unpack(&blob)?;

    if args.json {
        println!("{}", inspect_json(&meta)?);
    } else {
        let p = &meta.params;
        println!("inspect: ok");
        println!("version={}", meta.version);
        println!("encoder={}", resolve_encoder(p.encoder_id).codec_name());
        println!("decoder={}", resolve_decoder(p.decoder_id).codec_name());
        println!("shape={}x{}x{}", p.depth, p.height, p.width);
        println!("bit_mode={}", p.bit_mode);
        println!("preset_id={} tune_id={} crf={}", p.preset_id, p.tune_id, p.crf);
        println!("compressed_size={}", meta.compressed_size);
    }
    Ok(())
}

fn inspect_json(meta: &MetadataHeader) -> Result<Value> {
    let params = meta.params;
    let bits = params.bit_mode().map(BitMode::bits).ok();
    let raw_size = params.raw_size().ok();
    Ok(json!({
        "schema_version": JSON_SCHEMA_VERSION,
        "command": "inspect",
        "ok": true,
        "version": meta.version,
        "compressed_size": meta.compressed_size,
        "payload_offset": meta.payload_offset,
        "encoder": resolve_encoder(params.encoder_id).codec_name(),
        "decoder": resolve_decoder(params.decoder_id).codec_name(),
        "bits": bits,
        "raw_size": raw_size,
        "params": serde_json::to_value(params).map_err(|e| FilterError::Io(e.into()))?,
    }))
}

fn run_codecs(args: CodecsArgs) -> Result<()> {
    let backend = FfmpegBackend::new(FilterConfig::default());

    if args.json {
        let encoders: Vec<Value> = Encoder::ALL
            .into_iter()
            .map(|e| {
                let family = e.family();
                json!({
                    "id": e.id(),
                    "name": e.codec_name(),
                    "family": family,
                    "available": backend.encoder_available(e),
                    "default_decoder": e.default_decoder().codec_name(),
                    "presets": family.presets().iter().map(|k| k.name).collect::<Vec<_>>(),
                    "tunes": family.tunes().iter().map(|k| k.name).collect::<Vec<_>>(),
                })
            })
            .collect();
        let decoders: Vec<Value> = Decoder::ALL
            .into_iter()
            .map(|d| {
                json!({
                    "id": d.id(),
                    "name": d.codec_name(),
                    "hardware": d.is_hardware(),
                    "available": backend.decoder_available(d),
                })
            })
            .collect();
        println!(
            "{}",
            json!({
                "schema_version": JSON_SCHEMA_VERSION,
                "command": "codecs",
                "ok": true,
                "encoders": encoders,
                "decoders": decoders,
            })
        );
    } else {
        println!("encoders: {}", Encoder::ALL.len());
        for e in Encoder::ALL {
            println!(
                "encoder={} id={} available={}",
                e.codec_name(),
                e.id(),
                backend.encoder_available(e)
            );
        }
        println!("decoders: {}", Decoder::ALL.len());
        for d in Decoder::ALL {
            println!(
                "decoder={} id={} hardware={} available={}",
                d.codec_name(),
                d.id(),
                d.is_hardware(),
                backend.decoder_available(d)
            );
        }
    }
    Ok(())
}

fn command_error_json(command: &str, err: &FilterError) -> Value {
    json!({
        "schema_version": JSON_SCHEMA_VERSION,
        "command": command,
        "ok": false,
        "error": err.to_string(),
        "code": err.error_code(),
        "kind": err.kind(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compress_args(extra: &[&str]) -> CompressArgs {
        let mut argv = vec![
            "h5vc", "compress", "-i", "in.raw", "-o", "out.h5vc", "--width", "8", "--height",
            "4", "--depth", "2",
        ];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).expect("parse").command {
            Commands::Compress(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn defaults_map_to_x264_with_software_decoder() {
        let params = compression_params(&compress_args(&[])).unwrap();
        assert_eq!(params.encoder_id, Encoder::X264.id());
        assert_eq!(params.decoder_id, Decoder::H264.id());
        assert_eq!((params.preset_id, params.tune_id, params.crf), (0, 0, 23));
        assert_eq!(params.bit_mode, 0);
    }

    #[test]
    fn names_resolve_to_ids() {
        let params = compress_args(&[
            "--encoder",
            "libx265",
            "--preset",
            "medium",
            "--bit-depth",
            "10",
        ]);
        let params = compression_params(&params).unwrap();
        assert_eq!(params.encoder_id, Encoder::X265.id());
        assert_eq!(params.decoder_id, Decoder::Hevc.id());
        assert_eq!(params.preset_id, 205);
        assert_eq!(params.bit_mode, 1);
    }

    #[test]
    fn foreign_preset_name_is_rejected() {
        let err = compression_params(&compress_args(&["--encoder", "mpeg4", "--preset", "slow"]))
            .unwrap_err();
        assert!(matches!(err, FilterError::UnknownName { .. }));
    }

    #[test]
    fn unsupported_bit_depth_fails_to_parse() {
        let argv = [
            "h5vc", "compress", "-i", "a", "-o", "b", "--width", "1", "--height", "1", "--depth",
            "1", "--bit-depth", "9",
        ];
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[test]
    fn bad_config_file_is_invalid_parameters() {
        let path = std::env::temp_dir().join(format!("h5vc_bad_config_{}.json", std::process::id()));
        std::fs::write(&path, "{ not json").unwrap();
        let err = load_config(Some(&path)).unwrap_err();
        let _ = std::fs::remove_file(&path);
        assert!(matches!(err, FilterError::InvalidParameters(_)));
    }

    #[test]
    fn jobs_run_inline_or_under_a_deadline() {
        assert_eq!(run_job(None, || Ok(7u32)).unwrap(), 7);
        assert_eq!(run_job(Some(5_000), || Ok(8u32)).unwrap(), 8);

        let err = run_job(Some(10), || {
            std::thread::sleep(Duration::from_millis(300));
            Ok(())
        })
        .unwrap_err();
        assert_eq!(err.error_code(), 401);
    }

    #[test]
    fn error_json_carries_code_and_kind() {
        let value = command_error_json("inspect", &FilterError::Timeout { elapsed_ms: 5 });
        assert_eq!(value["schema_version"], 1);
        assert_eq!(value["ok"], false);
        assert_eq!(value["code"], 401);
        assert_eq!(value["kind"], "runtime");
    }
}
