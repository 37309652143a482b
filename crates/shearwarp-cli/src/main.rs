//! Command-line driver: resample an image file under an inverse affine map.
//!
//! ```text
//! shearwarp [options] <input> -- <a b p c d q r s t>
//! ```
//!
//! The nine coefficients are the rows of a homogeneous matrix mapping output
//! pixel coordinates to input pixel coordinates. Coefficients go after `--`
//! so that negative values are not taken for options.

use std::path::Path;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use argh::FromArgs;
use cpu_time::ProcessTime;
use shearwarp_core::resample::{Execution, TransposePolicy};
use shearwarp_core::{
    read_image, write_image, AffineMap, CodecError, FloatImage, KernelProfile, ResampleConfig,
    ResampleError, Resampler,
};
use thiserror::Error;

const USAGE: &str = "usage: shearwarp [options] <input> -- <a b p c d q r s t>";

/// Resample an image under an inverse affine map
#[derive(Debug, FromArgs)]
struct Args {
    /// output image, format taken from the extension
    #[argh(option, short = 'o', default = "String::from(\"img_f.png\")")]
    output: String,

    /// output width in pixels
    #[argh(option, default = "512")]
    width: u32,

    /// output height in pixels
    #[argh(option, default = "512")]
    height: u32,

    /// json file with resampling settings
    #[argh(option, short = 'c')]
    config: Option<String>,

    /// interpolation kernel: raised-cosine or gaussian
    #[argh(option, short = 'k', from_str_fn(parse_kernel))]
    kernel: Option<KernelProfile>,

    /// kernel half-width in taps per unit scale
    #[argh(option)]
    taps: Option<usize>,

    /// transpose policy: auto, never or always
    #[argh(option, from_str_fn(parse_transpose))]
    transpose: Option<TransposePolicy>,

    /// run every shear on the calling thread
    #[argh(switch)]
    serial: bool,

    /// input image
    #[argh(positional)]
    input: String,

    /// homogeneous inverse map, row by row
    #[argh(positional)]
    coefficients: Vec<f64>,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("expected 9 coefficients, got {0}")]
    Coefficients(usize),

    #[error("invalid config file: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Resample(#[from] ResampleError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

fn parse_kernel(value: &str) -> Result<KernelProfile, String> {
    match value {
        "raised-cosine" => Ok(KernelProfile::raised_cosine()),
        "gaussian" => Ok(KernelProfile::gaussian()),
        _ => Err(format!("unknown kernel '{value}'")),
    }
}

fn parse_transpose(value: &str) -> Result<TransposePolicy, String> {
    match value {
        "auto" => Ok(TransposePolicy::Auto),
        "never" => Ok(TransposePolicy::Never),
        "always" => Ok(TransposePolicy::Always),
        _ => Err(format!("unknown transpose policy '{value}'")),
    }
}

/// Settings from `--config`, then individual overrides.
fn build_config(args: &Args) -> Result<ResampleConfig, CliError> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ResampleConfig::default(),
    };
    if let Some(profile) = args.kernel {
        config.profile = profile;
    }
    if let Some(taps) = args.taps {
        config.taps = taps;
    }
    if let Some(transpose) = args.transpose {
        config.transpose = transpose;
    }
    if args.serial {
        config.execution = Execution::Serial;
    }
    config.validate()?;
    Ok(config)
}

fn load_config(path: impl AsRef<Path>) -> Result<ResampleConfig, CliError> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn build_map(coefficients: &[f64]) -> Result<AffineMap, CliError> {
    let [a, b, p, c, d, q, r, s, t] = <[f64; 9]>::try_from(coefficients)
        .map_err(|_| CliError::Coefficients(coefficients.len()))?;
    Ok(AffineMap::from_homogeneous([[a, b, p], [c, d, q], [r, s, t]])?)
}

fn run(args: &Args) -> Result<(), CliError> {
    let config = build_config(args)?;
    let mut map = build_map(&args.coefficients)?;
    let mut src = read_image(&args.input)?;
    log::info!(
        "read {} ({}x{})",
        args.input,
        src.width,
        src.height
    );

    let mut dst = FloatImage::filled(args.width, args.height, 0.0)?;
    let resampler = Resampler::new(config);
    log::debug!("{:?}", resampler.config());

    let start = Instant::now();
    let cpu_start = ProcessTime::now();
    let summary = resampler.apply(&mut src, &mut map, &mut dst)?;
    log::info!(
        "resampled in {}",
        timing_summary(start.elapsed(), cpu_start.elapsed())
    );
    log::debug!("{summary:?}");

    write_image(&dst, &args.output)?;
    log::info!("wrote {} ({}x{})", args.output, dst.width, dst.height);
    Ok(())
}

/// Wall-clock and CPU time, CPU summed over all worker threads.
fn timing_summary(wall: Duration, cpu: Duration) -> String {
    format!(
        "{:.3}s wall, {:.3}s cpu",
        wall.as_secs_f64(),
        cpu.as_secs_f64()
    )
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args: Args = argh::from_env();

    if args.coefficients.len() != 9 {
        eprintln!("{USAGE}");
        return ExitCode::from(1);
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::from(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, argh::EarlyExit> {
        Args::from_args(&["shearwarp"], args)
    }

    const IDENTITY: [&str; 9] = ["1", "0", "0", "0", "1", "0", "0", "0", "1"];

    #[test]
    fn test_parse_defaults() {
        let mut argv = vec!["in.png", "--"];
        argv.extend(IDENTITY);
        let args = parse(&argv).unwrap();
        assert_eq!(args.input, "in.png");
        assert_eq!(args.output, "img_f.png");
        assert_eq!((args.width, args.height), (512, 512));
        assert_eq!(args.coefficients.len(), 9);
        assert!(!args.serial);
    }

    #[test]
    fn test_parse_negative_coefficients_after_separator() {
        let argv = [
            "-o", "out.jpg", "in.png", "--", "0.5", "-0.25", "3", "0.25", "0.5", "-1", "0", "0",
            "1",
        ];
        let args = parse(&argv).unwrap();
        assert_eq!(args.output, "out.jpg");
        assert_eq!(args.coefficients[1], -0.25);
        assert_eq!(args.coefficients[5], -1.0);
    }

    #[test]
    fn test_parse_rejects_unknown_kernel() {
        let mut argv = vec!["--kernel", "lanczos", "in.png", "--"];
        argv.extend(IDENTITY);
        assert!(parse(&argv).is_err());
    }

    #[test]
    fn test_overrides_apply_on_top_of_defaults() {
        let mut argv = vec![
            "--kernel", "gaussian", "--taps", "6", "--transpose", "never", "--serial", "in.png",
            "--",
        ];
        argv.extend(IDENTITY);
        let config = build_config(&parse(&argv).unwrap()).unwrap();
        assert_eq!(config.profile, KernelProfile::gaussian());
        assert_eq!(config.taps, 6);
        assert_eq!(config.transpose, TransposePolicy::Never);
        assert_eq!(config.execution, Execution::Serial);
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let mut argv = vec!["--taps", "0", "in.png", "--"];
        argv.extend(IDENTITY);
        let err = build_config(&parse(&argv).unwrap()).unwrap_err();
        assert!(matches!(err, CliError::Resample(ResampleError::InvalidConfig(_))));
    }

    #[test]
    fn test_config_file_is_loaded() {
        let path = std::env::temp_dir().join(format!("shearwarp-cli-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"taps": 3, "execution": "serial"}"#).unwrap();
        let config = load_config(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.taps, 3);
        assert_eq!(config.execution, Execution::Serial);
        assert_eq!(config.phase_bits, ResampleConfig::default().phase_bits);
    }

    #[test]
    fn test_build_map_from_homogeneous_rows() {
        let map = build_map(&[2.0, 0.0, 4.0, 0.0, 2.0, 6.0, 0.0, 0.0, 2.0]).unwrap();
        assert_eq!(map.coefficients(), [1.0, 0.0, 2.0, 0.0, 1.0, 3.0]);
        assert!(matches!(build_map(&[1.0; 8]), Err(CliError::Coefficients(8))));
        assert!(matches!(
            build_map(&[1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.5, 0.0, 1.0]),
            Err(CliError::Resample(ResampleError::DegenerateMap(_)))
        ));
    }

    #[test]
    fn test_timing_summary_reports_wall_and_cpu() {
        let line = timing_summary(Duration::from_millis(1234), Duration::from_millis(4500));
        assert_eq!(line, "1.234s wall, 4.500s cpu");
    }
}
