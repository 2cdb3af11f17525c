mod progress;

use log::{info, warn};
use std::path::{Path, PathBuf};
use structopt::StructOpt;

use pixfix::{collect_targets, find_reference, BatchJob, BilateralFilter, Error, Session};

#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case")]
struct Tweaks {
    /// The number of fill passes before the remaining pixels are resolved by
    /// a single fallback pass with a much larger kernel.
    #[structopt(long, default_value = "100")]
    max_passes: u32,
    /// The kernel size of the first fill pass. A pass looks ksize/2 pixels
    /// right and down and ksize/2 rounded up left and up, the kernel grows
    /// whenever a pass stalls.
    #[structopt(long, default_value = "2")]
    start_ksize: u32,
    /// Diameter of the bilateral filter applied to the repaired area
    #[structopt(long = "bilateral-diameter", default_value = "9")]
    diameter: i32,
    /// Color sigma of the bilateral filter
    #[structopt(long, default_value = "75.0")]
    sigma_color: f32,
    /// Space sigma of the bilateral filter
    #[structopt(long, default_value = "75.0")]
    sigma_space: f32,
}

#[derive(StructOpt)]
#[structopt(
    name = "pixfix",
    about = "Removes the masked overlay of a reference image from every image of a directory",
    rename_all = "kebab-case"
)]
struct Opt {
    /// The reference image the mask is derived from. Defaults to the file named
    /// `ref.*` in the input directory.
    #[structopt(long, parse(from_os_str))]
    reference: Option<PathBuf>,
    /// The directory treated images are saved to. Defaults to `treated` inside
    /// the input directory.
    #[structopt(long, short, parse(from_os_str))]
    out_dir: Option<PathBuf>,
    /// Pixels of the reference with any channel above this value are masked
    #[structopt(long, default_value = "30")]
    tolerance: u8,
    /// How much the mask is grown when mapped onto each image, 0 disables
    /// growing. Range (0.0 - 2.0)
    #[structopt(long, default_value = "0.5")]
    strength: f32,
    /// The maximum number of images treated at any one time. Defaults to the
    /// logical core count.
    #[structopt(short = "t", long = "threads")]
    max_threads: Option<usize>,
    /// Don't show a progress bar
    #[structopt(long)]
    no_progress: bool,
    /// Log level, `RUST_LOG` takes precedence
    #[structopt(long, default_value = "info")]
    log_level: String,
    #[structopt(flatten)]
    tweaks: Tweaks,
    /// The directory holding the images to treat. If a file is given, it is used
    /// as the reference and its directory as the input.
    #[structopt(parse(from_os_str))]
    input: PathBuf,
}

fn main() {
    if let Err(e) = real_main() {
        if atty::is(atty::Stream::Stderr) {
            eprintln!("\x1b[31merror\x1b[0m: {}", e);
        } else {
            eprintln!("error: {}", e);
        }

        std::process::exit(1);
    }
}

fn init_logging(level: &str) -> Option<flexi_logger::LoggerHandle> {
    match flexi_logger::Logger::try_with_env_or_str(level)
        .and_then(|logger| logger.log_to_stderr().start())
    {
        Ok(handle) => Some(handle),
        Err(e) => {
            eprintln!("failed to initialize logging: {}", e);
            None
        }
    }
}

/// Resolves the input directory and the reference image
fn locate(args: &Opt) -> Result<(PathBuf, PathBuf), Error> {
    if args.input.is_file() {
        let dir = args
            .input
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        return Ok((dir, args.input.clone()));
    }

    let reference = match args.reference {
        Some(ref reference) => reference.clone(),
        None => find_reference(&args.input)?,
    };

    Ok((args.input.clone(), reference))
}

fn real_main() -> Result<(), Error> {
    let args = Opt::from_args();
    let _logger = init_logging(&args.log_level);

    let (input_dir, reference) = locate(&args)?;
    let out_dir = args
        .out_dir
        .clone()
        .unwrap_or_else(|| input_dir.join("treated"));

    info!("using reference {}", reference.display());

    let mut sb = Session::builder()
        .reference(&reference)
        .tolerance(args.tolerance)
        .strength(args.strength)
        .max_passes(args.tweaks.max_passes)
        .start_ksize(args.tweaks.start_ksize)
        .bilateral(BilateralFilter::new(
            args.tweaks.diameter,
            args.tweaks.sigma_color,
            args.tweaks.sigma_space,
        ));

    if let Some(mt) = args.max_threads {
        sb = sb.max_thread_count(mt);
    }

    let session = sb.build()?;

    std::fs::create_dir_all(&out_dir)?;
    let stem = reference
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("ref");
    session.save_visualization(&out_dir, stem)?;

    let jobs: Vec<_> = collect_targets(&input_dir, &reference)?
        .into_iter()
        .map(|path| BatchJob::in_dir(path, &out_dir))
        .collect();

    if jobs.is_empty() {
        warn!("no images to treat in {}", input_dir.display());
        return Ok(());
    }

    info!("treating {} images into {}", jobs.len(), out_dir.display());

    let outcomes = if args.no_progress {
        session.treat_batch(&jobs, None)?
    } else {
        let bar = progress::BatchBar::new(jobs.len());
        session.treat_batch(&jobs, Some(&bar))?
    };

    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    if failed > 0 {
        warn!("{} of {} images could not be treated", failed, outcomes.len());
    } else {
        info!("treated images saved in {}", out_dir.display());
    }

    Ok(())
}
