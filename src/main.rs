use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tailview::config::ViewConfig;
use tailview::engine::Session;
use tailview::output;
use tailview::search::matcher::Matcher;
use tailview::view::window::ScrollRequest;

#[derive(Parser)]
#[command(name = "tailview")]
#[command(about = "Memory-bounded viewer for huge, live-growing text files")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a window of lines at an absolute position
    View {
        /// File to view
        file: PathBuf,

        /// First line of the window (1-based)
        #[arg(short, long, default_value_t = 1)]
        start: usize,

        /// Anchor the window at a byte offset instead of a line
        #[arg(long, conflicts_with = "start")]
        byte: Option<u64>,

        /// Number of lines to show
        #[arg(short = 'n', long, default_value_t = 20)]
        lines: usize,
    },
    /// Show the end of the file, optionally following growth
    Tail {
        /// File to view
        file: PathBuf,

        /// Number of lines to show
        #[arg(short = 'n', long, default_value_t = 10)]
        lines: usize,

        /// Keep the window pinned to the end as the file grows
        #[arg(short, long)]
        follow: bool,
    },
    /// Search the file for matching lines
    Grep {
        /// File to search
        file: PathBuf,

        /// Pattern to look for
        pattern: String,

        /// Treat the pattern as a regular expression
        #[arg(short = 'e', long)]
        regex: bool,

        /// Case-insensitive matching
        #[arg(short = 'i', long)]
        ignore_case: bool,

        /// Limit output to the last N matches (0 = all)
        #[arg(short = 'n', long, default_value_t = 0)]
        lines: usize,

        /// Emit matches as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show index statistics for a file
    Stats {
        /// File to inspect
        file: PathBuf,

        /// Emit statistics as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let color = !cli.no_color;
    let config = ViewConfig::load();

    match cli.command {
        Commands::View {
            file,
            start,
            byte,
            lines,
        } => {
            let session = Session::open(&file, config)?;
            session.wait_idle();
            let request = match byte {
                Some(pos) => ScrollRequest::at_byte(pos, lines),
                None => ScrollRequest::at_line(start.saturating_sub(1), lines),
            };
            output::print_lines(&session.read_window(&request), color, true)?;
        }
        Commands::Tail {
            file,
            lines,
            follow,
        } => {
            let session = Session::open(&file, config.clone())?;
            let request = ScrollRequest::tail(lines);
            if follow {
                #[cfg(feature = "follow")]
                run_follow(&session, &config, &request, color)?;
                #[cfg(not(feature = "follow"))]
                anyhow::bail!("this build does not include follow support");
            } else {
                session.wait_idle();
                output::print_lines(&session.read_window(&request), color, true)?;
            }
        }
        Commands::Grep {
            file,
            pattern,
            regex,
            ignore_case,
            lines,
            json,
        } => {
            let matcher = Matcher::from_pattern(&pattern, regex, ignore_case)?;
            let session = Session::open(&file, config)?;
            session.wait_idle();
            session.start_search(matcher.clone());
            wait_for_search(&session);

            let provider = match session.search_provider() {
                Some(provider) => provider,
                None => return Ok(()),
            };
            let total = provider.count();
            let request = if lines == 0 {
                ScrollRequest::at_line(0, total)
            } else {
                ScrollRequest::tail(lines)
            };
            let matches = provider.read_window(&request);
            if json {
                println!("{}", serde_json::to_string_pretty(&matches)?);
            } else {
                output::print_matches(&matches, &matcher, color, true)?;
            }
            if let Some(progress) = session.search_progress() {
                if progress.capped {
                    eprintln!(
                        "tailview: match cap reached; showing the first {} matches",
                        progress.total_matches
                    );
                }
            }
        }
        Commands::Stats { file, json } => {
            let session = Session::open(&file, config)?;
            session.wait_idle();
            let stats = session.stats();
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                output::print_stats(&stats)?;
            }
        }
    }

    Ok(())
}

/// Poll search progress until every segment completes
fn wait_for_search(session: &Session) {
    #[cfg(feature = "progress")]
    {
        use indicatif::ProgressBar;
        use std::time::Duration;

        if let Some(progress) = session.search_progress() {
            if progress.is_searching {
                let bar = ProgressBar::new(progress.segments_total as u64);
                while let Some(progress) = session.search_progress() {
                    bar.set_position(progress.segments_completed as u64);
                    if !progress.is_searching {
                        break;
                    }
                    std::thread::sleep(Duration::from_millis(50));
                }
                bar.finish_and_clear();
            }
        }
    }
    session.wait_idle();
}

/// Pin a tail window to the end of the file and stream new lines as deltas
#[cfg(feature = "follow")]
fn run_follow(
    session: &Session,
    config: &ViewConfig,
    request: &ScrollRequest,
    color: bool,
) -> Result<()> {
    use std::sync::mpsc::channel;
    use tailview::view::cache::VirtualizationCache;
    use tailview::watch::notifier::StatusPoller;

    session.wait_idle();
    let mut cache = VirtualizationCache::new();
    let delta = session.update_window(&mut cache, request);
    output::print_lines(&delta.added, color, true)?;

    let (tx, rx) = channel();
    let _poller = StatusPoller::spawn(session.path().to_path_buf(), config, tx);
    while let Ok(status) = rx.recv() {
        session.apply_status(status);
        let delta = session.update_window(&mut cache, request);
        output::print_lines(&delta.added, color, true)?;
    }
    Ok(())
}
