//! Terminal output formatting for windowed lines and search results

use crate::engine::SessionStats;
use crate::search::matcher::Matcher;
use crate::view::line::Line;
use std::io::{self, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

fn stream(color: bool) -> StandardStream {
    let choice = if color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    StandardStream::stdout(choice)
}

/// Print materialized lines, optionally with 1-based line numbers
pub fn print_lines(lines: &[Line], color: bool, numbers: bool) -> io::Result<()> {
    let mut stdout = stream(color);
    for line in lines {
        if numbers {
            stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
            write!(stdout, "{}", line.ordinal + 1)?;
            stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
            write!(stdout, ":")?;
            stdout.reset()?;
        }
        writeln!(stdout, "{}", line.text)?;
    }
    stdout.flush()
}

/// Print matching lines with the first match span highlighted
pub fn print_matches(
    lines: &[Line],
    matcher: &Matcher,
    color: bool,
    numbers: bool,
) -> io::Result<()> {
    let mut stdout = stream(color);
    for line in lines {
        if numbers {
            stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
            write!(stdout, "{}", line.ordinal + 1)?;
            stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
            write!(stdout, ":")?;
            stdout.reset()?;
        }
        match matcher.find(&line.text) {
            // Case folding can shift byte positions; only highlight spans
            // that still land on character boundaries
            Some((start, end))
                if line.text.is_char_boundary(start) && line.text.is_char_boundary(end) =>
            {
                write!(stdout, "{}", &line.text[..start])?;
                stdout.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
                write!(stdout, "{}", &line.text[start..end])?;
                stdout.reset()?;
                writeln!(stdout, "{}", &line.text[end..])?;
            }
            _ => writeln!(stdout, "{}", line.text)?,
        }
    }
    stdout.flush()
}

/// Print an index summary in human-readable form
pub fn print_stats(stats: &SessionStats) -> io::Result<()> {
    let mut stdout = stream(true);

    if !stats.exists {
        writeln!(stdout, "file missing or empty")?;
        return stdout.flush();
    }

    writeln!(stdout, "File size:       {} bytes", stats.file_len)?;
    let marker = if stats.approximate { " (approximate)" } else { "" };
    writeln!(stdout, "Lines:           {}{}", stats.line_count, marker)?;
    writeln!(stdout, "Segments:        {}", stats.segments_total)?;
    writeln!(stdout, "Heads indexed:   {}", stats.heads_indexed)?;
    writeln!(stdout, "Heads estimated: {}", stats.heads_estimated)?;
    if let Some(format) = &stats.format {
        writeln!(
            stdout,
            "Text format:     {:?}, delimiter {} byte(s)",
            format.encoding, format.delimiter_len
        )?;
    }
    stdout.flush()
}
