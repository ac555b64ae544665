//! quizstruct CLI - reconstruct question structure from OCR page annotations

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use quizstruct::{
    load_page, process_pages, to_json, write_page, AnswerKey, BookAssembler, GroupingOptions,
    JsonFormat, PageContext, PageProcessor, ParserOptions,
};

#[derive(Parser)]
#[command(name = "quizstruct")]
#[command(version)]
#[command(about = "Reconstruct question/answer structure from OCR page annotations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge fragmented OCR detections into consolidated text boxes
    Merge {
        /// Page annotation file or directory of page files
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output directory (overwrites input files if not specified)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
    },

    /// Assign group numbers to a page's classified question boxes
    Groups {
        /// Page annotation file or directory of page files
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output directory (overwrites input files if not specified)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Vertical gap that separates logical units
        #[arg(long, default_value_t = 20.0)]
        separation_tolerance: f64,

        /// Indent depth still counted as nested content
        #[arg(long, default_value_t = 20.0)]
        indent_tolerance: f64,
    },

    /// Parse classified pages into the nested question hierarchy
    Parse {
        /// Page annotation file or directory of page files
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output directory (stdout if not specified)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Emit compact JSON instead of pretty-printed
        #[arg(long)]
        compact: bool,

        /// Horizontal gap treated as a printed fill-in blank
        #[arg(long, default_value_t = 40.0)]
        blank_threshold: f64,

        /// Vertical overlap fraction for the same-line test
        #[arg(long, default_value_t = 0.5)]
        overlap_tolerance: f64,
    },

    /// Assemble parsed pages into one book artifact with global ids
    Assemble {
        /// Directory of page annotation files, one lesson per file
        #[arg(value_name = "DIR")]
        input: PathBuf,

        /// Book identifier recorded in the artifact
        #[arg(short, long, value_name = "NAME")]
        book: String,

        /// Answer key JSON to join (lesson number -> question number -> answer)
        #[arg(long, value_name = "FILE")]
        answer_key: Option<PathBuf>,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Emit compact JSON instead of pretty-printed
        #[arg(long)]
        compact: bool,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Merge { input, output } => run_merge(&input, output.as_deref()),
        Commands::Groups {
            input,
            output,
            separation_tolerance,
            indent_tolerance,
        } => run_groups(&input, output.as_deref(), separation_tolerance, indent_tolerance),
        Commands::Parse {
            input,
            output,
            compact,
            blank_threshold,
            overlap_tolerance,
        } => run_parse(&input, output.as_deref(), compact, blank_threshold, overlap_tolerance),
        Commands::Assemble {
            input,
            book,
            answer_key,
            output,
            compact,
        } => run_assemble(&input, &book, answer_key.as_deref(), output.as_deref(), compact),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

/// Collect page annotation files: the path itself, or every `.json` inside
/// a directory, sorted by name.
fn collect_page_files(input: &Path) -> quizstruct::Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    let mut files: Vec<PathBuf> = fs::read_dir(input)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    Ok(files)
}

fn page_progress(len: u64) -> ProgressBar {
    let bar = ProgressBar::new(len);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("=>-"),
    );
    bar
}

fn output_path(output: Option<&Path>, page_file: &Path) -> PathBuf {
    match output {
        Some(dir) => dir.join(page_file.file_name().unwrap_or_default()),
        None => page_file.to_path_buf(),
    }
}

fn run_merge(input: &Path, output: Option<&Path>) -> quizstruct::Result<()> {
    let files = collect_page_files(input)?;
    if let Some(dir) = output {
        fs::create_dir_all(dir)?;
    }
    let processor = PageProcessor::new();
    let bar = page_progress(files.len() as u64);

    let mut total_in = 0usize;
    let mut total_out = 0usize;
    for file in &files {
        bar.set_message(file.file_name().unwrap_or_default().to_string_lossy().to_string());
        match load_page(file) {
            Ok(mut page) => {
                total_in += page.text.len();
                let merged = processor.merge_page_with_context(&page, &PageContext::from_path(file));
                total_out += merged.len();
                page.set_text_boxes(merged);
                write_page(output_path(output, file), &page)?;
            }
            Err(e) => log::warn!("skipping {}: {}", file.display(), e),
        }
        bar.inc(1);
    }
    bar.finish_and_clear();

    println!(
        "{} merged {} detections into {} boxes across {} pages",
        "done:".green().bold(),
        total_in,
        total_out,
        files.len()
    );
    Ok(())
}

fn run_groups(
    input: &Path,
    output: Option<&Path>,
    separation_tolerance: f64,
    indent_tolerance: f64,
) -> quizstruct::Result<()> {
    let files = collect_page_files(input)?;
    if let Some(dir) = output {
        fs::create_dir_all(dir)?;
    }
    let processor = PageProcessor::new().with_grouping_options(
        GroupingOptions::new()
            .with_separation_tolerance(separation_tolerance)
            .with_indent_tolerance(indent_tolerance),
    );
    let bar = page_progress(files.len() as u64);

    for file in &files {
        match load_page(file) {
            Ok(mut page) => {
                let grouped = processor.assign_groups(&page);
                page.apply_groups(&grouped);
                write_page(output_path(output, file), &page)?;
            }
            Err(e) => log::warn!("skipping {}: {}", file.display(), e),
        }
        bar.inc(1);
    }
    bar.finish_and_clear();

    println!("{} grouped {} pages", "done:".green().bold(), files.len());
    Ok(())
}

fn run_parse(
    input: &Path,
    output: Option<&Path>,
    compact: bool,
    blank_threshold: f64,
    overlap_tolerance: f64,
) -> quizstruct::Result<()> {
    let files = collect_page_files(input)?;
    let processor = PageProcessor::new().with_parser_options(
        ParserOptions::new()
            .with_blank_threshold(blank_threshold)
            .with_overlap_tolerance(overlap_tolerance),
    );
    let format = if compact { JsonFormat::Compact } else { JsonFormat::Pretty };

    let result = process_pages(&processor, &files);

    if let Some(dir) = output {
        fs::create_dir_all(dir)?;
        for (page_id, parsed) in &result.pages {
            let path = dir.join(format!("{}.parsed.json", page_id));
            fs::write(path, to_json(parsed, format)?)?;
        }
    } else {
        for (page_id, parsed) in &result.pages {
            println!("{}", page_id.bold());
            println!("{}", to_json(parsed, format)?);
        }
    }

    for failure in &result.failures {
        eprintln!(
            "{} {}: {}",
            "skipped".yellow().bold(),
            failure.page,
            failure.message
        );
    }
    println!(
        "{} {} questions from {} pages ({} skipped)",
        "done:".green().bold(),
        result.question_count(),
        result.pages.len(),
        result.failures.len()
    );
    Ok(())
}

fn run_assemble(
    input: &Path,
    book: &str,
    answer_key: Option<&Path>,
    output: Option<&Path>,
    compact: bool,
) -> quizstruct::Result<()> {
    let files = collect_page_files(input)?;
    let result = process_pages(&PageProcessor::new(), &files);

    let mut assembler = BookAssembler::new(book);
    for (page_id, parsed) in &result.pages {
        assembler.add_page(page_id, parsed);
    }

    if let Some(key_path) = answer_key {
        let key = AnswerKey::from_json(&fs::read_to_string(key_path)?)?;
        // a mismatch here is fatal for the whole book
        assembler.join_answer_key(&key)?;
    }

    let assembled = assembler.into_book();
    let warnings = quizstruct::assemble::integrity_warnings(&assembled);
    for warning in &warnings {
        eprintln!(
            "{} {} at {}",
            "warning:".yellow().bold(),
            warning.message,
            warning.path
        );
    }

    let format = if compact { JsonFormat::Compact } else { JsonFormat::Pretty };
    let json = to_json(&assembled, format)?;
    match output {
        Some(path) => fs::write(path, json)?,
        None => println!("{}", json),
    }

    println!(
        "{} assembled {} lessons from {} pages ({} warnings, {} pages skipped)",
        "done:".green().bold(),
        assembled.lessons.len(),
        result.pages.len(),
        warnings.len(),
        result.failures.len()
    );
    Ok(())
}
