use clap::{Parser, Subcommand};
use curly::{Compiler, Value};
use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::Path;
use std::time::Instant;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "curly")]
#[command(about = "Curly - Mustache-derived templates with registry-extensible tags")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render .tpl templates against a JSON data file
    Render {
        /// Template files or directories (directories are searched for .tpl files)
        files: Vec<String>,

        /// JSON file providing the data context (defaults to null)
        #[arg(long)]
        data: Option<String>,

        /// Read the template from stdin and write the output to stdout
        #[arg(long)]
        stdin: bool,

        /// Write rendered output to stdout instead of .out files
        #[arg(long)]
        stdout: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Render { files, data, stdin, stdout } => {
            let data = load_data(data.as_deref());
            if stdin {
                render_stdin(&data);
            } else {
                render_files(files, &data, stdout);
            }
        }
    }
}

fn load_data(path: Option<&str>) -> Value {
    let Some(path) = path else {
        return Value::Null;
    };

    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error reading {}: {}", path, e);
            std::process::exit(1);
        }
    };

    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(json) => Value::from(json),
        Err(e) => {
            eprintln!("Error parsing {}: {}", path, e);
            std::process::exit(1);
        }
    }
}

fn render_stdin(data: &Value) {
    let mut source = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut source) {
        eprintln!("Error reading stdin: {}", e);
        std::process::exit(1);
    }

    let compiler = Compiler::new();
    let generator = match compiler.compile(&source) {
        Ok(g) => g,
        Err(e) => {
            if io::stderr().is_terminal() {
                eprint!("{}", e.render_color(&source, "stdin"));
            } else {
                eprint!("{}", e.render(&source, "stdin"));
            }
            std::process::exit(1);
        }
    };

    match generator.render(data.clone()) {
        Ok(output) => print!("{}", output),
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    }
}

fn render_files(files: Vec<String>, data: &Value, to_stdout: bool) {
    let start = Instant::now();

    let files_to_process: Vec<String> = if files.is_empty() {
        discover_templates(".")
    } else {
        let mut result = Vec::new();
        for arg in &files {
            if Path::new(arg).is_dir() {
                result.extend(discover_templates(arg));
            } else {
                result.push(arg.clone());
            }
        }
        result
    };

    if files_to_process.is_empty() {
        eprintln!("No .tpl files found");
        std::process::exit(1);
    }

    let compiler = Compiler::new();
    let mut has_errors = false;
    let mut success_count = 0;

    for file_path in files_to_process {
        let source = match fs::read_to_string(&file_path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Error reading {}: {}", file_path, e);
                has_errors = true;
                continue;
            }
        };

        let generator = match compiler.compile(&source) {
            Ok(g) => g,
            Err(e) => {
                if io::stderr().is_terminal() {
                    eprint!("{}", e.render_color(&source, &file_path));
                } else {
                    eprint!("{}", e.render(&source, &file_path));
                }
                has_errors = true;
                continue;
            }
        };

        let output = match generator.render(data.clone()) {
            Ok(output) => output,
            Err(e) => {
                eprintln!("error: {}: {}", file_path, e);
                has_errors = true;
                continue;
            }
        };

        if to_stdout {
            print!("{}", output);
            success_count += 1;
        } else {
            let output_path = Path::new(&file_path).with_extension("out");
            if let Err(e) = fs::write(&output_path, &output) {
                eprintln!("Error writing {}: {}", output_path.display(), e);
                has_errors = true;
                continue;
            }
            print_rendered(&output_path.to_string_lossy());
            success_count += 1;
        }
    }

    if success_count > 0 && !to_stdout {
        print_summary(success_count, start.elapsed());
    }

    if has_errors {
        std::process::exit(1);
    }
}

fn discover_templates(dir: &str) -> Vec<String> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().map_or(false, |ext| ext == "tpl"))
        .map(|e| e.path().to_string_lossy().to_string())
        .collect()
}

fn print_rendered(path: &str) {
    if io::stderr().is_terminal() {
        eprintln!("  \x1b[32m✓\x1b[0m {}", path);
    } else {
        eprintln!("  ✓ {}", path);
    }
}

fn print_summary(count: usize, elapsed: std::time::Duration) {
    let time_str = format_duration(elapsed);
    let files_word = if count == 1 { "file" } else { "files" };

    if io::stderr().is_terminal() {
        eprintln!("\n\x1b[1mRendered {} {} in {}\x1b[0m", count, files_word, time_str);
    } else {
        eprintln!("\nRendered {} {} in {}", count, files_word, time_str);
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let micros = d.as_micros();
    if micros < 1000 {
        format!("{}μs", micros)
    } else if micros < 1_000_000 {
        format!("{:.1}ms", micros as f64 / 1000.0)
    } else {
        format!("{:.2}s", d.as_secs_f64())
    }
}
