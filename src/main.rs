//! gcs-flysystem command line entry point

use std::path::PathBuf;

use futures::TryStreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use gcs_flysystem::config::Config;
use gcs_flysystem::{FileMetadata, GcsAdapter, Visibility, WriteOptions};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Print usage information
fn print_usage() {
    eprintln!("Usage: gcs-flysystem <config.yaml> <command> [args]");
    eprintln!();
    eprintln!("gcs-flysystem - filesystem operations on a Google Cloud Storage bucket");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  ls [dir] [-r]                     List a directory (recursively with -r)");
    eprintln!("  cat <path>                        Write a file to stdout");
    eprintln!("  put <path> <local-file>           Upload a local file");
    eprintln!("  rm <path>                         Delete a file");
    eprintln!("  mkdir <dir>                       Create a directory marker");
    eprintln!("  rmdir <dir>                       Delete a directory and its contents");
    eprintln!("  cp <from> <to>                    Copy a file");
    eprintln!("  mv <from> <to>                    Rename a file");
    eprintln!("  stat <path>                       Show file or directory metadata");
    eprintln!("  visibility <path> [public|private]  Show or change visibility");
    eprintln!("  bucket                            Show bucket metadata");
    eprintln!();
    eprintln!("Example:");
    eprintln!("  gcs-flysystem /etc/gcs-flysystem/config.yaml ls photos -r");
}

#[tokio::main]
async fn main() -> CliResult<()> {
    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        print_usage();
        std::process::exit(1);
    }

    let config_path = PathBuf::from(&args[1]);

    // Load configuration
    let config = match Config::from_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging; stdout is reserved for command output
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!("Loaded configuration from {:?}", config_path);

    let adapter = match config.builder().build().await {
        Ok(adapter) => adapter,
        Err(e) => {
            eprintln!("Failed to initialize adapter: {}", e);
            std::process::exit(1);
        }
    };

    let command = args[2].as_str();
    let rest = &args[3..];

    if let Err(e) = run(&adapter, command, rest).await {
        eprintln!("{}: {}", command, e);
        std::process::exit(1);
    }

    Ok(())
}

/// Dispatch a single command
async fn run(adapter: &GcsAdapter, command: &str, args: &[String]) -> CliResult<()> {
    match (command, args) {
        ("ls", args) => {
            let recursive = args.iter().any(|a| a == "-r");
            let dir = args
                .iter()
                .find(|a| a.as_str() != "-r")
                .map(String::as_str)
                .unwrap_or("");
            for entry in adapter.list_contents(dir, recursive).await? {
                println!("{}", format_entry(&entry));
            }
        }
        ("cat", [path]) => {
            let mut stream = adapter.read_stream(path).await?;
            let mut stdout = tokio::io::stdout();
            while let Some(chunk) = stream.try_next().await? {
                stdout.write_all(&chunk).await?;
            }
            stdout.flush().await?;
        }
        ("put", [path, local]) => {
            let data = tokio::fs::read(local).await?;
            let metadata = adapter.write(path, data, &WriteOptions::default()).await?;
            info!("Uploaded {} ({} bytes)", metadata.path, metadata.size);
        }
        ("rm", [path]) => adapter.delete(path).await?,
        ("mkdir", [dir]) => {
            adapter.create_dir(dir, &WriteOptions::default()).await?;
        }
        ("rmdir", [dir]) => adapter.delete_dir(dir).await?,
        ("cp", [from, to]) => adapter.copy(from, to).await?,
        ("mv", [from, to]) => adapter.rename(from, to).await?,
        ("stat", [path]) => {
            let metadata = adapter.get_metadata(path).await?;
            println!("path:       {}", metadata.path);
            println!("type:       {}", if metadata.is_dir() { "dir" } else { "file" });
            println!("size:       {}", metadata.size);
            println!("mimetype:   {}", metadata.mimetype);
            println!("timestamp:  {}", metadata.timestamp);
            println!("visibility: {}", metadata.visibility);
        }
        ("visibility", [path]) => {
            println!("{}", adapter.get_visibility(path).await?);
        }
        ("visibility", [path, value]) => {
            let visibility: Visibility = value.parse()?;
            adapter.set_visibility(path, visibility).await?;
        }
        ("bucket", []) => {
            let bucket = adapter.bucket_info().await?;
            println!("name:          {}", bucket.name);
            println!(
                "location:      {}",
                bucket.location.as_deref().unwrap_or("-")
            );
            println!(
                "storage class: {}",
                bucket.storage_class.as_deref().unwrap_or("-")
            );
            if let Some(created) = bucket.time_created {
                println!("created:       {}", created.to_rfc3339());
            }
        }
        _ => {
            print_usage();
            std::process::exit(1);
        }
    }

    Ok(())
}

fn format_entry(entry: &FileMetadata) -> String {
    if entry.is_dir() {
        format!("d {:>12} {}/", "-", entry.path)
    } else {
        format!("- {:>12} {}", entry.size, entry.path)
    }
}
