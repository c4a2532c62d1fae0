//! Build automation tasks for tiltview
//!
//! Usage:
//!   cargo xtask build-web       # Build WASM into dist/web
//!   cargo xtask serve           # Serve dist/web on localhost

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Component, Path, PathBuf};
use std::process::Command;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation for tiltview")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build WASM for web deployment
    BuildWeb {
        /// Mark as dev build (adds DEV to the page title)
        #[arg(long)]
        dev: bool,
    },
    /// Serve dist/web over HTTP for local testing
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
        /// Build first
        #[arg(long)]
        build: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::BuildWeb { dev } => build_web(dev),
        Commands::Serve { port, build } => {
            if build {
                build_web(true)?;
            }
            serve(port)
        }
    }
}

/// Get the project root directory
fn project_root() -> PathBuf {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest.parent().unwrap_or(manifest).to_path_buf()
}

/// Run a command and check for success
fn run_cmd(cmd: &mut Command) -> Result<()> {
    let status = cmd.status().context("Failed to execute command")?;
    if !status.success() {
        anyhow::bail!("Command failed with status: {}", status);
    }
    Ok(())
}

/// Download a file from URL to destination
fn download_file(url: &str, dest: &Path) -> Result<()> {
    println!("Downloading {}...", url);
    run_cmd(
        Command::new("curl")
            .args(["-L", "-o"])
            .arg(dest)
            .arg(url),
    )
}

/// Copy directory recursively
fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Build WASM for web deployment
fn build_web(dev: bool) -> Result<()> {
    let root = project_root();
    let dist = root.join("dist/web");

    println!("Building WASM...");
    run_cmd(
        Command::new("cargo")
            .current_dir(&root)
            .args(["build", "--release", "--target", "wasm32-unknown-unknown", "-p", "tiltview"]),
    )?;

    // Clean and create dist folder
    if dist.exists() {
        std::fs::remove_dir_all(&dist)?;
    }
    std::fs::create_dir_all(&dist)?;

    println!("Copying files to dist/web...");
    std::fs::copy(
        root.join("target/wasm32-unknown-unknown/release/tiltview.wasm"),
        dist.join("tiltview.wasm"),
    )
    .context("wasm binary missing after build")?;
    std::fs::copy(root.join("web/index.html"), dist.join("index.html"))
        .context("web/index.html missing")?;

    let config = root.join("viewer.ron");
    if config.exists() {
        std::fs::copy(&config, dist.join("viewer.ron"))?;
    }

    // Download macroquad JS bundle
    let mq_js = dist.join("mq_js_bundle.js");
    if !mq_js.exists() {
        download_file(
            "https://raw.githubusercontent.com/not-fl3/macroquad/v0.4.14/js/mq_js_bundle.js",
            &mq_js,
        )?;
    }

    let assets = root.join("assets");
    if assets.is_dir() {
        copy_dir_recursive(&assets, &dist.join("assets"))?;
    } else {
        println!("No assets/ directory; the viewer will start without a model");
    }

    if dev {
        println!("Applying DEV build modifications...");
        let index_path = dist.join("index.html");
        let index = std::fs::read_to_string(&index_path)?;
        std::fs::write(&index_path, index.replace("<title>tiltview", "<title>[DEV] tiltview"))?;
    }

    println!("Web build complete: dist/web/");
    Ok(())
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") => "text/html; charset=utf-8",
        Some("js") => "application/javascript",
        Some("wasm") => "application/wasm",
        Some("gltf") => "model/gltf+json",
        Some("glb") => "model/gltf-binary",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// Map a request URL onto a file under `root`, refusing anything that escapes it
fn resolve_request(root: &Path, url: &str) -> Option<PathBuf> {
    let path = url.split(['?', '#']).next().unwrap_or("/");
    let decoded = urlencoding::decode(path).ok()?;
    let relative = Path::new(decoded.trim_start_matches('/'));
    if relative.components().any(|c| !matches!(c, Component::Normal(_))) {
        return None;
    }
    let full = root.join(relative);
    if full.is_dir() {
        Some(full.join("index.html"))
    } else {
        Some(full)
    }
}

/// Static file server for dist/web
fn serve(port: u16) -> Result<()> {
    let root = project_root().join("dist/web");
    if !root.join("index.html").exists() {
        anyhow::bail!("dist/web is empty; run `cargo xtask build-web` first");
    }

    let address = format!("127.0.0.1:{}", port);
    let server = tiny_http::Server::http(&address)
        .map_err(|e| anyhow::anyhow!("Failed to start server on {}: {}", address, e))?;
    println!("Serving dist/web at http://{}/", address);

    for request in server.incoming_requests() {
        let file = resolve_request(&root, request.url()).filter(|p| p.is_file());
        let result = match file {
            Some(path) => {
                let body = std::fs::read(&path)?;
                let header = tiny_http::Header::from_bytes(&b"Content-Type"[..], content_type(&path).as_bytes())
                    .map_err(|_| anyhow::anyhow!("bad content type header"))?;
                request.respond(tiny_http::Response::from_data(body).with_header(header))
            }
            None => request.respond(tiny_http::Response::from_string("Not Found").with_status_code(404)),
        };
        if let Err(e) = result {
            eprintln!("response failed: {}", e);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_rejects_parent_dirs() {
        let root = Path::new("/srv/web");
        assert_eq!(resolve_request(root, "/../secret"), None);
        assert_eq!(resolve_request(root, "/assets/%2e%2e/x"), None);
        assert_eq!(
            resolve_request(root, "/assets/helmet.gltf?v=2"),
            Some(PathBuf::from("/srv/web/assets/helmet.gltf"))
        );
    }

    #[test]
    fn test_content_types() {
        assert_eq!(content_type(Path::new("a.wasm")), "application/wasm");
        assert_eq!(content_type(Path::new("a.hdr")), "application/octet-stream");
    }
}
