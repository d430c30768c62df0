use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use ipdf_viewer_core::{
    DocumentSource, HeadlessPlatform, HttpFetcher, LoadState, ManualIntersections, OpenOutcome, PdfiumLoader,
    Viewer, ViewerConfig, ViewerControls, PDF_MIME,
};

/// Open a PDF from disk or a URL, rasterize every page and walk through it
/// the way a scrolling reader would.
#[derive(Debug, Parser)]
#[command(name = "ipdf-view", version, about)]
struct Args {
    /// Local file path or http(s) URL
    source: String,

    /// JSON viewer configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for page images and downloads
    #[arg(long, default_value = "ipdf-out")]
    out: PathBuf,

    /// Zoom in (positive) or out (negative) this many steps before reporting
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    zoom_steps: i32,

    /// Quarter turns clockwise (negative for counter-clockwise)
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    rotate: i32,

    /// Also save the original document into the output directory
    #[arg(long)]
    download: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("ipdf_view=debug,ipdf_viewer_core=debug,info")
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => ViewerConfig::from_path(path).with_context(|| format!("loading {}", path.display()))?,
        None => ViewerConfig::default(),
    };

    let source = resolve_source(&args.source)?;
    let fetcher = HttpFetcher::new().context("building HTTP client")?;
    let loader = PdfiumLoader::new(fetcher.clone())?;
    let intersections = ManualIntersections::new();
    let platform = Rc::new(HeadlessPlatform::new(&args.out));

    let viewer = Viewer::new(config, loader, intersections.clone(), platform, fetcher).on_page_change(
        |page, total| {
            tracing::info!("Page {} / {}", page, total);
        },
    );

    let report = match viewer.open(source).await? {
        OpenOutcome::Rendered(report) => report,
        OpenOutcome::Superseded => bail!("load was superseded"),
    };
    if let LoadState::Ready { failed_pages } = viewer.load_state() {
        if !failed_pages.is_empty() {
            tracing::warn!("Pages that failed to render: {:?}", failed_pages);
        }
    }

    write_pages(&viewer, &args.out)?;

    for page in 1..=report.total {
        intersections.scroll_to(&[page]);
    }

    apply_steps(&viewer, args.zoom_steps, args.rotate);
    let state = viewer.viewport();
    let transform = state.transform();
    println!(
        "{} pages, {} rendered, current page {}, zoom {:.2}, rotation {}°, origin {:?}",
        report.total,
        report.rendered,
        state.current_page.unwrap_or(0),
        state.zoom,
        transform.rotation,
        transform.origin,
    );

    if args.download {
        match viewer.download().await {
            Some(name) => println!("saved {}", args.out.join(name).display()),
            None => bail!("download failed"),
        }
    }

    Ok(())
}

fn resolve_source(arg: &str) -> Result<DocumentSource> {
    if arg.starts_with("http://") || arg.starts_with("https://") {
        return Ok(DocumentSource::url(arg));
    }
    let bytes = std::fs::read(arg).with_context(|| format!("reading {arg}"))?;
    Ok(DocumentSource::bytes(bytes, Some(PDF_MIME)))
}

fn write_pages<L, F>(viewer: &Viewer<L, ManualIntersections, HeadlessPlatform, F>, out: &Path) -> Result<()>
where
    L: ipdf_viewer_core::DocumentLoader,
    F: ipdf_viewer_core::Fetcher,
{
    std::fs::create_dir_all(out).with_context(|| format!("creating {}", out.display()))?;
    for surface in viewer.surfaces().iter() {
        let path = out.join(format!("page-{:03}.png", surface.index()));
        if surface.write_png(&path).with_context(|| format!("writing {}", path.display()))? {
            tracing::debug!("Wrote {}", path.display());
        } else {
            tracing::warn!("Page {} is blank, skipped", surface.index());
        }
    }
    Ok(())
}

fn apply_steps(viewer: &impl ViewerControls, zoom_steps: i32, quarter_turns: i32) {
    for _ in 0..zoom_steps.unsigned_abs() {
        if zoom_steps > 0 {
            viewer.zoom_in();
        } else {
            viewer.zoom_out();
        }
    }
    for _ in 0..quarter_turns.unsigned_abs() {
        if quarter_turns > 0 {
            viewer.rotate_right();
        } else {
            viewer.rotate_left();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_not_read_from_disk() {
        let source = resolve_source("https://example.com/a.pdf").unwrap();
        assert_eq!(source, DocumentSource::url("https://example.com/a.pdf"));
    }

    #[test]
    fn local_files_become_pdf_bytes() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"%PDF-1.4").unwrap();
        let source = resolve_source(file.path().to_str().unwrap()).unwrap();
        assert_eq!(source.mime(), Some(PDF_MIME));
        assert_eq!(source, DocumentSource::bytes(b"%PDF-1.4".to_vec(), Some(PDF_MIME)));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(resolve_source("/definitely/not/here.pdf").is_err());
    }

    #[test]
    fn args_accept_negative_steps() {
        let args = Args::parse_from(["ipdf-view", "a.pdf", "--zoom-steps", "-2", "--rotate", "-1"]);
        assert_eq!(args.zoom_steps, -2);
        assert_eq!(args.rotate, -1);
        assert!(!args.download);
    }
}
