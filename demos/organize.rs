//! Reverse the pages of a PDF and turn the new first page a quarter turn
//!
//! ```text
//! cargo run -p organizer --example organize -- input.pdf output.pdf
//! RUST_LOG=organizer=debug cargo run -p organizer --example organize -- input.pdf output.pdf
//! ```

use anyhow::{bail, Context};
use organizer::{
    LopdfCodec, MoveDirection, Organizer, OrganizerConfig, PageFrameRasterizer,
    RotationDirection, SourceDocument,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(input), Some(output)) = (args.next(), args.next()) else {
        bail!("usage: organize <input.pdf> <output.pdf>");
    };

    let config = OrganizerConfig::default();
    let rasterizer = PageFrameRasterizer::from_config(&config);
    let organizer = Organizer::new(LopdfCodec::new(), rasterizer, config)?;

    let source = SourceDocument::from_path(&input).with_context(|| format!("reading {input}"))?;
    let outcome = organizer.load_document(Some(source)).await?;
    tracing::info!(?outcome, "loaded {input}");

    let model = organizer
        .page_model()
        .context("no page model after loading")?;
    let ids: Vec<_> = model.entries().iter().map(|entry| entry.id()).collect();

    // Bubble each page to the front in turn, reversing the order
    for (moved, id) in ids.iter().enumerate() {
        for _ in 0..moved {
            organizer.move_entry(*id, MoveDirection::Up)?;
        }
    }
    if let Some(first) = ids.last() {
        organizer.rotate(*first, RotationDirection::Clockwise)?;
    }

    let bytes = organizer.commit_organize()?;
    std::fs::write(&output, &bytes).with_context(|| format!("writing {output}"))?;
    tracing::info!(pages = ids.len(), bytes = bytes.len(), "wrote {output}");

    Ok(())
}
