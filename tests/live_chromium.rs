//! Prints a real PDF through a local Chromium.
//!
//! - Marked `#[ignore]` so it only runs where a browser is installed.
//! - Set `MARKDRAFT_CHROME_EXECUTABLE` to point at a specific binary; otherwise
//!   the usual install locations are searched.

use std::{path::PathBuf, sync::Arc, time::Duration};

use markdraft::application::{
    compose::{TemplateComposer, TemplateProfile},
    export::pdf::{ChromiumLauncher, EnginePdfExporter, PdfExporter},
    render::{ComrakRenderService, RenderService},
};
use markdraft::domain::conversion::Orientation;

#[tokio::test]
#[ignore]
async fn chromium_prints_both_orientations() {
    let executable = std::env::var_os("MARKDRAFT_CHROME_EXECUTABLE").map(PathBuf::from);
    let launcher = ChromiumLauncher::new(executable, Duration::from_secs(30));
    let exporter = EnginePdfExporter::new(Arc::new(launcher));

    let rendered = ComrakRenderService::default()
        .render("# Live\n\n| a | b |\n|---|---|\n| 1 | 2 |\n\n```rust\nfn main() {}\n```\n");
    let document = TemplateComposer::load()
        .expect("templates load")
        .compose(TemplateProfile::Pdf, &rendered);

    for orientation in [Orientation::Portrait, Orientation::Landscape] {
        let bytes = exporter
            .export(&document, orientation)
            .await
            .expect("chromium should print");
        assert!(bytes.starts_with(b"%PDF"), "{orientation}");
        assert!(bytes.len() > 1024, "{orientation}");
    }
}
