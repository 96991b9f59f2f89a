//! End-to-end provisioning through the public API with an in-memory
//! release source.

use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hugorun_core::{
    BuildLog, DownloadPolicy, HostInfo, Hugo, HugoError, Invocation, ReleaseSource, Result,
    Settings, Version,
};
use tempfile::TempDir;
use tracing::Level;

const SCRIPT: &str = "#!/bin/sh\necho \"hugo called with: $*\"\necho \"warning: drafts skipped\" >&2\n";

/// Serves release metadata and archives from memory, recording requests.
#[derive(Default)]
struct MemoryReleases {
    tag: String,
    tag_requests: Mutex<usize>,
    downloads: Mutex<Vec<String>>,
}

impl MemoryReleases {
    fn new(tag: &str) -> Arc<Self> {
        Arc::new(Self {
            tag: tag.to_string(),
            ..Self::default()
        })
    }

    fn downloads(&self) -> Vec<String> {
        self.downloads.lock().unwrap().clone()
    }

    fn tag_requests(&self) -> usize {
        *self.tag_requests.lock().unwrap()
    }
}

#[async_trait]
impl ReleaseSource for MemoryReleases {
    async fn latest_tag(&self) -> Result<String> {
        *self.tag_requests.lock().unwrap() += 1;
        Ok(self.tag.clone())
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        self.downloads.lock().unwrap().push(url.to_string());

        let file = std::fs::File::create(dest).unwrap();
        if url.ends_with(".zip") {
            let mut zip = zip::ZipWriter::new(file);
            let options = zip::write::SimpleFileOptions::default();
            zip.start_file("LICENSE", options).unwrap();
            zip.write_all(b"Apache-2.0").unwrap();
            zip.start_file("hugo.exe", options).unwrap();
            zip.write_all(SCRIPT.as_bytes()).unwrap();
            zip.finish().unwrap();
        } else {
            let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
            let mut builder = tar::Builder::new(encoder);
            for (name, body) in [("README.md", "# hugo"), ("hugo", SCRIPT)] {
                let mut header = tar::Header::new_gnu();
                header.set_size(body.len() as u64);
                header.set_mode(0o644);
                header.set_cksum();
                builder.append_data(&mut header, name, body.as_bytes()).unwrap();
            }
            builder.into_inner().unwrap().finish().unwrap();
        }

        Ok(std::fs::metadata(dest).unwrap().len())
    }
}

#[derive(Default)]
struct RecordingLog {
    lines: Mutex<Vec<(Level, String)>>,
}

impl BuildLog for RecordingLog {
    fn line(&self, level: Level, line: &str) {
        self.lines.lock().unwrap().push((level, line.to_string()));
    }
}

fn settings_in(cache: &TempDir) -> Settings {
    Settings {
        cache_root: Some(cache.path().to_path_buf()),
        ..Settings::default()
    }
}

#[tokio::test]
async fn latest_is_resolved_once_and_cached() {
    let cache = TempDir::new().unwrap();
    let source = MemoryReleases::new("v0.145.0");
    let settings = settings_in(&cache);
    let host = HostInfo::new("linux", "x86_64");

    for _ in 0..2 {
        let hugo = Hugo::from_settings(
            &settings,
            &host,
            source.clone(),
            Arc::new(RecordingLog::default()),
        )
        .await
        .unwrap();
        assert_eq!(hugo.version(), &Version::new(0, 145, 0));
    }

    assert_eq!(source.tag_requests(), 1);
    assert_eq!(
        std::fs::read_to_string(cache.path().join("latest_version"))
            .unwrap()
            .trim(),
        "0.145.0"
    );
}

#[tokio::test]
async fn install_uses_platform_specific_artifacts() {
    let cache = TempDir::new().unwrap();
    let source = MemoryReleases::new("v0.145.0");
    let settings = Settings {
        version: "0.60.0".to_string(),
        ..settings_in(&cache)
    };

    let windows = Hugo::from_settings(
        &settings,
        &HostInfo::new("Windows 10", "amd64"),
        source.clone(),
        Arc::new(RecordingLog::default()),
    )
    .await
    .unwrap();
    let exe = windows.executable().await.unwrap();

    assert!(exe.ends_with("windows-amd64-0.60.0/hugo.exe"));
    assert_eq!(std::fs::read_to_string(&exe).unwrap(), SCRIPT);
    assert_eq!(
        source.downloads(),
        vec!["https://github.com/gohugoio/hugo/releases/download/v0.60.0/hugo_extended_0.60.0_Windows-64bit.zip"]
    );
    assert_eq!(source.tag_requests(), 0);
}

#[tokio::test]
async fn never_policy_reports_missing_install() {
    let cache = TempDir::new().unwrap();
    let source = MemoryReleases::new("v0.145.0");
    let settings = Settings {
        version: "0.145.0".to_string(),
        download: DownloadPolicy::Never,
        ..settings_in(&cache)
    };

    let hugo = Hugo::from_settings(
        &settings,
        &HostInfo::new("linux", "aarch64"),
        source.clone(),
        Arc::new(RecordingLog::default()),
    )
    .await
    .unwrap();

    let err = hugo.executable().await.unwrap_err();
    assert!(matches!(err, HugoError::NotAvailable { .. }));
    assert!(source.downloads().is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn build_downloads_once_and_relays_output() {
    let cache = TempDir::new().unwrap();
    let site = TempDir::new().unwrap();
    std::fs::write(site.path().join("hugo.toml"), "title = 'test'").unwrap();

    let source = MemoryReleases::new("v0.145.0");
    let settings = Settings {
        environment: Some("production".to_string()),
        additional_arguments: vec!["--minify".to_string()],
        working_directory: Some(site.path().to_path_buf()),
        ..settings_in(&cache)
    };
    let log = Arc::new(RecordingLog::default());

    let hugo = Hugo::from_settings(
        &settings,
        &HostInfo::new("linux", "x86_64"),
        source.clone(),
        log.clone(),
    )
    .await
    .unwrap();

    let args = Invocation::from_settings(&settings)
        .config(site.path().join("hugo.toml"))
        .destination("public")
        .build()
        .unwrap();
    let working_dir = settings.working_directory().unwrap();

    hugo.execute(&args, &working_dir).await.unwrap();
    hugo.execute(&args, &working_dir).await.unwrap();

    assert_eq!(
        source.downloads(),
        vec!["https://github.com/gohugoio/hugo/releases/download/v0.145.0/hugo_extended_0.145.0_linux-amd64.tar.gz"]
    );

    let lines = log.lines.lock().unwrap();
    let info: Vec<&str> = lines
        .iter()
        .filter(|(level, _)| *level == Level::INFO)
        .map(|(_, line)| line.as_str())
        .collect();
    let expected = format!(
        "hugo called with: --config {} --destination public --environment production --minify",
        site.path().join("hugo.toml").display()
    );
    assert_eq!(info, vec![expected.as_str(), expected.as_str()]);
    assert!(lines
        .iter()
        .any(|(level, line)| *level == Level::ERROR && line == "warning: drafts skipped"));
}
