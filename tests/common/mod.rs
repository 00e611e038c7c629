//! Common test utilities
#![allow(dead_code)]

use async_trait::async_trait;
use lettre::Message;
use mailcraft::email::MailTransport;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::time::Instant;
use tracing_subscriber::fmt::MakeWriter;

/// Write `files` (relative path, contents) into a fresh temporary directory
pub fn template_tree(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    for (relative, contents) in files {
        write_file(dir.path(), relative, contents);
    }
    dir
}

pub fn write_file(dir: &Path, relative: &str, contents: &str) {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create template subdirectory");
    }
    fs::write(path, contents).expect("Failed to write template file");
}

pub fn manifest(entries: &[(&str, &str)]) -> String {
    let body: String = entries
        .iter()
        .map(|(name, subject)| format!("<{0}><subject>{1}</subject></{0}>", name, subject))
        .collect();
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<templates>{}</templates>", body)
}

/// Root `contact` template with subject "Hello" and a default out template
pub fn root_contact_tree() -> TempDir {
    template_tree(&[
        ("subjects.xml", &manifest(&[("contact", "Hello")])),
        ("contact.htm", "<p>Dear {{name}}</p>"),
        ("out_default.htm", "<html><body>{{EMAILCONTENT}}</body></html>"),
    ])
}

/// [`root_contact_tree`] plus a German variant
pub fn localized_contact_tree() -> TempDir {
    let dir = root_contact_tree();
    write_file(dir.path(), "de/subjects.xml", &manifest(&[("contact", "Hallo")]));
    write_file(dir.path(), "de/contact.htm", "<p>Liebe(r) {{name}}</p>");
    dir
}

/// Collects formatted log output in memory
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    /// Install as the thread default subscriber until the guard drops
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Transport stub that fails a configurable number of times, recording
/// every attempt
#[derive(Default)]
pub struct RecordingTransport {
    fail_next: AtomicU32,
    fail_always: bool,
    attempts: Mutex<Vec<Instant>>,
    delivered: Mutex<Vec<Message>>,
}

impl RecordingTransport {
    pub fn succeeding() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_first(count: u32) -> Arc<Self> {
        Arc::new(Self {
            fail_next: AtomicU32::new(count),
            ..Self::default()
        })
    }

    pub fn always_failing() -> Arc<Self> {
        Arc::new(Self {
            fail_always: true,
            ..Self::default()
        })
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }

    pub fn attempt_times(&self) -> Vec<Instant> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn delivered(&self) -> Vec<Message> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn deliver(&self, message: Message) -> Result<(), String> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            attempts.push(Instant::now());
            attempts.len()
        };

        if self.fail_always {
            return Err(format!("451 temporary failure (attempt {})", attempt));
        }

        let remaining = self.fail_next.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_next.store(remaining - 1, Ordering::SeqCst);
            return Err(format!("421 service not available (attempt {})", attempt));
        }

        self.delivered.lock().unwrap().push(message);
        Ok(())
    }
}
