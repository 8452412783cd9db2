//! Shared fixtures: an in-process converter and a minimal EPUB writer.

#![allow(dead_code)]

use futures::future::BoxFuture;
use md2epub::{Converter, ConverterOutput, Md2EpubError, EPUB_MIME_TYPE};
use std::ffi::OsString;
use std::io::{Cursor, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// A three-entry EPUB-shaped ZIP: `mimetype` first and stored, as readers expect.
pub fn minimal_epub_bytes() -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    zip.start_file("mimetype", stored).unwrap();
    zip.write_all(EPUB_MIME_TYPE.as_bytes()).unwrap();
    zip.start_file("META-INF/container.xml", SimpleFileOptions::default())
        .unwrap();
    zip.write_all(b"<container/>").unwrap();
    zip.start_file("EPUB/text/ch001.xhtml", SimpleFileOptions::default())
        .unwrap();
    zip.write_all(b"<html><body><h1>Hello</h1></body></html>").unwrap();
    zip.finish().unwrap().into_inner()
}

/// What the fake does when asked to convert.
#[derive(Debug, Clone)]
pub enum Behaviour {
    /// Write a valid book to the `-o` path and exit 0.
    WriteBook,
    /// Exit with `code`, printing `stderr`, writing nothing.
    Fail { code: i32, stderr: String },
    /// Exit 0 without writing anything.
    NoOutput,
    /// Exit 0 after writing a zero-byte file.
    EmptyFile,
    /// Exit 0 after writing bytes that are not a ZIP archive.
    Garbage,
}

/// Files the fake saw in the working area, captured before it is removed.
#[derive(Debug, Clone, Default)]
pub struct Captured {
    pub args: Vec<OsString>,
    pub input: String,
    pub metadata: String,
    pub output_path: PathBuf,
}

/// Converter double that records every call.
///
/// Inspection runs (`-f epub`) answer with the last metadata document as
/// plain text, so title and author are found unless `inspection_text` is set.
pub struct FakeConverter {
    behaviour: Behaviour,
    inspection_text: Option<String>,
    conversions: Mutex<Vec<Captured>>,
    inspections: Mutex<usize>,
}

impl FakeConverter {
    pub fn new(behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            behaviour,
            inspection_text: None,
            conversions: Mutex::new(Vec::new()),
            inspections: Mutex::new(0),
        })
    }

    pub fn with_inspection_text(behaviour: Behaviour, text: &str) -> Arc<Self> {
        Arc::new(Self {
            behaviour,
            inspection_text: Some(text.to_string()),
            conversions: Mutex::new(Vec::new()),
            inspections: Mutex::new(0),
        })
    }

    pub fn failing(code: i32, stderr: &str) -> Arc<Self> {
        Self::new(Behaviour::Fail {
            code,
            stderr: stderr.to_string(),
        })
    }

    pub fn conversions(&self) -> Vec<Captured> {
        self.conversions.lock().unwrap().clone()
    }

    pub fn conversion_count(&self) -> usize {
        self.conversions.lock().unwrap().len()
    }

    pub fn inspection_count(&self) -> usize {
        *self.inspections.lock().unwrap()
    }

    pub fn last(&self) -> Captured {
        self.conversions
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no conversion recorded")
    }

    fn convert(&self, args: &[OsString]) -> ConverterOutput {
        let output_path = value_after(args, "-o").map(PathBuf::from).unwrap_or_default();
        let input = std::fs::read_to_string(&args[0]).unwrap_or_default();
        let metadata = args
            .iter()
            .filter_map(|a| a.to_str())
            .find_map(|a| a.strip_prefix("--metadata-file="))
            .and_then(|p| std::fs::read_to_string(p).ok())
            .unwrap_or_default();

        self.conversions.lock().unwrap().push(Captured {
            args: args.to_vec(),
            input,
            metadata,
            output_path: output_path.clone(),
        });

        match &self.behaviour {
            Behaviour::WriteBook => {
                std::fs::write(&output_path, minimal_epub_bytes()).unwrap();
                exit(0, "")
            }
            Behaviour::Fail { code, stderr } => exit(*code, stderr),
            Behaviour::NoOutput => exit(0, ""),
            Behaviour::EmptyFile => {
                std::fs::write(&output_path, b"").unwrap();
                exit(0, "")
            }
            Behaviour::Garbage => {
                std::fs::write(&output_path, b"PK but not really a zip").unwrap();
                exit(0, "")
            }
        }
    }

    fn inspect(&self) -> ConverterOutput {
        *self.inspections.lock().unwrap() += 1;
        let text = match &self.inspection_text {
            Some(t) => t.clone(),
            None => self
                .conversions
                .lock()
                .unwrap()
                .last()
                .map(|c| c.metadata.clone())
                .unwrap_or_default(),
        };
        ConverterOutput {
            exit_code: Some(0),
            stdout: text.into_bytes(),
            stderr: Vec::new(),
        }
    }
}

impl Converter for FakeConverter {
    fn name(&self) -> &str {
        "fake"
    }

    fn run<'a>(&'a self, args: &'a [OsString]) -> BoxFuture<'a, Result<ConverterOutput, Md2EpubError>> {
        let is_inspection = value_after(args, "-f").as_deref() == Some("epub");
        let output = if is_inspection {
            self.inspect()
        } else {
            self.convert(args)
        };
        Box::pin(async move { Ok(output) })
    }
}

fn value_after(args: &[OsString], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(|a| a.to_string_lossy().into_owned())
}

fn exit(code: i32, stderr: &str) -> ConverterOutput {
    ConverterOutput {
        exit_code: Some(code),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}
