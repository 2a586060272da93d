use crate::PlateError;
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

/// Header of the `archivo,texto_real` CSV correlating image files with plate text
pub const MANIFEST_HEADER: [&str; 2] = ["archivo", "texto_real"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub file_name: String,
    pub ground_truth: String,
}

/// Append-only manifest writer. The header is written on creation.
pub struct ManifestWriter<W: Write> {
    writer: W,
    rows: usize,
}

impl ManifestWriter<BufWriter<File>> {
    pub fn create(path: &Path) -> Result<Self, PlateError> {
        Self::new(BufWriter::new(File::create(path)?))
    }
}

impl<W: Write> ManifestWriter<W> {
    pub fn new(mut writer: W) -> Result<Self, PlateError> {
        writeln!(writer, "{}", MANIFEST_HEADER.join(","))?;
        Ok(Self { writer, rows: 0 })
    }

    pub fn append(&mut self, file_name: &str, ground_truth: &str) -> Result<(), PlateError> {
        // header is line 1
        let line = self.rows + 2;
        for field in [file_name, ground_truth] {
            if field.contains([',', '\n', '\r']) {
                return Err(PlateError::Manifest {
                    line,
                    reason: format!("field {field:?} contains a separator"),
                });
            }
        }
        if file_name.is_empty() {
            return Err(PlateError::Manifest {
                line,
                reason: "empty file name".to_string(),
            });
        }
        writeln!(self.writer, "{file_name},{ground_truth}")?;
        self.rows += 1;
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn finish(mut self) -> Result<W, PlateError> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

pub fn read_manifest(path: &Path) -> Result<Vec<ManifestEntry>, PlateError> {
    let content = std::fs::read_to_string(path)?;
    parse_manifest(&content)
}

/// Parses manifest text, keeping row order. Blank lines are ignored.
pub fn parse_manifest(content: &str) -> Result<Vec<ManifestEntry>, PlateError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut lines = content
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line))
        .filter(|(_, line)| !line.trim().is_empty());

    let Some((line, header)) = lines.next() else {
        return Err(PlateError::Manifest {
            line: 1,
            reason: "missing header".to_string(),
        });
    };
    let header_fields: Vec<&str> = header.split(',').map(str::trim).collect();
    if header_fields != MANIFEST_HEADER {
        return Err(PlateError::Manifest {
            line,
            reason: format!(
                "expected header {:?}, found {header:?}",
                MANIFEST_HEADER.join(",")
            ),
        });
    }

    lines
        .map(|(line, row)| {
            let fields: Vec<&str> = row.split(',').collect();
            let [file_name, ground_truth] = fields.as_slice() else {
                return Err(PlateError::Manifest {
                    line,
                    reason: format!("expected 2 columns, found {}", fields.len()),
                });
            };
            let file_name = file_name.trim();
            if file_name.is_empty() {
                return Err(PlateError::Manifest {
                    line,
                    reason: "empty file name".to_string(),
                });
            }
            Ok(ManifestEntry {
                file_name: file_name.to_string(),
                ground_truth: ground_truth.to_string(),
            })
        })
        .collect()
}
