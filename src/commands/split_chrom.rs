//! Split a call file into one file per chromosome.
//!
//! `calls.txt` becomes `calls.chr1.txt`, `calls.chr2.txt`, ... in the output
//! directory. Each file starts with the input header and carries the input
//! rows byte for byte. Only one output file is open at a time.

use crate::batch::output_path;
use crate::call::{CallReader, InputSchema};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::streaming::BedWriter;
use log::debug;
use rustc_hash::FxHashSet;
use std::fs::{File, OpenOptions};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Per-chromosome split command.
#[derive(Debug, Clone)]
pub struct SplitChromCommand {
    pub config: PipelineConfig,
    pub out_dir: PathBuf,
}

impl SplitChromCommand {
    pub fn new(config: PipelineConfig, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            out_dir: out_dir.into(),
        }
    }

    /// Split a call file. Output names are derived from the input name.
    pub fn run<P: AsRef<Path>>(&self, input_path: P) -> Result<SplitChromStats> {
        let input_path = input_path.as_ref();
        let file = File::open(input_path)?;
        self.run_reader(file, input_path)
    }

    /// Split calls read from `input`, naming outputs after `name`.
    pub fn run_reader<R: Read>(&self, input: R, name: &Path) -> Result<SplitChromStats> {
        let mut reader = CallReader::new(input, self.config.on_malformed)?;
        let chrom_column = match reader.schema() {
            InputSchema::Calls(columns) => columns.chrom,
            InputSchema::Merged => 0,
        };
        let header = reader.header_line().to_vec();

        let mut stats = SplitChromStats::default();
        let mut seen: FxHashSet<String> = FxHashSet::default();
        let mut current: Option<(String, BedWriter<File>)> = None;

        while let Some(line) = reader.read_line()? {
            let Some(chrom) = line
                .split(|&b| b == b'\t')
                .nth(chrom_column)
                .and_then(|c| std::str::from_utf8(c).ok())
                .filter(|c| !c.is_empty())
            else {
                return Err(PipelineError::Malformed {
                    line: reader.line_number(),
                    message: "Empty or missing chromosome".to_string(),
                });
            };
            if !is_file_component(chrom) {
                let message = format!("Chromosome '{}' cannot be used in a file name", chrom);
                return Err(PipelineError::Malformed {
                    line: reader.line_number(),
                    message,
                });
            }

            if current.as_ref().map(|(c, _)| c.as_str()) != Some(chrom) {
                if let Some((_, mut writer)) = current.take() {
                    writer.flush()?;
                }
                let path = output_path(name, &self.out_dir, &format!(".{}.txt", chrom));
                let writer = if seen.contains(chrom) {
                    debug!("Appending to {}", path.display());
                    BedWriter::new(OpenOptions::new().append(true).open(&path)?)
                } else {
                    debug!("Writing {}", path.display());
                    let mut writer = BedWriter::new(File::create(&path)?);
                    if !header.is_empty() {
                        writer.write_line(&header)?;
                    }
                    seen.insert(chrom.to_string());
                    stats.files_written += 1;
                    writer
                };
                current = Some((chrom.to_string(), writer));
            }

            if let Some((_, writer)) = current.as_mut() {
                writer.write_line(line)?;
            }
            stats.rows_written += 1;
        }

        if let Some((_, mut writer)) = current.take() {
            writer.flush()?;
        }
        Ok(stats)
    }
}

/// True if `chrom` can be spliced into an output name without leaving the
/// output directory.
fn is_file_component(chrom: &str) -> bool {
    chrom != "." && chrom != ".." && !chrom.contains(['/', '\\', '\0'])
}

/// Statistics from a split.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SplitChromStats {
    /// Distinct chromosome files created
    pub files_written: usize,
    pub rows_written: usize,
}

impl std::fmt::Display for SplitChromStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Files: {}, Rows: {}",
            self.files_written, self.rows_written
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const CONTENT: &str = "chrBase\tchr\tbase\tstrand\tcoverage\tfreqC\tfreqT\n\
        chr1.1\tchr1\t1\tF\t5\t0.00\t100.00\n\
        chr1.2\tchr1\t2\tR\t5\t10.00\t90.00\n\
        chr2.9\tchr2\t9\tF\t1\t100.00\t0.00\n\
        chr1.30\tchr1\t30\tF\t2\t50.00\t50.00\n";

    #[test]
    fn test_split_by_chromosome() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("sample.txt");
        fs::write(&input, CONTENT).unwrap();

        let cmd = SplitChromCommand::new(PipelineConfig::new(), dir.path());
        let stats = cmd.run(&input).unwrap();

        assert_eq!(stats.files_written, 2);
        assert_eq!(stats.rows_written, 4);

        let chr1 = fs::read_to_string(dir.path().join("sample.chr1.txt")).unwrap();
        let chr1_lines: Vec<_> = chr1.lines().collect();
        assert_eq!(chr1_lines.len(), 4);
        assert!(chr1_lines[0].starts_with("chrBase\t"));
        // Reappearing chromosome appended without a second header
        assert_eq!(chr1_lines[3], "chr1.30\tchr1\t30\tF\t2\t50.00\t50.00");

        let chr2 = fs::read_to_string(dir.path().join("sample.chr2.txt")).unwrap();
        assert_eq!(chr2.lines().count(), 2);
    }

    #[test]
    fn test_path_separator_in_chromosome_rejected() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("sample.txt");
        fs::write(
            &input,
            "chr\tbase\tstrand\tcoverage\tfreqC\n\
             chr1\t1\tF\t5\t0\n\
             ../escape\t2\tF\t5\t0\n",
        )
        .unwrap();

        let cmd = SplitChromCommand::new(PipelineConfig::new(), dir.path());
        match cmd.run(&input) {
            Err(PipelineError::Malformed { line, message }) => {
                assert_eq!(line, 3);
                assert!(message.contains("../escape"), "{}", message);
            }
            other => panic!("expected malformed error, got {:?}", other),
        }
        assert!(!dir.path().join("sample..").exists());

        assert!(is_file_component("chrUn_KI270302v1"));
        assert!(!is_file_component(".."));
        assert!(!is_file_component("scaffold\\7"));
    }

    #[test]
    fn test_existing_outputs_truncated() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("sample.txt");
        fs::write(&input, CONTENT).unwrap();
        fs::write(dir.path().join("sample.chr2.txt"), "stale\nstale\nstale\n").unwrap();

        let cmd = SplitChromCommand::new(PipelineConfig::new(), dir.path());
        cmd.run(&input).unwrap();
        cmd.run(&input).unwrap();

        let chr2 = fs::read_to_string(dir.path().join("sample.chr2.txt")).unwrap();
        assert_eq!(chr2.lines().count(), 2);
    }
}
