//! Property and end-to-end tests for the conversion pipeline.
//!
//! Tests verify:
//! 1. Run detection partitions any ordered input exactly (totality)
//! 2. No run is empty or longer than three calls
//! 3. Output does not depend on the lookahead chunk size
//! 4. Merged output passes through a second merge unchanged
//! 5. One unresolvable call does not disturb its neighbours
//! 6. CpA extraction against an indexed FASTA on disk

use methbed::call::{MethylationCall, Strand};
use methbed::commands::{CpaCommand, MergeCommand};
use methbed::config::PipelineConfig;
use methbed::reference::FastaReference;
use methbed::runs::{Run, RunDetector};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// =============================================================================
// Helpers
// =============================================================================

/// Ordered calls on one chromosome with a mix of adjacent and gapped positions.
fn random_calls(rng: &mut SmallRng, chrom: &str, n: usize) -> Vec<MethylationCall> {
    let mut position = rng.gen_range(1..50u64);
    let mut calls = Vec::with_capacity(n);
    for _ in 0..n {
        let strand = if rng.gen_bool(0.5) {
            Strand::Forward
        } else {
            Strand::Reverse
        };
        let coverage = rng.gen_range(1..200u64);
        let methylated = rng.gen_range(0..=coverage);
        let percent = methylated as f64 * 100.0 / coverage as f64;
        calls.push(MethylationCall::new(chrom, position, strand, coverage, percent));

        position += match rng.gen_range(0..10) {
            0..=5 => 1,
            6 | 7 => 2,
            _ => rng.gen_range(3..1000),
        };
    }
    calls
}

/// Render calls as a methylKit file.
fn methylkit_content(calls: &[MethylationCall]) -> String {
    let mut content = String::from("chrBase\tchr\tbase\tstrand\tcoverage\tfreqC\tfreqT\n");
    for call in calls {
        let code = match call.strand {
            Strand::Forward => "F",
            Strand::Reverse => "R",
        };
        content.push_str(&format!(
            "{}.{}\t{}\t{}\t{}\t{}\t{:.2}\t{:.2}\n",
            call.chrom,
            call.position,
            call.chrom,
            call.position,
            code,
            call.coverage,
            call.percent_methylated,
            100.0 - call.percent_methylated
        ));
    }
    content
}

fn merge_to_string(content: &str, config: PipelineConfig) -> String {
    let mut output = Vec::new();
    MergeCommand::new(config)
        .run_reader(content.as_bytes(), &mut output)
        .unwrap();
    String::from_utf8(output).unwrap()
}

/// Write a FASTA (one line per sequence) and its `.fai`.
fn write_indexed_fasta(dir: &Path, records: &[(&str, &str)]) -> PathBuf {
    let fasta = dir.join("genome.fa");
    let mut fa = File::create(&fasta).unwrap();
    let mut fai = File::create(dir.join("genome.fa.fai")).unwrap();
    let mut offset = 0usize;
    for (name, seq) in records {
        writeln!(fa, ">{}", name).unwrap();
        offset += name.len() + 2;
        writeln!(fa, "{}", seq).unwrap();
        writeln!(fai, "{}\t{}\t{}\t{}\t{}", name, seq.len(), offset, seq.len(), seq.len() + 1).unwrap();
        offset += seq.len() + 1;
    }
    fasta
}

// =============================================================================
// Run detection properties
// =============================================================================

#[test]
fn test_runs_partition_input() {
    let mut rng = SmallRng::seed_from_u64(7);
    for round in 0..50 {
        let n = rng.gen_range(0..300);
        let calls = random_calls(&mut rng, "chr1", n);

        let runs: Vec<Run> = RunDetector::new(calls.iter().cloned().map(Ok), 9)
            .collect::<Result<_, _>>()
            .unwrap();

        let rejoined: Vec<MethylationCall> = runs.iter().flat_map(|r| r.calls().to_vec()).collect();
        assert_eq!(rejoined, calls, "round {}", round);

        for run in &runs {
            assert!((1..=3).contains(&run.len()), "round {}: run of {}", round, run.len());
            for pair in run.calls().windows(2) {
                assert_eq!(pair[0].position + 1, pair[1].position);
            }
        }
    }
}

#[test]
fn test_runs_are_greedy() {
    let mut rng = SmallRng::seed_from_u64(99);
    let calls = random_calls(&mut rng, "chr1", 500);
    let runs: Vec<Run> = RunDetector::new(calls.iter().cloned().map(Ok), 9)
        .collect::<Result<_, _>>()
        .unwrap();

    // A short run is only ever followed by a gap (or the end)
    for pair in runs.windows(2) {
        if pair[0].len() < 3 {
            assert_ne!(pair[0].last().position + 1, pair[1].first().position);
        }
    }
}

#[test]
fn test_chunk_size_independence() {
    let mut rng = SmallRng::seed_from_u64(2024);
    let mut calls = random_calls(&mut rng, "chr1", 400);
    calls.extend(random_calls(&mut rng, "chr2", 250));
    calls.extend(random_calls(&mut rng, "chrX", 3));
    let content = methylkit_content(&calls);

    let expected = merge_to_string(&content, PipelineConfig::new());
    for chunk in [3, 4, 5, 8, 64, 1000] {
        let output = merge_to_string(&content, PipelineConfig::new().with_chunk_size(chunk));
        assert_eq!(output, expected, "chunk size {}", chunk);
    }
}

#[test]
fn test_merged_rows_cover_every_call() {
    let mut rng = SmallRng::seed_from_u64(11);
    let mut calls = random_calls(&mut rng, "chr3", 300);
    calls.extend(random_calls(&mut rng, "chr4", 300));
    let output = merge_to_string(&methylkit_content(&calls), PipelineConfig::new());

    let mut covered = 0u64;
    for line in output.lines() {
        let fields: Vec<&str> = line.split('\t').collect();
        assert_eq!(fields.len(), 10);
        let start: u64 = fields[1].parse().unwrap();
        let end: u64 = fields[2].parse().unwrap();
        let len = end - start;
        assert!((1..=3).contains(&len));

        // Generated coverage is never zero, so filled slots are exactly the run
        for slot in 0..3 {
            let coverage: u64 = fields[4 + 2 * slot].parse().unwrap();
            assert_eq!(coverage > 0, (slot as u64) < len, "{}", line);
            if coverage == 0 {
                assert_eq!(fields[5 + 2 * slot], "0");
            }
        }
        covered += len;
    }
    assert_eq!(covered, calls.len() as u64);
}

// =============================================================================
// End-to-end behaviour
// =============================================================================

#[test]
fn test_trailing_run_kept() {
    let calls = vec![
        MethylationCall::new("chr1", 10, Strand::Forward, 3, 0.0),
        MethylationCall::new("chr1", 11, Strand::Forward, 4, 25.0),
        MethylationCall::new("chr1", 12, Strand::Forward, 5, 40.0),
        MethylationCall::new("chr1", 13, Strand::Forward, 6, 50.0),
        MethylationCall::new("chr1", 14, Strand::Forward, 7, 100.0),
    ];
    let output = merge_to_string(&methylkit_content(&calls), PipelineConfig::new());

    assert_eq!(
        output,
        "chr1\t10\t13\t+\t3\t0\t4\t25\t5\t40\n\
         chr1\t13\t15\t+\t6\t50\t7\t100\t0\t0\n"
    );
}

#[test]
fn test_idempotent_on_merged_output() {
    let mut rng = SmallRng::seed_from_u64(5);
    let calls = random_calls(&mut rng, "chr1", 100);
    let config = PipelineConfig::new().with_header(true);

    let once = merge_to_string(&methylkit_content(&calls), config.clone());
    let twice = merge_to_string(&once, config.clone());
    let thrice = merge_to_string(&twice, config);

    assert_eq!(once, twice);
    assert_eq!(twice, thrice);
}

#[test]
fn test_cpa_from_indexed_fasta() {
    let dir = TempDir::new().unwrap();
    //                      1234567890123456
    let fasta = write_indexed_fasta(
        dir.path(),
        &[("chr1", "ACATTGACAGTTGNAC"), ("chr2", "ttgcaa")],
    );

    let calls = vec![
        MethylationCall::new("chr1", 2, Strand::Forward, 8, 12.5),  // CAT
        MethylationCall::new("chr1", 8, Strand::Forward, 8, 12.5),  // CAG
        MethylationCall::new("chr1", 10, Strand::Forward, 8, 12.5), // GTT
        MethylationCall::new("chr1", 13, Strand::Reverse, 8, 12.5), // TTG -> CAA
        MethylationCall::new("chr1", 15, Strand::Reverse, 8, 12.5), // GNA, unmappable
        MethylationCall::new("chr1", 16, Strand::Forward, 8, 12.5), // past the end
        MethylationCall::new("chr2", 3, Strand::Reverse, 8, 12.5),  // ttg -> caa
        MethylationCall::new("chr2", 4, Strand::Forward, 8, 12.5),  // caa
    ];
    let input = dir.path().join("sample.txt");
    fs::write(&input, methylkit_content(&calls)).unwrap();

    let reference = FastaReference::from_path(&fasta).unwrap();
    let mut cmd = CpaCommand::new(PipelineConfig::new(), reference);
    let mut output = Vec::new();
    let stats = cmd.run(&input, &mut output).unwrap();

    assert_eq!(
        String::from_utf8(output).unwrap(),
        "chr1\t2\t5\t+\t8\t12.5\t87.5\tCAT\n\
         chr1\t8\t11\t+\t8\t12.5\t87.5\tCAG\n\
         chr1\t11\t14\t-\t8\t12.5\t87.5\tCAA\n\
         chr2\t1\t4\t-\t8\t12.5\t87.5\tcaa\n\
         chr2\t4\t7\t+\t8\t12.5\t87.5\tcaa\n"
    );
    assert_eq!(stats.calls_read, 8);
    assert_eq!(stats.calls_unresolved, 2);
    assert_eq!(stats.calls_written, 5);
}
