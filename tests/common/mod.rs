//! Common test utilities for taed integration tests
//!
//! Provides a scratch data directory laid out like a deployment, a fixture
//! BLAST XML report, and a stand-in for the `blastall` binary.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use taed::blast::params::Invocation;
use taed::tools::traits::Launcher;
use taed::Config;
use tempfile::TempDir;

pub const QUERY: &str = "MRPGIDSTDNAGRKGAAINA";

pub const REPORT_XML: &str = r#"<?xml version="1.0"?>
<!DOCTYPE BlastOutput PUBLIC "-//NCBI//NCBI BlastOutput/EN" "NCBI_BlastOutput.dtd">
<BlastOutput>
  <BlastOutput_program>blastp</BlastOutput_program>
  <BlastOutput_query-def>query</BlastOutput_query-def>
  <BlastOutput_query-len>20</BlastOutput_query-len>
  <BlastOutput_iterations>
    <Iteration>
      <Iteration_iter-num>1</Iteration_iter-num>
      <Iteration_query-def>query</Iteration_query-def>
      <Iteration_query-len>20</Iteration_query-len>
      <Iteration_hits>
        <Hit>
          <Hit_num>1</Hit_num>
          <Hit_id>gi|349004|ref|NP_349004</Hit_id>
          <Hit_def>kinase [Homo sapiens]</Hit_def>
          <Hit_accession>NP_349004</Hit_accession>
          <Hit_len>310</Hit_len>
          <Hit_hsps>
            <Hsp>
              <Hsp_num>1</Hsp_num>
              <Hsp_bit-score>41.2</Hsp_bit-score>
              <Hsp_evalue>2e-06</Hsp_evalue>
            </Hsp>
          </Hit_hsps>
        </Hit>
        <Hit>
          <Hit_num>2</Hit_num>
          <Hit_id>gi|1234|ref|NP_1234</Hit_id>
          <Hit_def>kinase [Mus musculus]</Hit_def>
          <Hit_accession>NP_1234</Hit_accession>
          <Hit_len>305</Hit_len>
          <Hit_hsps>
            <Hsp>
              <Hsp_num>1</Hsp_num>
              <Hsp_bit-score>25.0</Hsp_bit-score>
              <Hsp_evalue>0.4</Hsp_evalue>
            </Hsp>
          </Hit_hsps>
        </Hit>
      </Iteration_hits>
    </Iteration>
  </BlastOutput_iterations>
</BlastOutput>
"#;

/// Test environment with a data directory containing a (dummy) BLAST database
pub struct TestEnvironment {
    temp_dir: TempDir,
    pub data_dir: PathBuf,
}

impl TestEnvironment {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let data_dir = temp_dir.path().join("data");
        std::fs::create_dir_all(data_dir.join("BLAST")).expect("Failed to create data dir");
        std::fs::write(data_dir.join("BLAST").join("DATABASE99.fasta"), ">db\nMKV\n")
            .expect("Failed to write database");

        TestEnvironment { temp_dir, data_dir }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn config(&self) -> Config {
        Config::with_data_dir(&self.data_dir)
    }

    pub fn output_file(&self, job_id: &str, index: usize) -> PathBuf {
        self.data_dir.join("blasted").join(format!("{}_{}", job_id, index))
    }

    /// Shell script that behaves like `blastall -o <out>`: it waits for `gate`
    /// to appear, then writes the fixture report atomically to `<out>`.
    #[cfg(unix)]
    pub fn fake_blastall(&self, gate: &Path) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let report = self.root().join("fixture.xml");
        std::fs::write(&report, REPORT_XML).expect("Failed to write fixture");

        let script = self.root().join("blastall");
        let body = format!(
            r#"#!/bin/sh
out=""
while [ $# -gt 0 ]; do
  case "$1" in
    -o) out="$2"; shift 2 ;;
    *) shift ;;
  esac
done
[ -n "$out" ] || exit 1
echo "fake blastall writing $out"
tries=0
while [ ! -e "{gate}" ] && [ $tries -lt 400 ]; do
  sleep 0.05
  tries=$((tries + 1))
done
cp "{report}" "$out.tmp" && mv "$out.tmp" "$out"
"#,
            gate = gate.display(),
            report = report.display()
        );
        std::fs::write(&script, body).expect("Failed to write fake blastall");
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755))
            .expect("Failed to chmod fake blastall");
        script
    }
}

/// Launcher that "runs" a search by writing the fixture report immediately
pub struct ReportWritingLauncher;

impl Launcher for ReportWritingLauncher {
    fn launch(&self, invocation: &Invocation) -> std::io::Result<u32> {
        std::fs::write(&invocation.output, REPORT_XML)?;
        Ok(1000 + invocation.index as u32)
    }

    fn name(&self) -> &str {
        "fixture"
    }
}

/// Launcher that starts nothing, leaving jobs in progress
pub struct IdleLauncher;

impl Launcher for IdleLauncher {
    fn launch(&self, invocation: &Invocation) -> std::io::Result<u32> {
        Ok(invocation.index as u32 + 1)
    }

    fn name(&self) -> &str {
        "idle"
    }
}

/// Poll `check` until it returns true or `timeout` passes
pub fn wait_until(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    check()
}
