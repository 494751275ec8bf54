/// Per-sequence search invocations
///
/// Each query sequence is written to its own FASTA file and searched by a
/// separate tool process. The output path for sequence `i` is fixed by the
/// job id and index, so status checks can find it without extra bookkeeping.
use crate::bio::fasta::write_fasta;
use crate::blast::job::{Job, JobPaths};
use crate::core::config::BlastConfig;
use crate::TaedError;
use std::path::{Path, PathBuf};
use std::process::Command;

/// One tool execution for a single query sequence
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub index: usize,
    pub program: String,
    pub args: Vec<String>,
    pub input: PathBuf,
    pub output: PathBuf,
}

impl Invocation {
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }

    /// Shell-style rendering for logs
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub struct ParameterBuilder<'a> {
    blast: &'a BlastConfig,
    database: &'a Path,
}

impl<'a> ParameterBuilder<'a> {
    pub fn new(blast: &'a BlastConfig, database: &'a Path) -> Self {
        Self { blast, database }
    }

    /// Write one query file per sequence and produce the matching invocations.
    ///
    /// Assigns `job.paths` on first use. Missing or unwritable directories
    /// surface as [`TaedError::Filesystem`].
    pub fn build(&self, job: &mut Job, input_dir: &Path, output_dir: &Path) -> Result<Vec<Invocation>, TaedError> {
        for dir in [input_dir, output_dir] {
            if !dir.is_dir() {
                return Err(TaedError::Filesystem(format!(
                    "directory {} does not exist",
                    dir.display()
                )));
            }
        }

        let paths = job
            .paths
            .get_or_insert_with(|| JobPaths {
                input_dir: input_dir.to_path_buf(),
                output_dir: output_dir.to_path_buf(),
            })
            .clone();

        let mut invocations = Vec::with_capacity(job.sequences.len());
        for (index, sequence) in job.sequences.iter().enumerate() {
            let input = paths.input_file(&job.id, index);
            let output = paths.output_file(&job.id, index);

            write_fasta(&input, std::slice::from_ref(sequence)).map_err(|e| {
                TaedError::Filesystem(format!("cannot write query file {}: {}", input.display(), e))
            })?;

            invocations.push(Invocation {
                index,
                program: self.blast.program.clone(),
                args: self.arguments(job, &input, &output),
                input,
                output,
            });
        }

        Ok(invocations)
    }

    fn arguments(&self, job: &Job, input: &Path, output: &Path) -> Vec<String> {
        vec![
            "-p".to_string(),
            "blastp".to_string(),
            "-i".to_string(),
            input.display().to_string(),
            "-d".to_string(),
            self.database.display().to_string(),
            "-o".to_string(),
            output.display().to_string(),
            format!("-a{}", self.blast.threads),
            // XML report
            "-m7".to_string(),
            format!("-e{}", job.limits.e_value),
            format!("-v{}", job.limits.max_hits),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blast::input::build_job;
    use crate::blast::job::SearchRequest;
    use crate::core::config::DefaultsConfig;
    use tempfile::TempDir;

    fn job_with(fasta: &str) -> Job {
        let request = SearchRequest {
            uuid: Some("job-1".to_string()),
            e_value: Some("0.001".to_string()),
            max_hits: Some("20".to_string()),
            file_data: Some(fasta.to_string()),
            ..SearchRequest::default()
        };
        build_job(&request, &DefaultsConfig::default())
    }

    #[test]
    fn test_one_invocation_per_sequence() {
        let dir = TempDir::new().unwrap();
        let (jobs, out) = (dir.path().join("blasts"), dir.path().join("blasted"));
        std::fs::create_dir_all(&jobs).unwrap();
        std::fs::create_dir_all(&out).unwrap();

        let config = BlastConfig::default();
        let database = dir.path().join("db.fasta");
        let mut job = job_with(">a\nMKV\n>b\nLLA\n");

        let invocations = ParameterBuilder::new(&config, &database)
            .build(&mut job, &jobs, &out)
            .unwrap();

        assert_eq!(invocations.len(), 2);
        assert_eq!(invocations[1].output, out.join("job-1_1"));
        assert_eq!(std::fs::read_to_string(&invocations[0].input).unwrap(), ">a\nMKV\n");
        assert!(invocations[0].args.contains(&"-m7".to_string()));
        assert!(invocations[0].args.contains(&"-e0.001".to_string()));
        assert!(invocations[0].args.contains(&"-v20".to_string()));
        assert!(invocations[0].args.contains(&"-a2".to_string()));
        assert_eq!(job.output_files(), vec![out.join("job-1_0"), out.join("job-1_1")]);
    }

    #[test]
    fn test_missing_directory_is_filesystem_error() {
        let dir = TempDir::new().unwrap();
        let config = BlastConfig::default();
        let database = dir.path().join("db.fasta");
        let mut job = job_with(">a\nMKV\n");

        let result = ParameterBuilder::new(&config, &database).build(
            &mut job,
            &dir.path().join("missing"),
            dir.path(),
        );
        assert!(matches!(result, Err(TaedError::Filesystem(_))));
    }

    #[test]
    fn test_command_line_rendering() {
        let invocation = Invocation {
            index: 0,
            program: "blastall".to_string(),
            args: vec!["-p".to_string(), "blastp".to_string()],
            input: PathBuf::from("in"),
            output: PathBuf::from("out"),
        };
        assert_eq!(invocation.command_line(), "blastall -p blastp");
    }
}
