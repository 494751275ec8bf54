//! BLAST XML (`-m7`) report parsing.
//!
//! Only the parts of the report needed to present hits are decoded: the
//! per-query iteration header, each hit, and its HSPs. Program/database
//! metadata and iteration statistics are ignored.

use crate::TaedError;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// High-scoring segment pair of a hit; decoded from `Hsp_*` elements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hsp {
    #[serde(alias = "Hsp_num", default)]
    pub num: u32,
    #[serde(alias = "Hsp_bit-score")]
    pub bit_score: f64,
    #[serde(alias = "Hsp_score", default)]
    pub score: f64,
    #[serde(alias = "Hsp_evalue")]
    pub evalue: f64,
    #[serde(alias = "Hsp_query-from", default)]
    pub query_from: u64,
    #[serde(alias = "Hsp_query-to", default)]
    pub query_to: u64,
    #[serde(alias = "Hsp_hit-from", default)]
    pub hit_from: u64,
    #[serde(alias = "Hsp_hit-to", default)]
    pub hit_to: u64,
    #[serde(alias = "Hsp_identity", default)]
    pub identity: u64,
    #[serde(alias = "Hsp_positive", default)]
    pub positive: u64,
    #[serde(alias = "Hsp_gaps", default)]
    pub gaps: u64,
    #[serde(alias = "Hsp_align-len", default)]
    pub align_len: u64,
    #[serde(alias = "Hsp_qseq", default)]
    pub qseq: String,
    #[serde(alias = "Hsp_hseq", default)]
    pub hseq: String,
    #[serde(alias = "Hsp_midline", default)]
    pub midline: String,
}

/// One database match for one query sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    /// Position of the query within the job's sequences
    pub query_index: usize,
    pub query_id: String,
    pub query_def: String,
    pub query_len: u64,
    pub hit_num: u32,
    pub hit_id: String,
    pub hit_def: String,
    pub accession: String,
    pub length: u64,
    pub hsps: Vec<Hsp>,
}

impl Hit {
    /// Key used to look the hit up in result metadata
    pub fn key(&self) -> &str {
        if self.accession.is_empty() {
            &self.hit_id
        } else {
            &self.accession
        }
    }

    /// NCBI gi number from legacy `gi|12345|...` identifiers
    pub fn gi(&self) -> Option<&str> {
        [self.hit_id.as_str(), self.hit_def.as_str()]
            .into_iter()
            .find_map(|text| {
                let mut parts = text.split('|');
                while let Some(part) = parts.next() {
                    if part.rsplit(|c: char| c.is_whitespace() || c == '>').next() == Some("gi") {
                        return parts.next().filter(|gi| !gi.is_empty());
                    }
                }
                None
            })
    }

    pub fn best_evalue(&self) -> Option<f64> {
        self.hsps.iter().map(|h| h.evalue).reduce(f64::min)
    }

    pub fn best_bit_score(&self) -> Option<f64> {
        self.hsps.iter().map(|h| h.bit_score).reduce(f64::max)
    }

    /// Named scalar field as text, for value comparisons
    pub fn field(&self, name: &str) -> Option<String> {
        match name {
            "query_id" => Some(self.query_id.clone()),
            "query_def" => Some(self.query_def.clone()),
            "hit_id" => Some(self.hit_id.clone()),
            "hit_def" => Some(self.hit_def.clone()),
            "accession" => Some(self.accession.clone()),
            "gi" => self.gi().map(str::to_string),
            "length" => Some(self.length.to_string()),
            "evalue" => self.best_evalue().map(|e| e.to_string()),
            "bit_score" => self.best_bit_score().map(|s| s.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename = "BlastOutput")]
struct BlastOutputXml {
    #[serde(rename = "BlastOutput_query-ID", default)]
    query_id: String,
    #[serde(rename = "BlastOutput_query-def", default)]
    query_def: String,
    #[serde(rename = "BlastOutput_query-len", default)]
    query_len: u64,
    #[serde(rename = "BlastOutput_iterations", default)]
    iterations: IterationsXml,
}

#[derive(Debug, Default, Deserialize)]
struct IterationsXml {
    #[serde(rename = "Iteration", default)]
    items: Vec<IterationXml>,
}

#[derive(Debug, Deserialize)]
struct IterationXml {
    #[serde(rename = "Iteration_query-ID", default)]
    query_id: Option<String>,
    #[serde(rename = "Iteration_query-def", default)]
    query_def: Option<String>,
    #[serde(rename = "Iteration_query-len", default)]
    query_len: Option<u64>,
    #[serde(rename = "Iteration_hits", default)]
    hits: HitsXml,
}

#[derive(Debug, Default, Deserialize)]
struct HitsXml {
    #[serde(rename = "Hit", default)]
    items: Vec<HitXml>,
}

#[derive(Debug, Deserialize)]
struct HitXml {
    #[serde(rename = "Hit_num", default)]
    num: u32,
    #[serde(rename = "Hit_id", default)]
    id: String,
    #[serde(rename = "Hit_def", default)]
    def: String,
    #[serde(rename = "Hit_accession", default)]
    accession: String,
    #[serde(rename = "Hit_len", default)]
    len: u64,
    #[serde(rename = "Hit_hsps", default)]
    hsps: HspsXml,
}

#[derive(Debug, Default, Deserialize)]
struct HspsXml {
    #[serde(rename = "Hsp", default)]
    items: Vec<Hsp>,
}

/// Parse one report; `query_index` is the position of its query in the job
pub fn parse_report(xml: &str, query_index: usize) -> Result<Vec<Hit>, TaedError> {
    let output: BlastOutputXml = quick_xml::de::from_str(xml)
        .map_err(|e| TaedError::Parse(format!("Malformed BLAST XML: {}", e)))?;

    let mut hits = Vec::new();
    for iteration in output.iterations.items {
        let query_id = iteration.query_id.unwrap_or_else(|| output.query_id.clone());
        let query_def = iteration.query_def.unwrap_or_else(|| output.query_def.clone());
        let query_len = iteration.query_len.unwrap_or(output.query_len);

        hits.extend(iteration.hits.items.into_iter().map(|hit| Hit {
            query_index,
            query_id: query_id.clone(),
            query_def: query_def.clone(),
            query_len,
            hit_num: hit.num,
            hit_id: hit.id,
            hit_def: hit.def,
            accession: hit.accession,
            length: hit.len,
            hsps: hit.hsps.items,
        }));
    }

    Ok(hits)
}

pub fn parse_report_file<P: AsRef<Path>>(path: P, query_index: usize) -> Result<Vec<Hit>, TaedError> {
    let path = path.as_ref();
    let xml = std::fs::read_to_string(path)?;
    parse_report(&xml, query_index)
        .map_err(|e| TaedError::Parse(format!("{}: {}", path.display(), e)))
}

/// Parse every report in parallel and concatenate the hits in query order
pub fn parse_reports(paths: &[std::path::PathBuf]) -> Result<Vec<Hit>, TaedError> {
    let per_query: Vec<Vec<Hit>> = paths
        .par_iter()
        .enumerate()
        .map(|(index, path)| parse_report_file(path, index))
        .collect::<Result<_, _>>()?;

    Ok(per_query.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const REPORT: &str = r#"<?xml version="1.0"?>
<!DOCTYPE BlastOutput PUBLIC "-//NCBI//NCBI BlastOutput/EN" "NCBI_BlastOutput.dtd">
<BlastOutput>
  <BlastOutput_program>blastp</BlastOutput_program>
  <BlastOutput_query-ID>lcl|1_0</BlastOutput_query-ID>
  <BlastOutput_query-def>query one</BlastOutput_query-def>
  <BlastOutput_query-len>20</BlastOutput_query-len>
  <BlastOutput_iterations>
    <Iteration>
      <Iteration_iter-num>1</Iteration_iter-num>
      <Iteration_query-ID>lcl|1_0</Iteration_query-ID>
      <Iteration_query-def>query one</Iteration_query-def>
      <Iteration_query-len>20</Iteration_query-len>
      <Iteration_hits>
        <Hit>
          <Hit_num>1</Hit_num>
          <Hit_id>gi|349004|ref|NP_001</Hit_id>
          <Hit_def>kinase [Homo sapiens]</Hit_def>
          <Hit_accession>NP_001</Hit_accession>
          <Hit_len>310</Hit_len>
          <Hit_hsps>
            <Hsp>
              <Hsp_num>1</Hsp_num>
              <Hsp_bit-score>40.5</Hsp_bit-score>
              <Hsp_score>94</Hsp_score>
              <Hsp_evalue>1.5e-05</Hsp_evalue>
              <Hsp_query-from>1</Hsp_query-from>
              <Hsp_query-to>20</Hsp_query-to>
              <Hsp_hit-from>11</Hsp_hit-from>
              <Hsp_hit-to>30</Hsp_hit-to>
              <Hsp_identity>18</Hsp_identity>
              <Hsp_positive>19</Hsp_positive>
              <Hsp_gaps>0</Hsp_gaps>
              <Hsp_align-len>20</Hsp_align-len>
              <Hsp_qseq>MKVLLAGGAAVLLAGGAAVL</Hsp_qseq>
              <Hsp_hseq>MKVLLAGGAAVLLAGGAAVI</Hsp_hseq>
              <Hsp_midline>MKVLLAGGAAVLLAGGAAV+</Hsp_midline>
            </Hsp>
            <Hsp>
              <Hsp_num>2</Hsp_num>
              <Hsp_bit-score>22.1</Hsp_bit-score>
              <Hsp_evalue>0.3</Hsp_evalue>
            </Hsp>
          </Hit_hsps>
        </Hit>
        <Hit>
          <Hit_num>2</Hit_num>
          <Hit_id>gnl|BL_ORD_ID|7</Hit_id>
          <Hit_def>hypothetical protein</Hit_def>
          <Hit_accession></Hit_accession>
          <Hit_len>120</Hit_len>
          <Hit_hsps>
            <Hsp>
              <Hsp_bit-score>30</Hsp_bit-score>
              <Hsp_evalue>0.01</Hsp_evalue>
            </Hsp>
          </Hit_hsps>
        </Hit>
      </Iteration_hits>
    </Iteration>
  </BlastOutput_iterations>
</BlastOutput>
"#;

    #[test]
    fn test_parse_report_hits() {
        let hits = parse_report(REPORT, 0).unwrap();
        assert_eq!(hits.len(), 2);

        let first = &hits[0];
        assert_eq!(first.query_def, "query one");
        assert_eq!(first.hit_num, 1);
        assert_eq!(first.key(), "NP_001");
        assert_eq!(first.gi(), Some("349004"));
        assert_eq!(first.hsps.len(), 2);
        assert_eq!(first.best_evalue(), Some(1.5e-05));
        assert_eq!(first.best_bit_score(), Some(40.5));
        assert_eq!(first.field("length").as_deref(), Some("310"));

        let second = &hits[1];
        assert_eq!(second.key(), "gnl|BL_ORD_ID|7");
        assert_eq!(second.gi(), None);
    }

    #[test]
    fn test_report_without_hits() {
        let xml = r#"<BlastOutput><BlastOutput_iterations><Iteration>
            <Iteration_query-def>q</Iteration_query-def>
            <Iteration_hits>
            </Iteration_hits>
            <Iteration_message>No hits found</Iteration_message>
        </Iteration></BlastOutput_iterations></BlastOutput>"#;
        assert!(parse_report(xml, 0).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_report_is_parse_error() {
        assert!(matches!(parse_report("<BlastOutput><Iteration", 0), Err(TaedError::Parse(_))));
    }

    #[test]
    fn test_reports_concatenate_in_query_order() {
        let dir = TempDir::new().unwrap();
        let paths: Vec<_> = (0..3).map(|i| dir.path().join(format!("job_{}", i))).collect();
        for path in &paths {
            std::fs::write(path, REPORT).unwrap();
        }

        let hits = parse_reports(&paths).unwrap();
        assert_eq!(hits.len(), 6);
        let indices: Vec<_> = hits.iter().map(|h| h.query_index).collect();
        assert_eq!(indices, vec![0, 0, 1, 1, 2, 2]);
    }
}
