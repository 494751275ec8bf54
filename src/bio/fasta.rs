use crate::bio::sequence::Sequence;
use crate::TaedError;
use flate2::read::GzDecoder;
use memmap2::Mmap;
use nom::{
    bytes::complete::{tag, take_till},
    character::complete::{line_ending, not_line_ending},
    combinator::{map, opt},
    sequence::preceded,
    IResult,
};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Parse a FASTA header line
fn parse_header(input: &[u8]) -> IResult<&[u8], (&str, Option<&str>)> {
    let (input, _) = tag(b">")(input)?;
    let (input, id) = map(
        take_till(|c: u8| c == b' ' || c == b'\t' || c == b'\n' || c == b'\r'),
        |s| std::str::from_utf8(s).unwrap_or(""),
    )(input)?;
    let (input, description) = opt(preceded(
        take_till(|c: u8| c != b' ' && c != b'\t'),
        map(not_line_ending, |s| std::str::from_utf8(s).unwrap_or("")),
    ))(input)?;
    // The last header of a file may not be newline-terminated
    let (input, _) = opt(line_ending)(input)?;
    let description = description.map(str::trim).filter(|d| !d.is_empty());
    Ok((input, (id, description)))
}

/// Parse sequence lines until next header or EOF
fn parse_sequence(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
    let mut sequence = Vec::new();
    let mut remaining = input;

    while !remaining.is_empty() && remaining[0] != b'>' {
        let (rest, line) = take_till::<_, _, nom::error::Error<_>>(|c: u8| c == b'\n' || c == b'\r')(remaining)?;
        let (rest, _) = opt(line_ending)(rest)?;
        // A lone carriage return is not a line ending for nom
        let rest = rest.strip_prefix(b"\r").unwrap_or(rest);

        for &c in line {
            if !c.is_ascii_whitespace() {
                sequence.push(c.to_ascii_uppercase());
            }
        }

        remaining = rest;
    }

    Ok((remaining, sequence))
}

/// Parse a single FASTA record
fn parse_record(input: &[u8]) -> IResult<&[u8], Sequence> {
    let (input, (id, description)) = parse_header(input)?;
    let (input, sequence) = parse_sequence(input)?;

    let mut seq = Sequence::new(id.to_string(), sequence);
    if let Some(desc) = description {
        seq = seq.with_description(desc.to_string());
    }

    Ok((input, seq))
}

/// Parse multi-record FASTA from bytes.
///
/// Blank lines between records are tolerated. Any other text before the
/// first header is rejected.
pub fn parse_fasta_from_bytes(data: &[u8]) -> Result<Vec<Sequence>, TaedError> {
    let mut sequences = Vec::new();
    let mut remaining = data;

    while !remaining.is_empty() {
        while !remaining.is_empty() && remaining[0].is_ascii_whitespace() {
            remaining = &remaining[1..];
        }

        if remaining.is_empty() {
            break;
        }

        if remaining[0] != b'>' {
            let line_end = remaining
                .iter()
                .position(|&c| c == b'\n' || c == b'\r')
                .unwrap_or(remaining.len());
            return Err(TaedError::Parse(format!(
                "Expected FASTA header, found '{}'",
                String::from_utf8_lossy(&remaining[..line_end.min(60)])
            )));
        }

        let (rest, seq) = parse_record(remaining)
            .map_err(|e| TaedError::Parse(format!("Failed to parse FASTA: {:?}", e)))?;
        sequences.push(seq);

        remaining = rest;
    }

    Ok(sequences)
}

/// Parse multi-record FASTA from text
pub fn parse_fasta_str(data: &str) -> Result<Vec<Sequence>, TaedError> {
    parse_fasta_from_bytes(data.as_bytes())
}

/// Parse a FASTA file into sequences (supports .gz compression)
pub fn parse_fasta<P: AsRef<Path>>(path: P) -> Result<Vec<Sequence>, TaedError> {
    let path = path.as_ref();

    if path.extension().and_then(|s| s.to_str()) == Some("gz") {
        parse_fasta_gzip(path)
    } else {
        parse_fasta_uncompressed(path)
    }
}

fn parse_fasta_uncompressed(path: &Path) -> Result<Vec<Sequence>, TaedError> {
    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(Vec::new());
    }
    let mmap = unsafe { Mmap::map(&file)? };

    parse_fasta_from_bytes(&mmap[..])
}

fn parse_fasta_gzip(path: &Path) -> Result<Vec<Sequence>, TaedError> {
    let file = File::open(path)?;
    let mut decoder = GzDecoder::new(BufReader::new(file));
    let mut buffer = Vec::new();
    decoder.read_to_end(&mut buffer)?;

    parse_fasta_from_bytes(&buffer)
}

/// Write sequences to a FASTA file
pub fn write_fasta<P: AsRef<Path>>(path: P, sequences: &[Sequence]) -> Result<(), TaedError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_fasta_to_writer(&mut writer, sequences)?;
    writer.flush()?;

    Ok(())
}

/// Write sequences to any writer, wrapping residues at 80 columns
pub fn write_fasta_to_writer<W: Write>(writer: &mut W, sequences: &[Sequence]) -> Result<(), TaedError> {
    for seq in sequences {
        writeln!(writer, "{}", seq.header())?;

        for chunk in seq.sequence.chunks(80) {
            writeln!(writer, "{}", String::from_utf8_lossy(chunk))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tempfile::TempDir;

    #[test]
    fn test_parse_header() {
        let input = b">sp|P12345|PROTEIN_HUMAN Description here\nACGT";
        let (remaining, (id, desc)) = parse_header(input).unwrap();
        assert_eq!(id, "sp|P12345|PROTEIN_HUMAN");
        assert_eq!(desc, Some("Description here"));
        assert_eq!(remaining, b"ACGT");
    }

    #[test]
    fn test_parse_header_without_newline() {
        let (remaining, (id, desc)) = parse_header(b">lonely").unwrap();
        assert_eq!(id, "lonely");
        assert_eq!(desc, None);
        assert!(remaining.is_empty());
    }

    #[test]
    fn test_parse_multi_record() {
        let data = b">seq1 first\nMKV\nLLA\n\n>seq2\r\nmrpg\r\n";
        let sequences = parse_fasta_from_bytes(data).unwrap();
        assert_eq!(sequences.len(), 2);
        assert_eq!(sequences[0].id, "seq1");
        assert_eq!(sequences[0].description.as_deref(), Some("first"));
        assert_eq!(sequences[0].sequence, b"MKVLLA");
        assert_eq!(sequences[1].id, "seq2");
        assert_eq!(sequences[1].sequence, b"MRPG");
    }

    #[test]
    fn test_empty_input_yields_no_records() {
        assert!(parse_fasta_from_bytes(b"").unwrap().is_empty());
        assert!(parse_fasta_from_bytes(b"\n\n  \n").unwrap().is_empty());
    }

    #[test]
    fn test_text_before_header_is_rejected() {
        let err = parse_fasta_from_bytes(b"MKVLLA\n>seq1\nMKV\n").unwrap_err();
        assert!(matches!(err, TaedError::Parse(_)));
    }

    #[test]
    fn test_write_then_parse_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.fasta");
        let long = vec![b'A'; 170];
        let sequences = vec![Sequence::new("long".to_string(), long.clone())];

        write_fasta(&path, &sequences).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 4);

        let parsed = parse_fasta(&path).unwrap();
        assert_eq!(parsed[0].sequence, long);
    }

    #[test]
    fn test_parse_gzip_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("input.fasta.gz");
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        encoder.write_all(b">gz1\nMKV\n").unwrap();
        encoder.finish().unwrap();

        let parsed = parse_fasta(&path).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].id, "gz1");
    }
}
